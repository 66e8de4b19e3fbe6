/// Scalar types a loss value can be reported in.
///
/// The loop itself accumulates metrics in f64, so the only hard requirement
/// beyond float arithmetic is a lossless widening into f64.
pub trait Dtype:
    num_traits::Float + Into<f64> + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static
{
}

impl Dtype for f32 {}
impl Dtype for f64 {}
