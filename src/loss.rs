use crate::dtypes::Dtype;
use crate::error::Error;

/// A scalar training loss, differentiable with respect to the model output
/// it was computed from.
///
/// Values of this type are produced by the criterion closure and carry
/// whatever graph state the model attached to its output during a tracked
/// forward. Calling [BackwardLoss::try_backward] consumes the loss and
/// accumulates gradients into the model's gradient storage. A loss built
/// from an untracked forward is simply dropped; the evaluation pass never
/// calls backward.
pub trait BackwardLoss {
    type Elem: Dtype;

    /// This batch's loss value.
    fn value(&self) -> Self::Elem;

    /// Runs the backward pass, accumulating gradients of the loss with
    /// respect to every trainable parameter.
    fn try_backward(self) -> Result<(), Error>;
}
