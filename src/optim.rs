use crate::error::Error;
use crate::module::Replicated;

/// The optimizer collaborator.
///
/// An optimizer is tied to one model type. The trainer drives it with
/// exactly one step + zero-grads pair per batch, so gradients never
/// accumulate across batches.
pub trait Optimizer<M> {
    /// Applies one update step using the gradients currently accumulated
    /// in `model`.
    fn try_step(&mut self, model: &mut M) -> Result<(), Error>;

    /// Clears accumulated gradients.
    fn try_zero_grads(&mut self, model: &mut M) -> Result<(), Error>;
}

/// Any optimizer for `M` also drives a replicated `M`: updates go to the
/// canonical copy.
impl<M, O: Optimizer<M>> Optimizer<Replicated<M>> for O {
    fn try_step(&mut self, model: &mut Replicated<M>) -> Result<(), Error> {
        <O as Optimizer<M>>::try_step(self, &mut model.module)
    }

    fn try_zero_grads(&mut self, model: &mut Replicated<M>) -> Result<(), Error> {
        <O as Optimizer<M>>::try_zero_grads(self, &mut model.module)
    }
}
