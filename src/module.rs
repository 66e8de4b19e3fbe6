use crate::checkpoint::{LoadState, SaveState};
use crate::error::Error;

/// The trainable model collaborator.
///
/// The trainer never looks inside a model: it switches modes at phase
/// boundaries, runs forwards, and hands [Model::core] to the checkpointer.
///
/// The two forward flavors mirror the two phases of an epoch:
/// - [Model::try_forward_mut] is the tracked forward used while training.
///   The output carries whatever graph state the backend needs so that the
///   loss produced from it can push gradients back into the model.
/// - [Model::try_forward] takes `&self` and must not allocate gradient
///   storage. It is the only forward the evaluation pass calls, which is
///   what guarantees evaluation cannot mutate parameters.
pub trait Model<X> {
    type Output;

    /// The canonical single-copy module used for checkpointing. For a plain
    /// model this is `Self`; replication wrappers point it at the wrapped
    /// module so saved state is always loadable on a single device.
    type Core: SaveState + LoadState;

    /// Puts stochastic/normalization layers into training behavior.
    fn set_train(&mut self);

    /// Disables training-only behavior.
    fn set_eval(&mut self);

    /// Forward pass without gradient tracking.
    fn try_forward(&self, x: X) -> Result<Self::Output, Error>;

    /// Forward pass with gradient tracking.
    fn try_forward_mut(&mut self, x: X) -> Result<Self::Output, Error>;

    fn core(&self) -> &Self::Core;
    fn core_mut(&mut self) -> &mut Self::Core;
}

/// Marks a module as replicated across devices.
///
/// This crate does no multi-device orchestration itself; the wrapper exists
/// so that code holding a replicated model still checkpoints the canonical
/// copy. [Model::core] sees through it, so a checkpoint written from a
/// `Replicated<M>` is byte-identical to one written from the inner `M`.
#[derive(Clone, Debug, Default)]
pub struct Replicated<M> {
    pub module: M,
}

impl<M> Replicated<M> {
    pub fn new(module: M) -> Self {
        Self { module }
    }

    pub fn into_inner(self) -> M {
        self.module
    }
}

impl<X, M: Model<X>> Model<X> for Replicated<M> {
    type Output = M::Output;
    type Core = M::Core;

    fn set_train(&mut self) {
        self.module.set_train()
    }

    fn set_eval(&mut self) {
        self.module.set_eval()
    }

    fn try_forward(&self, x: X) -> Result<Self::Output, Error> {
        self.module.try_forward(x)
    }

    fn try_forward_mut(&mut self, x: X) -> Result<Self::Output, Error> {
        self.module.try_forward_mut(x)
    }

    fn core(&self) -> &M::Core {
        self.module.core()
    }

    fn core_mut(&mut self) -> &mut M::Core {
        self.module.core_mut()
    }
}
