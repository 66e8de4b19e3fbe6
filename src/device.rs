use crate::error::Error;

/// Moves a value onto device `D`.
///
/// Batches come off the data sequence in host memory; the trainer transfers
/// both halves of each batch before the forward pass. Transfer failures
/// (e.g. an unavailable accelerator) are fatal and surface immediately.
pub trait ToDevice<D>: Sized {
    fn try_to_device(self, device: &D) -> Result<Self, Error>;
}

/// The host device. Transfers onto it are the identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cpu;

impl<T> ToDevice<Cpu> for T {
    fn try_to_device(self, _device: &Cpu) -> Result<Self, Error> {
        Ok(self)
    }
}
