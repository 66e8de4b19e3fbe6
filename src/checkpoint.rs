use crate::error::Error;

use safetensors::tensor::TensorView;
use safetensors::SafeTensors;
use std::path::{Path, PathBuf};

/// One serialized state entry: key, dtype, shape, little-endian bytes.
pub type StateEntry = (String, safetensors::Dtype, Vec<usize>, Vec<u8>);

/// Capability to dump a state snapshot as safetensors entries.
///
/// `location` is a key prefix; nested structures append their own names to
/// it, so a model checkpointed under `"model."` writes keys like
/// `"model.linear.weight"`.
pub trait SaveState {
    fn write_state(&self, location: &str, entries: &mut Vec<StateEntry>);
}

/// Capability to restore a state snapshot from deserialized safetensors.
pub trait LoadState {
    fn read_state(&mut self, location: &str, tensors: &SafeTensors<'_>) -> Result<(), Error>;
}

fn scalar_bytes<const N: usize>(location: &str, data: &[u8]) -> Result<[u8; N], Error> {
    data.try_into().map_err(|_| {
        Error::MalformedCheckpoint(format!(
            "entry `{location}` has {} bytes, expected {N}",
            data.len()
        ))
    })
}

macro_rules! scalar_state {
    ($Ty:ty, $Dtype:expr) => {
        impl SaveState for $Ty {
            fn write_state(&self, location: &str, entries: &mut Vec<StateEntry>) {
                entries.push((
                    location.to_string(),
                    $Dtype,
                    Vec::new(),
                    self.to_le_bytes().to_vec(),
                ));
            }
        }

        impl LoadState for $Ty {
            fn read_state(
                &mut self,
                location: &str,
                tensors: &SafeTensors<'_>,
            ) -> Result<(), Error> {
                let view = tensors.tensor(location)?;
                *self = <$Ty>::from_le_bytes(scalar_bytes(location, view.data())?);
                Ok(())
            }
        }

        impl SaveState for Vec<$Ty> {
            fn write_state(&self, location: &str, entries: &mut Vec<StateEntry>) {
                entries.push((
                    location.to_string(),
                    $Dtype,
                    vec![self.len()],
                    self.iter().flat_map(|v| v.to_le_bytes()).collect(),
                ));
            }
        }

        impl LoadState for Vec<$Ty> {
            fn read_state(
                &mut self,
                location: &str,
                tensors: &SafeTensors<'_>,
            ) -> Result<(), Error> {
                let view = tensors.tensor(location)?;
                const N: usize = std::mem::size_of::<$Ty>();
                if view.data().len() % N != 0 {
                    return Err(Error::MalformedCheckpoint(format!(
                        "entry `{location}` is not a whole number of elements"
                    )));
                }
                *self = view
                    .data()
                    .chunks_exact(N)
                    .map(|c| {
                        let mut bytes = [0; N];
                        bytes.copy_from_slice(c);
                        <$Ty>::from_le_bytes(bytes)
                    })
                    .collect();
                Ok(())
            }
        }
    };
}

scalar_state!(f32, safetensors::Dtype::F32);
scalar_state!(f64, safetensors::Dtype::F64);
scalar_state!(u64, safetensors::Dtype::U64);

/// Which checkpoint slot a save targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    /// Interval checkpoint. Distinct file per epoch, never overwritten.
    Numbered,
    /// Best-accuracy checkpoint. Single file, overwritten on improvement.
    Best,
}

/// The epoch/loss fields recorded alongside model and optimizer state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CheckpointMeta {
    pub epoch: u64,
    pub loss: f64,
}

/// Writes and reads checkpoints under the `ckpt/` subdirectory of a log
/// directory.
///
/// A checkpoint is one safetensors file holding the `"epoch"` and `"loss"`
/// scalars plus every `"model."`- and `"optim."`-prefixed state entry. Saves
/// go through a `.tmp` sibling and a rename, so a file at the final path is
/// always a complete record.
#[derive(Clone, Debug)]
pub struct Checkpointer {
    ckpt_dir: PathBuf,
}

pub const BEST_CKPT_FILENAME: &str = "best_acc_ckpt";

impl Checkpointer {
    /// Creates the `ckpt/` subdirectory under `log_dir`. A pre-existing
    /// directory is success, not an error.
    pub fn new<P: AsRef<Path>>(log_dir: P) -> Result<Self, Error> {
        let ckpt_dir = log_dir.as_ref().join("ckpt");
        std::fs::create_dir_all(&ckpt_dir)?;
        Ok(Self { ckpt_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.ckpt_dir
    }

    /// Destination path for a checkpoint of `variant` at `epoch`.
    pub fn path(&self, epoch: u64, variant: Variant) -> PathBuf {
        match variant {
            Variant::Best => self.ckpt_dir.join(BEST_CKPT_FILENAME),
            Variant::Numbered => self.ckpt_dir.join(format!("epoch{epoch:08}_ckpt")),
        }
    }

    /// Persists `{epoch, loss, model state, optimizer state}` atomically.
    pub fn save<M: SaveState + ?Sized, O: SaveState + ?Sized>(
        &self,
        epoch: u64,
        loss: f64,
        variant: Variant,
        model: &M,
        optim: &O,
    ) -> Result<PathBuf, Error> {
        let mut entries = Vec::new();
        epoch.write_state("epoch", &mut entries);
        loss.write_state("loss", &mut entries);
        model.write_state("model.", &mut entries);
        optim.write_state("optim.", &mut entries);

        let views = entries
            .iter()
            .map(|(k, dtype, shape, data)| {
                TensorView::new(dtype.clone(), shape.clone(), data).map(|view| (k.clone(), view))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let views = views.iter().map(|(k, v)| (k.clone(), v));

        let path = self.path(epoch, variant);
        let tmp = path.with_extension("tmp");
        safetensors::serialize_to_file(views, &None, &tmp)?;
        std::fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Restores model and optimizer state from a checkpoint of `variant` at
    /// `epoch` (the epoch is ignored for [Variant::Best]).
    pub fn load<M: LoadState + ?Sized, O: LoadState + ?Sized>(
        &self,
        epoch: u64,
        variant: Variant,
        model: &mut M,
        optim: &mut O,
    ) -> Result<CheckpointMeta, Error> {
        self.load_from(&self.path(epoch, variant), model, optim)
    }

    /// Restores model and optimizer state from an arbitrary checkpoint path.
    pub fn load_from<M: LoadState + ?Sized, O: LoadState + ?Sized>(
        &self,
        path: &Path,
        model: &mut M,
        optim: &mut O,
    ) -> Result<CheckpointMeta, Error> {
        let file = std::fs::File::open(path)?;
        let buffer = unsafe { memmap2::MmapOptions::new().map(&file)? };
        let tensors = SafeTensors::deserialize(&buffer)?;

        let mut epoch = 0u64;
        epoch.read_state("epoch", &tensors)?;
        let mut loss = 0f64;
        loss.read_state("loss", &tensors)?;
        model.read_state("model.", &tensors)?;
        optim.read_state("optim.", &tensors)?;
        Ok(CheckpointMeta { epoch, loss })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        weights: Vec<f32>,
    }

    impl SaveState for Stub {
        fn write_state(&self, location: &str, entries: &mut Vec<StateEntry>) {
            self.weights
                .write_state(&format!("{location}weights"), entries);
        }
    }

    impl LoadState for Stub {
        fn read_state(&mut self, location: &str, tensors: &SafeTensors<'_>) -> Result<(), Error> {
            self.weights
                .read_state(&format!("{location}weights"), tensors)
        }
    }

    #[test]
    fn test_directory_creation_is_idempotent() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let first = Checkpointer::new(dir.path()).expect("first creation failed");
        let second = Checkpointer::new(dir.path()).expect("second creation failed");
        assert_eq!(first.dir(), second.dir());
        assert!(first.dir().ends_with("ckpt"));
        assert!(first.dir().is_dir());
    }

    #[test]
    fn test_checkpoint_paths() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let ckpt = Checkpointer::new(dir.path()).expect("creation failed");
        assert_eq!(
            ckpt.path(42, Variant::Numbered).file_name().and_then(|f| f.to_str()),
            Some("epoch00000042_ckpt")
        );
        assert_eq!(
            ckpt.path(42, Variant::Best).file_name().and_then(|f| f.to_str()),
            Some(BEST_CKPT_FILENAME)
        );
        assert_ne!(
            ckpt.path(1, Variant::Numbered),
            ckpt.path(2, Variant::Numbered)
        );
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let ckpt = Checkpointer::new(dir.path()).expect("creation failed");

        let model = Stub {
            weights: vec![1.0, -2.5, 0.125],
        };
        let optim_state = vec![0.5f64, 0.25];
        ckpt.save(7, 0.625, Variant::Numbered, &model, &optim_state)
            .expect("save failed");

        let mut loaded = Stub { weights: vec![] };
        let mut loaded_optim: Vec<f64> = vec![];
        let meta = ckpt
            .load(7, Variant::Numbered, &mut loaded, &mut loaded_optim)
            .expect("load failed");

        assert_eq!(meta, CheckpointMeta { epoch: 7, loss: 0.625 });
        assert_eq!(loaded.weights, model.weights);
        assert_eq!(loaded_optim, optim_state);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let ckpt = Checkpointer::new(dir.path()).expect("creation failed");
        let model = Stub { weights: vec![1.0] };
        let path = ckpt
            .save(0, 0.0, Variant::Best, &model, &vec![0.0f64])
            .expect("save failed");

        let names: Vec<_> = std::fs::read_dir(ckpt.dir())
            .expect("read_dir failed")
            .map(|e| e.expect("bad entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(BEST_CKPT_FILENAME)]);
        assert_eq!(path.file_name().and_then(|f| f.to_str()), Some(BEST_CKPT_FILENAME));
    }

    #[test]
    fn test_best_is_overwritten() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let ckpt = Checkpointer::new(dir.path()).expect("creation failed");
        let model = Stub { weights: vec![1.0] };
        ckpt.save(0, 0.5, Variant::Best, &model, &vec![0.0f64])
            .expect("first save failed");
        ckpt.save(3, 0.25, Variant::Best, &model, &vec![0.0f64])
            .expect("second save failed");

        let mut loaded = Stub { weights: vec![] };
        let mut loaded_optim: Vec<f64> = vec![];
        let meta = ckpt
            .load(0, Variant::Best, &mut loaded, &mut loaded_optim)
            .expect("load failed");
        assert_eq!(meta.epoch, 3);
        assert_eq!(meta.loss, 0.25);

        let n_files = std::fs::read_dir(ckpt.dir()).expect("read_dir failed").count();
        assert_eq!(n_files, 1);
    }

    #[test]
    fn test_mismatched_entry_is_an_error() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let ckpt = Checkpointer::new(dir.path()).expect("creation failed");
        let model = Stub { weights: vec![1.0] };
        ckpt.save(0, 0.0, Variant::Numbered, &model, &vec![0.0f64])
            .expect("save failed");

        // Optimizer state shape differs from what was saved.
        let mut loaded = Stub { weights: vec![] };
        let mut wrong_optim = 0.0f32;
        let result = ckpt.load(0, Variant::Numbered, &mut loaded, &mut wrong_optim);
        assert!(result.is_err());
    }
}
