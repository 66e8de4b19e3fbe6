//! # trainloop
//!
//! A device-agnostic supervised training loop: iterate epochs, run
//! forward/backward passes over a training sequence, evaluate on a held-out
//! sequence, track running loss/accuracy, and periodically persist
//! model/optimizer state as safetensors checkpoints.
//!
//! All numeric work is delegated to injected collaborators behind small
//! trait seams; this crate only orchestrates them:
//!
//! - [module::Model] — mode switching, tracked/untracked forward, and the
//!   canonical-core capability used for checkpointing.
//! - [optim::Optimizer] — one update step per batch plus gradient clearing.
//! - [loss::BackwardLoss] — a scalar loss that can run its backward pass.
//! - [data::DataSequence] — a restartable stream of `(input, label)` batches.
//! - [metrics::MetricsTracker] — streamed per-batch updates and per-epoch
//!   aggregation.
//! - [device::ToDevice] — host-to-device transfer of each batch.
//!
//! # Example
//!
//! A complete (if tiny) setup: a one-parameter binary classifier with
//! `score(class 0) = w * x` and `score(class 1) = -w * x`, squared-error
//! loss on the class-0 score, and plain gradient descent.
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use trainloop::prelude::*;
//!
//! struct Scaler {
//!     w: f64,
//!     grad: Rc<RefCell<f64>>,
//! }
//!
//! struct Scores {
//!     rows: Vec<[f64; 2]>,
//!     tape: Option<Tape>,
//! }
//!
//! // Graph state a tracked forward attaches to its output, so the loss
//! // can push gradients back into the model.
//! struct Tape {
//!     grad: Rc<RefCell<f64>>,
//!     xs: Vec<f64>,
//!     w: f64,
//! }
//!
//! impl ClassScores for Scores {
//!     fn argmax(&self) -> Vec<usize> {
//!         self.rows.iter().map(|r| if r[0] >= r[1] { 0 } else { 1 }).collect()
//!     }
//! }
//!
//! impl Model<Vec<f64>> for Scaler {
//!     type Output = Scores;
//!     type Core = Scaler;
//!
//!     fn set_train(&mut self) {}
//!     fn set_eval(&mut self) {}
//!
//!     fn try_forward(&self, x: Vec<f64>) -> Result<Scores, Error> {
//!         let rows = x.iter().map(|&v| [self.w * v, -self.w * v]).collect();
//!         Ok(Scores { rows, tape: None })
//!     }
//!
//!     fn try_forward_mut(&mut self, x: Vec<f64>) -> Result<Scores, Error> {
//!         let rows = x.iter().map(|&v| [self.w * v, -self.w * v]).collect();
//!         let tape = Tape { grad: Rc::clone(&self.grad), xs: x, w: self.w };
//!         Ok(Scores { rows, tape: Some(tape) })
//!     }
//!
//!     fn core(&self) -> &Scaler {
//!         self
//!     }
//!     fn core_mut(&mut self) -> &mut Scaler {
//!         self
//!     }
//! }
//!
//! impl SaveState for Scaler {
//!     fn write_state(&self, location: &str, entries: &mut Vec<StateEntry>) {
//!         self.w.write_state(&format!("{location}w"), entries);
//!     }
//! }
//!
//! impl LoadState for Scaler {
//!     fn read_state(
//!         &mut self,
//!         location: &str,
//!         tensors: &safetensors::SafeTensors<'_>,
//!     ) -> Result<(), Error> {
//!         self.w.read_state(&format!("{location}w"), tensors)
//!     }
//! }
//!
//! struct Mse {
//!     value: f64,
//!     pending: Option<(Rc<RefCell<f64>>, f64)>,
//! }
//!
//! impl BackwardLoss for Mse {
//!     type Elem = f64;
//!
//!     fn value(&self) -> f64 {
//!         self.value
//!     }
//!
//!     fn try_backward(self) -> Result<(), Error> {
//!         if let Some((grad, g)) = self.pending {
//!             *grad.borrow_mut() += g;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn mse(output: Scores, targets: &Vec<usize>) -> Result<Mse, Error> {
//!     let signed = |t: usize| if t == 0 { 1.0 } else { -1.0 };
//!     let n = output.rows.len().max(1) as f64;
//!     let mut value = 0.0;
//!     for (row, &t) in output.rows.iter().zip(targets.iter()) {
//!         value += (row[0] - signed(t)) * (row[0] - signed(t));
//!     }
//!     value /= n;
//!     let pending = output.tape.map(|tape| {
//!         let mut g = 0.0;
//!         for (&x, &t) in tape.xs.iter().zip(targets.iter()) {
//!             g += 2.0 * (tape.w * x - signed(t)) * x;
//!         }
//!         (tape.grad, g / n)
//!     });
//!     Ok(Mse { value, pending })
//! }
//!
//! struct Sgd {
//!     lr: f64,
//!     steps: u64,
//! }
//!
//! impl Optimizer<Scaler> for Sgd {
//!     fn try_step(&mut self, model: &mut Scaler) -> Result<(), Error> {
//!         model.w -= self.lr * *model.grad.borrow();
//!         self.steps += 1;
//!         Ok(())
//!     }
//!
//!     fn try_zero_grads(&mut self, model: &mut Scaler) -> Result<(), Error> {
//!         *model.grad.borrow_mut() = 0.0;
//!         Ok(())
//!     }
//! }
//!
//! impl SaveState for Sgd {
//!     fn write_state(&self, location: &str, entries: &mut Vec<StateEntry>) {
//!         self.steps.write_state(&format!("{location}steps"), entries);
//!     }
//! }
//!
//! fn main() -> Result<(), Error> {
//!     let train: Vec<(Vec<f64>, Vec<usize>)> = vec![
//!         (vec![1.0, 2.0], vec![0, 0]),
//!         (vec![-1.0, -2.0], vec![1, 1]),
//!     ];
//!     let test = train.clone();
//!
//!     let model = Scaler { w: 0.1, grad: Rc::new(RefCell::new(0.0)) };
//!     let optim = Sgd { lr: 0.05, steps: 0 };
//!     let log_dir = tempfile::tempdir().expect("failed to create tempdir");
//!     let config = TrainConfig::new(log_dir.path())
//!         .save_ckpt_interval(2)
//!         .progress(false);
//!
//!     let mut trainer = Trainer::new(
//!         Cpu,
//!         model,
//!         optim,
//!         mse,
//!         (train, test),
//!         History::new(),
//!         config,
//!     )?;
//!     let best_acc = trainer.train(4)?;
//!     assert!((0.0..=100.0).contains(&best_acc));
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod data;
pub mod device;
pub mod dtypes;
pub mod error;
pub mod loss;
pub mod metrics;
pub mod module;
pub mod optim;
pub mod trainer;

/// Flat re-export of the public surface.
pub mod prelude {
    pub use crate::checkpoint::{
        CheckpointMeta, Checkpointer, LoadState, SaveState, StateEntry, Variant,
        BEST_CKPT_FILENAME,
    };
    pub use crate::data::{ClassLabels, ClassScores, DataSequence};
    pub use crate::device::{Cpu, ToDevice};
    pub use crate::dtypes::Dtype;
    pub use crate::error::Error;
    pub use crate::loss::BackwardLoss;
    pub use crate::metrics::{EpochSummary, History, MetricsTracker, Phase, RunningStats};
    pub use crate::module::{Model, Replicated};
    pub use crate::optim::Optimizer;
    pub use crate::trainer::{EvalReport, TrainConfig, Trainer};
}
