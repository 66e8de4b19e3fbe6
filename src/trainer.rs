use crate::checkpoint::{Checkpointer, SaveState, Variant};
use crate::data::{ClassLabels, ClassScores, DataSequence};
use crate::device::ToDevice;
use crate::error::Error;
use crate::loss::BackwardLoss;
use crate::metrics::{MetricsTracker, Phase, RunningStats};
use crate::module::Model;
use crate::optim::Optimizer;

use indicatif::ProgressBar;
use std::path::PathBuf;

/// Construction-time options for [Trainer]. Every field is required;
/// validation happens in [Trainer::new].
#[derive(Clone, Debug)]
pub struct TrainConfig {
    /// Directory that owns the `ckpt/` subdirectory.
    pub log_dir: PathBuf,
    /// Save a numbered checkpoint every this many epochs. Must be >= 1.
    pub save_ckpt_interval: usize,
    /// Emit per-batch progress bars and epoch summaries on stdout.
    pub progress: bool,
}

impl TrainConfig {
    pub fn new<P: Into<PathBuf>>(log_dir: P) -> Self {
        Self {
            log_dir: log_dir.into(),
            save_ckpt_interval: 1,
            progress: true,
        }
    }

    pub fn save_ckpt_interval(mut self, interval: usize) -> Self {
        self.save_ckpt_interval = interval;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

/// Final cumulative numbers from one evaluation pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalReport {
    /// Percent accuracy at the pass's last batch.
    pub accuracy: f64,
    /// Running-average loss at the pass's last batch.
    pub avg_loss: f64,
}

/// The training loop controller.
///
/// Composes the injected collaborators — device, model, optimizer,
/// criterion, paired train/test data sequences, and a metrics tracker —
/// and drives them through epochs: a training pass, an evaluation pass,
/// and checkpoint decisions, strictly in that order. Phases are sequential
/// on one logical thread, so evaluation and checkpoint serialization never
/// observe a half-applied parameter update.
pub struct Trainer<D, M, O, C, Tr, Te, Mt> {
    device: D,
    model: M,
    optim: O,
    criterion: C,
    train_data: Tr,
    test_data: Te,
    metrics: Mt,
    checkpointer: Checkpointer,
    save_ckpt_interval: usize,
    progress: bool,
}

impl<D, M, O, C, Tr, Te, Mt> Trainer<D, M, O, C, Tr, Te, Mt> {
    /// Builds a trainer, validating the config and creating the checkpoint
    /// directory (idempotently) up front.
    pub fn new(
        device: D,
        model: M,
        optim: O,
        criterion: C,
        data: (Tr, Te),
        metrics: Mt,
        config: TrainConfig,
    ) -> Result<Self, Error> {
        if config.save_ckpt_interval == 0 {
            return Err(Error::InvalidConfig(
                "save_ckpt_interval must be at least 1".to_string(),
            ));
        }
        let checkpointer = Checkpointer::new(&config.log_dir)?;
        let (train_data, test_data) = data;
        Ok(Self {
            device,
            model,
            optim,
            criterion,
            train_data,
            test_data,
            metrics,
            checkpointer,
            save_ckpt_interval: config.save_ckpt_interval,
            progress: config.progress,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn optim(&self) -> &O {
        &self.optim
    }

    pub fn metrics(&self) -> &Mt {
        &self.metrics
    }

    pub fn checkpointer(&self) -> &Checkpointer {
        &self.checkpointer
    }

    pub fn into_model(self) -> M {
        self.model
    }

    fn progress_bar(&self) -> ProgressBar {
        if self.progress {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        }
    }
}

impl<D, M, O, C, Tr, Te, Mt> Trainer<D, M, O, C, Tr, Te, Mt>
where
    Tr: DataSequence,
    Te: DataSequence<Input = Tr::Input, Label = Tr::Label>,
    Tr::Input: ToDevice<D>,
    Tr::Label: ToDevice<D> + ClassLabels,
    M: Model<Tr::Input>,
    M::Output: ClassScores,
    O: Optimizer<M> + SaveState,
    Mt: MetricsTracker,
{
    /// Runs `n_epochs` sequential epochs and returns the best test accuracy
    /// observed, a run-scoped accumulator initialized to 0.
    ///
    /// Per epoch: one training pass, then a numbered checkpoint if the epoch
    /// index is a multiple of the configured interval, then one evaluation
    /// pass, then a best checkpoint on strict accuracy improvement. The best
    /// comparison uses the evaluation pass's cumulative running accuracy at
    /// its last batch.
    pub fn train<L>(&mut self, n_epochs: usize) -> Result<f64, Error>
    where
        C: FnMut(M::Output, &Tr::Label) -> Result<L, Error>,
        L: BackwardLoss,
    {
        let mut best_acc = 0.0f64;
        for epoch in 0..n_epochs {
            let stats = self.train_epoch(epoch)?;
            self.metrics.calc_metrics(epoch, Phase::Train);

            if epoch % self.save_ckpt_interval == 0 {
                self.checkpointer.save(
                    epoch as u64,
                    stats.avg_loss(),
                    Variant::Numbered,
                    self.model.core(),
                    &self.optim,
                )?;
            }

            let report = self.evaluate(epoch)?;
            if report.accuracy > best_acc {
                self.checkpointer.save(
                    epoch as u64,
                    report.avg_loss,
                    Variant::Best,
                    self.model.core(),
                    &self.optim,
                )?;
                best_acc = report.accuracy;
            }
        }
        Ok(best_acc)
    }

    fn train_epoch<L>(&mut self, epoch: usize) -> Result<RunningStats, Error>
    where
        C: FnMut(M::Output, &Tr::Label) -> Result<L, Error>,
        L: BackwardLoss,
    {
        self.model.set_train();
        let mut stats = RunningStats::default();
        let bar = self.progress_bar();

        for (inputs, targets) in self.train_data.batches() {
            let inputs = inputs.try_to_device(&self.device)?;
            let targets = targets.try_to_device(&self.device)?;

            let output = self.model.try_forward_mut(inputs)?;
            let preds = output.argmax();
            let loss = (self.criterion)(output, &targets)?;
            let loss_value: f64 = loss.value().into();
            loss.try_backward()?;

            self.optim.try_step(&mut self.model)?;
            self.optim.try_zero_grads(&mut self.model)?;

            let labels = targets.labels();
            let correct = preds.iter().zip(labels.iter()).filter(|(p, t)| p == t).count();
            stats.push(loss_value, correct, labels.len());
            self.metrics
                .update(&preds, &labels, stats.avg_loss(), stats.accuracy());

            bar.set_message(format!(
                "epoch {:>4} | loss {:.4} | acc {:.4}",
                epoch,
                stats.avg_loss(),
                stats.accuracy()
            ));
            bar.inc(1);
        }
        bar.finish_and_clear();

        if self.progress {
            println!(
                "epoch {epoch} | train loss: {:.4} | train accuracy: {:.4}",
                stats.avg_loss(),
                stats.accuracy()
            );
        }
        Ok(stats)
    }

    /// Runs one evaluation pass over the test sequence and returns its
    /// final cumulative accuracy and average loss.
    ///
    /// The model is switched to evaluation mode and only the untracked
    /// forward is used: no gradient storage is allocated, no backward pass
    /// runs, and the optimizer is never touched, so neither parameters nor
    /// optimizer state can change here.
    pub fn evaluate<L>(&mut self, epoch: usize) -> Result<EvalReport, Error>
    where
        C: FnMut(M::Output, &Tr::Label) -> Result<L, Error>,
        L: BackwardLoss,
    {
        self.model.set_eval();
        let mut stats = RunningStats::default();
        let bar = self.progress_bar();

        for (inputs, targets) in self.test_data.batches() {
            let inputs = inputs.try_to_device(&self.device)?;
            let targets = targets.try_to_device(&self.device)?;

            let output = self.model.try_forward(inputs)?;
            let preds = output.argmax();
            let loss = (self.criterion)(output, &targets)?;
            let loss_value: f64 = loss.value().into();

            let labels = targets.labels();
            let correct = preds.iter().zip(labels.iter()).filter(|(p, t)| p == t).count();
            stats.push(loss_value, correct, labels.len());
            self.metrics
                .update(&preds, &labels, stats.avg_loss(), stats.accuracy());

            bar.set_message(format!(
                "epoch {:>4} | loss {:.4} | acc {:.4}",
                epoch,
                stats.avg_loss(),
                stats.accuracy()
            ));
            bar.inc(1);
        }
        bar.finish_and_clear();

        if self.progress {
            println!(
                "epoch {epoch} | test loss: {:.4} | test accuracy: {:.4}",
                stats.avg_loss(),
                stats.accuracy()
            );
        }
        self.metrics.calc_metrics(epoch, Phase::Test);

        Ok(EvalReport {
            accuracy: stats.accuracy(),
            avg_loss: stats.avg_loss(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Cpu;

    #[test]
    fn test_zero_interval_is_rejected() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let config = TrainConfig::new(dir.path()).save_ckpt_interval(0);
        // Collaborator types don't matter; validation fails first.
        let result: Result<Trainer<Cpu, (), (), (), (), (), ()>, Error> =
            Trainer::new(Cpu, (), (), (), ((), ()), (), config);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_construction_creates_ckpt_dir() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let config = TrainConfig::new(dir.path()).progress(false);
        let trainer: Trainer<Cpu, (), (), (), (), (), ()> =
            Trainer::new(Cpu, (), (), (), ((), ()), (), config).expect("construction failed");
        assert!(trainer.checkpointer().dir().is_dir());
        assert!(dir.path().join("ckpt").is_dir());
    }
}
