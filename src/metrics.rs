/// Which pass of an epoch a metric belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Train,
    Test,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Test => "test",
        }
    }
}

/// Cumulative loss/accuracy totals for the current epoch.
///
/// Reset (rebuilt) at the start of every pass and pushed once per batch.
/// Both derived quantities are defined as 0 on an empty pass so that an
/// empty data sequence never divides by zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunningStats {
    loss_sum: f64,
    n_batches: usize,
    n_correct: usize,
    n_total: usize,
}

impl RunningStats {
    /// Records one batch: its loss value, how many predictions matched the
    /// target label, and how many predictions were made.
    pub fn push(&mut self, loss: f64, correct: usize, total: usize) {
        debug_assert!(correct <= total);
        self.loss_sum += loss;
        self.n_batches += 1;
        self.n_correct += correct;
        self.n_total += total;
    }

    /// Sum of per-batch losses divided by the number of batches, or 0 if no
    /// batch has been pushed.
    pub fn avg_loss(&self) -> f64 {
        if self.n_batches == 0 {
            0.0
        } else {
            self.loss_sum / self.n_batches as f64
        }
    }

    /// Cumulative percent accuracy in `[0, 100]`, or 0 if no predictions
    /// have been counted.
    pub fn accuracy(&self) -> f64 {
        if self.n_total == 0 {
            0.0
        } else {
            100.0 * self.n_correct as f64 / self.n_total as f64
        }
    }

    pub fn n_batches(&self) -> usize {
        self.n_batches
    }

    pub fn n_correct(&self) -> usize {
        self.n_correct
    }

    pub fn n_total(&self) -> usize {
        self.n_total
    }
}

/// The metrics tracker collaborator.
///
/// Receives one [MetricsTracker::update] per batch from both passes, with
/// the running-average loss and running accuracy as of that batch, and one
/// [MetricsTracker::calc_metrics] at the end of each pass.
pub trait MetricsTracker {
    fn update(&mut self, preds: &[usize], targets: &[usize], loss: f64, accuracy: f64);

    fn calc_metrics(&mut self, epoch: usize, phase: Phase);
}

/// No-op tracker for runs that don't collect metrics.
impl MetricsTracker for () {
    fn update(&mut self, _preds: &[usize], _targets: &[usize], _loss: f64, _accuracy: f64) {}

    fn calc_metrics(&mut self, _epoch: usize, _phase: Phase) {}
}

/// Final numbers for one completed pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub phase: Phase,
    pub loss: f64,
    pub accuracy: f64,
    pub n_batches: usize,
}

/// In-memory tracker that keeps one [EpochSummary] per completed pass.
///
/// The last streamed update already carries the pass's cumulative values,
/// so aggregation just snapshots it.
#[derive(Clone, Debug, Default)]
pub struct History {
    last_loss: f64,
    last_accuracy: f64,
    n_batches: usize,
    pub epochs: Vec<EpochSummary>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summaries recorded for `phase`, in epoch order.
    pub fn phase(&self, phase: Phase) -> Vec<&EpochSummary> {
        self.epochs.iter().filter(|e| e.phase == phase).collect()
    }
}

impl MetricsTracker for History {
    fn update(&mut self, _preds: &[usize], _targets: &[usize], loss: f64, accuracy: f64) {
        self.last_loss = loss;
        self.last_accuracy = accuracy;
        self.n_batches += 1;
    }

    fn calc_metrics(&mut self, epoch: usize, phase: Phase) {
        self.epochs.push(EpochSummary {
            epoch,
            phase,
            loss: self.last_loss,
            accuracy: self.last_accuracy,
            n_batches: self.n_batches,
        });
        self.last_loss = 0.0;
        self.last_accuracy = 0.0;
        self.n_batches = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats_are_zero() {
        let stats = RunningStats::default();
        assert_eq!(stats.avg_loss(), 0.0);
        assert_eq!(stats.accuracy(), 0.0);
        assert_eq!(stats.n_batches(), 0);
    }

    #[test]
    fn test_avg_loss_is_sum_over_batches() {
        let mut stats = RunningStats::default();
        let losses = [0.5, 1.5, 0.25, 0.75];
        let mut sum = 0.0;
        for (k, &loss) in losses.iter().enumerate() {
            stats.push(loss, 1, 2);
            sum += loss;
            assert_eq!(stats.avg_loss(), sum / (k + 1) as f64);
        }
    }

    #[test]
    fn test_accuracy_stays_in_bounds_and_counts_are_monotonic() {
        let mut stats = RunningStats::default();
        let mut prev_correct = 0;
        let mut prev_total = 0;
        for (correct, total) in [(3, 4), (0, 4), (4, 4), (2, 3)] {
            stats.push(1.0, correct, total);
            assert!(stats.n_correct() >= prev_correct);
            assert!(stats.n_total() >= prev_total);
            assert!(stats.n_correct() <= stats.n_total());
            assert!((0.0..=100.0).contains(&stats.accuracy()));
            prev_correct = stats.n_correct();
            prev_total = stats.n_total();
        }
        assert_eq!(stats.accuracy(), 100.0 * 9.0 / 15.0);
    }

    #[test]
    fn test_history_snapshots_last_update_per_phase() {
        let mut history = History::new();
        history.update(&[0], &[0], 0.9, 50.0);
        history.update(&[1], &[1], 0.6, 75.0);
        history.calc_metrics(0, Phase::Train);
        history.update(&[1], &[0], 0.8, 0.0);
        history.calc_metrics(0, Phase::Test);

        assert_eq!(history.epochs.len(), 2);
        let train = history.phase(Phase::Train);
        assert_eq!(train[0].loss, 0.6);
        assert_eq!(train[0].accuracy, 75.0);
        assert_eq!(train[0].n_batches, 2);
        let test = history.phase(Phase::Test);
        assert_eq!(test[0].accuracy, 0.0);
        assert_eq!(test[0].n_batches, 1);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Train.as_str(), "train");
        assert_eq!(Phase::Test.as_str(), "test");
    }
}
