/// A lazy, finite, restartable sequence of `(input, label)` batches.
///
/// [DataSequence::batches] is called once per pass and must return a fresh
/// iterator each time. Batch boundaries and shuffling policy belong to the
/// implementor; the trainer consumes batches strictly in delivery order.
pub trait DataSequence {
    type Input;
    type Label;
    type Iter<'a>: Iterator<Item = (Self::Input, Self::Label)>
    where
        Self: 'a;

    fn batches(&mut self) -> Self::Iter<'_>;
}

/// An in-memory dataset. Every pass yields the same batches in the same
/// order, which also makes it convenient for tests.
impl<X: Clone, L: Clone> DataSequence for Vec<(X, L)> {
    type Input = X;
    type Label = L;
    type Iter<'a>
        = std::iter::Cloned<std::slice::Iter<'a, (X, L)>>
    where
        Self: 'a;

    fn batches(&mut self) -> Self::Iter<'_> {
        self.iter().cloned()
    }
}

/// Batched class scores. The highest score per example is its prediction.
pub trait ClassScores {
    /// Index of the highest score for each example in the batch.
    fn argmax(&self) -> Vec<usize>;
}

/// Batched class labels.
pub trait ClassLabels {
    fn labels(&self) -> Vec<usize>;
}

impl ClassLabels for Vec<usize> {
    fn labels(&self) -> Vec<usize> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sequence_is_restartable() {
        let mut data: Vec<(Vec<f32>, Vec<usize>)> =
            vec![(vec![0.0, 1.0], vec![0]), (vec![2.0, 3.0], vec![1])];
        let first: Vec<_> = data.batches().collect();
        let second: Vec<_> = data.batches().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_vec_labels() {
        let lbl = vec![1usize, 0, 2];
        assert_eq!(lbl.labels(), vec![1, 0, 2]);
    }
}
