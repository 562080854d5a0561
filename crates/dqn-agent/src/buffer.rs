//! Experience replay buffer for the DQN agent

use rand::seq::index;
use rand::Rng;
use std::collections::VecDeque;

use dqn_core::{DqnError, Result, Transition};

/// Bounded FIFO replay buffer with uniform sampling
///
/// Once `capacity` items are stored, every push evicts the oldest one.
/// Sampling never removes anything.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<T = Transition> {
    /// Buffer storage, oldest first
    buffer: VecDeque<T>,
    /// Maximum capacity
    capacity: usize,
}

impl<T: Clone> ReplayBuffer<T> {
    /// Create a new replay buffer
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be non-zero");
        Self {
            // Large capacities fill gradually; don't reserve it all up front.
            buffer: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Add an item, evicting the oldest when full
    pub fn push(&mut self, item: T) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(item);
    }

    /// Draw `batch_size` distinct items uniformly at random
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<T>> {
        if batch_size > self.buffer.len() {
            return Err(DqnError::SampleUnderflow {
                requested: batch_size,
                available: self.buffer.len(),
            });
        }

        let batch = index::sample(rng, self.buffer.len(), batch_size)
            .into_iter()
            .map(|i| self.buffer[i].clone())
            .collect();

        Ok(batch)
    }

    /// Get the current size of the buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Maximum number of stored items
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn contents(buffer: &ReplayBuffer<char>) -> Vec<char> {
        buffer.iter().copied().collect()
    }

    #[test]
    fn test_capacity_three_keeps_last_three() {
        let mut buffer = ReplayBuffer::new(3);
        for item in ['A', 'B', 'C', 'D'] {
            buffer.push(item);
        }
        assert_eq!(contents(&buffer), vec!['B', 'C', 'D']);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_sample_underflow() {
        let mut buffer = ReplayBuffer::new(8);
        buffer.push(1u32);
        buffer.push(2u32);
        let mut rng = StdRng::seed_from_u64(0);

        let err = buffer.sample(3, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            DqnError::SampleUnderflow { requested: 3, available: 2 }
        ));
        assert_eq!(buffer.sample(2, &mut rng).unwrap().len(), 2);
    }

    #[test]
    fn test_sampling_does_not_consume() {
        let mut buffer = ReplayBuffer::new(4);
        for i in 0..4u32 {
            buffer.push(i);
        }
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            buffer.sample(4, &mut rng).unwrap();
        }
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "capacity must be non-zero")]
    fn test_zero_capacity_panics() {
        let _ = ReplayBuffer::<u8>::new(0);
    }

    proptest! {
        #[test]
        fn fifo_eviction_keeps_most_recent(capacity in 1usize..32, n in 0usize..100) {
            let mut buffer = ReplayBuffer::new(capacity);
            for i in 0..n {
                buffer.push(i);
            }
            let expected: Vec<usize> = (n.saturating_sub(capacity)..n).collect();
            prop_assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), expected);
            prop_assert!(buffer.len() <= capacity);
        }

        #[test]
        fn samples_are_distinct_members(
            capacity in 1usize..64,
            n in 1usize..128,
            k_frac in 0.0f64..=1.0,
            seed in any::<u64>(),
        ) {
            let mut buffer = ReplayBuffer::new(capacity);
            for i in 0..n {
                buffer.push(i);
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
            let k = (buffer.len() as f64 * k_frac).floor() as usize;
            let mut rng = StdRng::seed_from_u64(seed);

            let batch = buffer.sample(k, &mut rng).unwrap();
            prop_assert_eq!(batch.len(), k);

            let members: HashSet<usize> = buffer.iter().copied().collect();
            let unique: HashSet<usize> = batch.iter().copied().collect();
            prop_assert_eq!(unique.len(), k);
            prop_assert!(unique.is_subset(&members));
        }
    }
}
