//! A fast resettable vector based on timestamps.
//!
//! Searches reuse their per state arrays across queries. Resetting by bumping a timestamp
//! makes the reset cost independent of the number of states.

use std::ops::Index;

/// A resettable vector based on 32bit timestamps.
/// Entries written before the last `reset` read as the default value.
#[derive(Debug, Clone)]
pub struct TimestampedVector<T> {
    data: Vec<T>,
    // timestamp of the current iteration, up to date entries carry this one.
    // Never 0, which marks entries not written since the last full reset.
    current: u32,
    timestamps: Vec<u32>,
    default: T,
}

impl<T: Clone> TimestampedVector<T> {
    /// Create a new `TimestampedVector` with `size` elements of the default
    pub fn new(size: usize, default: T) -> TimestampedVector<T> {
        TimestampedVector {
            data: vec![default.clone(); size],
            current: 1,
            timestamps: vec![0; size],
            default,
        }
    }

    /// Reset all elements to the default.
    /// Amortized O(1).
    pub fn reset(&mut self) {
        let (new, overflow) = self.current.overflowing_add(1);
        self.current = new;

        // on overflow old timestamps may become current again, so everything has to be reset manually
        if overflow {
            self.current = 1;
            for element in &mut self.data {
                *element = self.default.clone();
            }
            for timestamp in &mut self.timestamps {
                *timestamp = 0;
            }
        }
    }

    pub fn set(&mut self, index: usize, value: T) {
        self.data[index] = value;
        self.timestamps[index] = self.current;
    }

    /// Was the element written since the last reset?
    pub fn is_set(&self, index: usize) -> bool {
        self.timestamps[index] == self.current
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Index<usize> for TimestampedVector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        if self.timestamps[index] == self.current {
            &self.data[index]
        } else {
            &self.default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_defaults() {
        let mut vec = TimestampedVector::new(3, u32::MAX);
        vec.set(1, 7);
        assert_eq!(vec[1], 7);
        assert!(vec.is_set(1));
        assert!(!vec.is_set(0));
        assert_eq!(vec[0], u32::MAX);

        vec.reset();
        assert_eq!(vec[1], u32::MAX);
        assert!(!vec.is_set(1));
    }

    #[test]
    fn timestamp_overflow_does_not_resurrect_values() {
        let mut vec = TimestampedVector::new(2, false);
        vec.set(0, true);
        vec.current = u32::MAX;
        vec.set(1, true);
        vec.reset();
        assert!(!vec[0]);
        assert!(!vec[1]);
        assert!(!vec.is_set(0));
        assert!(!vec.is_set(1));

        vec.set(0, true);
        assert!(vec.is_set(0));
        assert!(!vec.is_set(1));
    }
}
