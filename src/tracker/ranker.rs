//! Bounded descending ranking of hourly averages.

use crate::error::ConfigError;

pub const MIN_CAPACITY: usize = 1;
pub const MAX_CAPACITY: usize = 10;

/// Keeps the `capacity` largest values offered so far, largest first.
///
/// Tie-break: a value equal to the current minimum of a full ranking does not
/// evict it; only strictly larger values get in.
#[derive(Debug, Clone, PartialEq)]
pub struct TopNRanker {
    capacity: usize,
    values: Vec<f64>,
}

impl TopNRanker {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(ConfigError::invalid(
                "num_max_values",
                format!(
                    "must be an integer between {} and {}, got {}",
                    MIN_CAPACITY, MAX_CAPACITY, capacity
                ),
            ));
        }
        Ok(Self {
            capacity,
            values: Vec::with_capacity(capacity),
        })
    }

    /// Rebuilds a ranking from persisted values.
    ///
    /// Entries that could never have been ranked (negative, non-finite) are
    /// dropped; the rest are sorted and cut to `capacity`.
    pub fn restore(
        capacity: usize,
        values: impl IntoIterator<Item = f64>,
    ) -> Result<Self, ConfigError> {
        let mut ranker = Self::new(capacity)?;
        let mut values: Vec<f64> = values
            .into_iter()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .collect();
        values.sort_by(|a, b| b.total_cmp(a));
        values.truncate(capacity);
        ranker.values = values;
        Ok(ranker)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn minimum(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Offers a value; returns `true` when the ranking changed.
    pub fn offer(&mut self, value: f64) -> bool {
        if !value.is_finite() || value < 0.0 {
            return false;
        }

        if self.values.len() >= self.capacity {
            match self.minimum() {
                Some(min) if value > min => {
                    self.values.pop();
                }
                _ => return false,
            }
        }

        let position = self
            .values
            .iter()
            .position(|existing| value > *existing)
            .unwrap_or(self.values.len());
        self.values.insert(position, value);
        true
    }

    pub fn snapshot(&self) -> &[f64] {
        &self.values
    }

    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }
}
