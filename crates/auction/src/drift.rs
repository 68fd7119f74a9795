//! # Tick Drift Accumulator
//!
//! Running, clamped sum of how far the realized pool tick sat from the
//! schedule tick at each epoch boundary. Positive drift means demand kept the
//! price above schedule; negative drift means it sagged below.

/// Clamped running sum of per-epoch tick deviations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct DriftAccumulator {
    value: i32,
    min: i32,
    max: i32,
}

impl DriftAccumulator {
    /// Fresh accumulator at zero; `min <= 0 <= max` is checked by config validation
    pub fn new(min: i32, max: i32) -> Self {
        Self { value: 0, min, max }
    }

    /// Current accumulated drift
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Clamp bounds `(min, max)`
    pub fn bounds(&self) -> (i32, i32) {
        (self.min, self.max)
    }

    /// Whether the accumulator sits on either clamp bound
    pub fn is_saturated(&self) -> bool {
        self.value == self.min || self.value == self.max
    }

    /// Add the deviation `realized - expected` and clamp. Returns the new value.
    pub fn accumulate(&mut self, realized_tick: i32, expected_tick: i32) -> i32 {
        let deviation = realized_tick as i64 - expected_tick as i64;
        let next = (self.value as i64 + deviation).clamp(self.min as i64, self.max as i64);
        self.value = next as i32;
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_and_clamp() {
        let mut drift = DriftAccumulator::new(-1_000, 500);
        assert_eq!(drift.accumulate(-100, -300), 200);
        assert_eq!(drift.accumulate(-300, -300), 200);
        assert_eq!(drift.accumulate(1_000, 0), 500);
        assert!(drift.is_saturated());
        assert_eq!(drift.accumulate(-443_636, 443_636), -1_000);
        assert_eq!(drift.bounds(), (-1_000, 500));
    }

    #[test]
    fn test_extreme_ticks_do_not_overflow() {
        let mut drift = DriftAccumulator::new(i32::MIN, i32::MAX);
        for _ in 0..4 {
            drift.accumulate(443_636, -443_636);
        }
        assert_eq!(drift.value(), 4 * 887_272);
    }
}
