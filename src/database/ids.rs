use rand::Rng;

use crate::types::Identifier;

/// Random numeric application ids with a digit count in `[min_digits, max_digits]`
#[derive(Debug, Clone)]
pub struct IdGenerator {
    min_digits: u32,
    max_digits: u32,
    max_attempts: u32,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(6, 10, 5)
    }
}

impl IdGenerator {
    /// Digit bounds are clamped to what fits an `Identifier`
    pub fn new(min_digits: u32, max_digits: u32, max_attempts: u32) -> Self {
        let min_digits = min_digits.clamp(1, 18);
        let max_digits = max_digits.clamp(min_digits, 18);
        Self {
            min_digits,
            max_digits,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn next_id(&self) -> Identifier {
        let mut rng = rand::thread_rng();
        let digits = rng.gen_range(self.min_digits..=self.max_digits);
        let low = if digits == 1 { 0 } else { 10_i64.pow(digits - 1) };
        let high = 10_i64.pow(digits) - 1;
        rng.gen_range(low..=high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_stay_within_digit_bounds() {
        let ids = IdGenerator::default();
        for _ in 0..1000 {
            let id = ids.next_id();
            assert!((100_000..=9_999_999_999).contains(&id), "id out of range: {}", id);
        }
    }

    #[test]
    fn clamps_inverted_bounds() {
        let ids = IdGenerator::new(8, 3, 0);
        assert_eq!(ids.max_attempts(), 1);
        let id = ids.next_id();
        assert_eq!(id.to_string().len(), 8);
    }
}
