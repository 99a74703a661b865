//! # Verification Code Generation
//!
//! Codes are drawn uniformly from `100000..=999999` using the operating
//! system CSPRNG. A raw `u32` is reduced modulo the range size only when it
//! falls below the largest multiple of that size, which removes modulo bias.

use evote_state::{OneTimeCode, CODE_MAX, CODE_MIN};
use rand_core::{OsRng, RngCore};

/// Source of fresh verification codes.
pub trait CodeGenerator: Send + Sync {
    /// Produce a new, unpredictable code.
    fn next_code(&self) -> OneTimeCode;
}

const SPAN: u64 = (CODE_MAX - CODE_MIN + 1) as u64;

// Largest multiple of SPAN that fits in the u32 sample space.
const ACCEPT_BELOW: u64 = ((u32::MAX as u64 + 1) / SPAN) * SPAN;

/// CSPRNG-backed generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngCodeGenerator;

impl CodeGenerator for OsRngCodeGenerator {
    fn next_code(&self) -> OneTimeCode {
        loop {
            let sample = u64::from(OsRng.next_u32());
            if sample >= ACCEPT_BELOW {
                continue;
            }
            let value = CODE_MIN + (sample % SPAN) as u32;
            if let Ok(code) = OneTimeCode::from_value(value) {
                return code;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evote_state::CODE_LENGTH;
    use std::collections::HashSet;

    #[test]
    fn acceptance_zone_is_multiple_of_span() {
        assert_eq!(ACCEPT_BELOW % SPAN, 0);
        assert!(ACCEPT_BELOW <= u32::MAX as u64 + 1);
    }

    #[test]
    fn codes_are_six_digits_in_range() {
        let gen = OsRngCodeGenerator;
        for _ in 0..1_000 {
            let code = gen.next_code();
            let s = code.expose();
            assert_eq!(s.len(), CODE_LENGTH);
            let v: u32 = s.parse().unwrap();
            assert!((CODE_MIN..=CODE_MAX).contains(&v));
        }
    }

    #[test]
    fn codes_are_not_repeated_predictably() {
        let gen = OsRngCodeGenerator;
        let distinct: HashSet<String> = (0..200)
            .map(|_| gen.next_code().expose().to_string())
            .collect();
        // 200 draws from 900k values; a handful of collisions at most.
        assert!(distinct.len() > 190);
    }

    #[test]
    fn leading_digit_is_roughly_uniform() {
        let gen = OsRngCodeGenerator;
        let mut buckets = [0u32; 9];
        let draws = 45_000;
        for _ in 0..draws {
            let code = gen.next_code();
            let lead = code.expose().as_bytes()[0] - b'1';
            buckets[lead as usize] += 1;
        }
        // Expected 5000 per bucket, standard deviation about 67.
        for count in buckets {
            assert!((4_500..=5_500).contains(&count), "bucket count {count}");
        }
    }
}
