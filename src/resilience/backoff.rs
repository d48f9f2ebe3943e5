//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Fraction of the delay used as symmetric jitter.
pub const JITTER_RATIO: f64 = 0.1;

/// Unjittered delay before the retry that follows failed attempt `attempt`.
///
/// `min(base * factor^(attempt - 1), max)`; attempt 0 means no delay.
pub fn unjittered_backoff(attempt: u32, base: Duration, factor: f64, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let delay_ms = base.as_millis() as f64 * factor.max(0.0).powi(exponent);
    let max_ms = max.as_millis() as f64;

    // NaN and overflow both land on the cap
    if !delay_ms.is_finite() || delay_ms >= max_ms {
        return max;
    }
    Duration::from_millis(delay_ms.round() as u64)
}

/// Calculate exponential backoff delay with symmetric jitter, capped at `max`.
pub fn calculate_backoff(attempt: u32, base: Duration, factor: f64, max: Duration) -> Duration {
    let capped = unjittered_backoff(attempt, base, factor, max).as_millis() as u64;

    let jitter_range = (capped as f64 * JITTER_RATIO) as u64;
    let jittered = if jitter_range > 0 {
        let offset = rand::thread_rng().gen_range(0..=jitter_range * 2);
        (capped + offset).saturating_sub(jitter_range)
    } else {
        capped
    };

    Duration::from_millis(jittered).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_unjittered_growth() {
        assert_eq!(unjittered_backoff(0, ms(100), 2.0, ms(2000)), ms(0));
        assert_eq!(unjittered_backoff(1, ms(100), 2.0, ms(2000)), ms(100));
        assert_eq!(unjittered_backoff(2, ms(100), 2.0, ms(2000)), ms(200));
        assert_eq!(unjittered_backoff(3, ms(100), 2.0, ms(2000)), ms(400));
        assert_eq!(unjittered_backoff(10, ms(100), 2.0, ms(1000)), ms(1000));
        assert_eq!(unjittered_backoff(u32::MAX, ms(100), 2.0, ms(1000)), ms(1000));
    }

    #[test]
    fn test_backoff_calculation() {
        for _ in 0..200 {
            let b1 = calculate_backoff(1, ms(100), 2.0, ms(2000));
            assert!(b1 >= ms(90) && b1 <= ms(110), "{:?}", b1);

            let b2 = calculate_backoff(2, ms(100), 2.0, ms(2000));
            assert!(b2 >= ms(180) && b2 <= ms(220), "{:?}", b2);

            let max = calculate_backoff(10, ms(100), 2.0, ms(1000));
            assert!(max >= ms(900) && max <= ms(1000), "{:?}", max);
        }
    }

    #[test]
    fn test_non_decreasing_with_growth_factor() {
        for _ in 0..100 {
            let mut previous = Duration::ZERO;
            for attempt in 1..6 {
                let delay = calculate_backoff(attempt, ms(50), 2.0, ms(1000));
                assert!(delay >= previous);
                previous = delay;
            }
        }
    }

    #[test]
    fn test_small_delays_skip_jitter() {
        assert_eq!(calculate_backoff(1, ms(5), 2.0, ms(100)), ms(5));
    }
}
