//! Cadence estimation from accepted step times.

use crate::types::AcceptedStep;

/// Instantaneous cadence in Hz: reciprocal of the mean gap between
/// consecutive step times.
///
/// Returns 0 when fewer than two times are given, since no interval exists.
/// Times are expected in ascending order; duplicate times yield an infinite
/// cadence.
pub fn cadence(times: &[f64]) -> f64 {
    if times.len() < 2 {
        return 0.0;
    }
    let gaps = times.windows(2).map(|w| w[1] - w[0]);
    let mean_gap = gaps.sum::<f64>() / (times.len() - 1) as f64;
    1.0 / mean_gap
}

/// Cadence over the last `history` accepted steps.
pub fn cadence_of_steps(steps: &[AcceptedStep], history: usize) -> f64 {
    let start = steps.len().saturating_sub(history);
    let times: Vec<f64> = steps[start..].iter().map(|s| s.t).collect();
    cadence(&times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn step(t: f64) -> AcceptedStep {
        AcceptedStep {
            index: 0,
            t,
            magnitude: 1.4,
        }
    }

    #[test]
    fn test_cadence_undefined_below_two_steps() {
        assert_eq!(cadence(&[]), 0.0);
        assert_eq!(cadence(&[3.2]), 0.0);
    }

    #[test]
    fn test_cadence_regular_steps() {
        assert_relative_eq!(cadence(&[0.0, 0.5, 1.0, 1.5]), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cadence_uses_mean_gap() {
        // Gaps 0.4 and 0.6, mean 0.5.
        assert_relative_eq!(cadence(&[1.0, 1.4, 2.0]), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cadence_duplicate_times() {
        assert!(cadence(&[1.0, 1.0]).is_infinite());
    }

    #[test]
    fn test_cadence_of_steps_uses_recent_history() {
        // Early steps 1 s apart, the last three 0.25 s apart.
        let steps: Vec<AcceptedStep> = [0.0, 1.0, 2.0, 2.25, 2.5].into_iter().map(step).collect();
        assert_relative_eq!(cadence_of_steps(&steps, 3), 4.0, epsilon = 1e-12);
        // History longer than the list uses every step: mean gap 2.5 / 4.
        assert_relative_eq!(cadence_of_steps(&steps, 10), 1.6, epsilon = 1e-12);
        assert_eq!(cadence_of_steps(&steps[..1], 6), 0.0);
    }
}
