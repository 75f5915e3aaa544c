/// Integration tests for the complete step counting pipeline.
/// Feeds synthetic walks through conditioning, thresholding and validation
/// and checks end-to-end counts, revocation behavior and the agreement of
/// batch and streaming runs.

#[cfg(test)]
mod integration_tests {
    use approx::assert_relative_eq;

    use crate::config::StepCounterConfig;
    use crate::pipeline::*;
    use crate::types::*;

    /// Synthetic walk description: Gaussian magnitude bumps on a flat trough,
    /// with the acceleration vector along a fixed direction.
    struct Walk {
        bumps: usize,
        start_s: f64,
        spacing_s: f64,
        peak: f64,
        trough: f64,
        sigma_s: f64,
        period_ns: i64,
        duration_s: f64,
        direction: [f64; 3],
    }

    impl Default for Walk {
        fn default() -> Self {
            Self {
                bumps: 9,
                start_s: 0.6,
                spacing_s: 0.6,
                peak: 1.5,
                trough: 0.2,
                sigma_s: 0.15,
                period_ns: 20_000_000,
                duration_s: 10.0,
                direction: [0.1, 0.3, 0.9],
            }
        }
    }

    impl Walk {
        fn samples(&self) -> Vec<Sample> {
            let centers: Vec<f64> = (0..self.bumps)
                .map(|j| self.start_s + j as f64 * self.spacing_s)
                .collect();
            let norm = self.direction.iter().map(|a| a * a).sum::<f64>().sqrt();
            let mut out = Vec::new();
            for k in 0.. {
                let timestamp = k * self.period_ns;
                let t = timestamp as f64 / 1e9;
                if t >= self.duration_s {
                    break;
                }
                let bumps: f64 = centers
                    .iter()
                    .map(|c| {
                        (self.peak - self.trough)
                            * (-((t - c) * (t - c)) / (2.0 * self.sigma_s * self.sigma_s)).exp()
                    })
                    .sum();
                let m = self.trough + bumps;
                let [x, y, z] = self.direction.map(|a| a / norm * m);
                out.push(Sample::new(timestamp, x, y, z));
            }
            out
        }
    }

    fn run_streaming(samples: &[Sample]) -> (Vec<ValidatorEvent>, StepCountResult) {
        let mut counter = StepCounter::new(StepCounterConfig::default()).unwrap();
        let events = counter.process_batch(samples);
        (events, counter.finish())
    }

    // ========================================================================
    // END-TO-END SCENARIOS
    // ========================================================================

    #[test]
    fn test_nine_step_walk_counts_after_warm_up() {
        // Nine bumps from t = 4.2 s, 0.6 s apart, 10 s at 50 Hz.
        let walk = Walk {
            start_s: 4.2,
            ..Default::default()
        };
        let config = StepCounterConfig::default();
        let result = count_steps(&walk.samples(), &config).unwrap();

        // The first St_min - 1 arm cycles only warm the validator up.
        assert_eq!(result.step_count, walk.bumps - config.min_consecutive_peaks + 1);
        let indices: Vec<usize> = result.accepted_steps.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![360, 390, 420, 450]);
        for (step, expected_t) in result.accepted_steps.iter().zip([7.2, 7.8, 8.4, 9.0]) {
            assert_relative_eq!(step.t, expected_t, epsilon = 1e-9);
            assert_relative_eq!(step.magnitude, 1.4895, epsilon = 1e-3);
        }
        for pair in result.accepted_steps.windows(2) {
            let gap = pair[1].t - pair[0].t;
            assert!(gap >= config.step_interval_min && gap <= config.step_interval_max);
        }
        assert!(result.revoked_steps.is_empty());
        assert_eq!(result.positive_crossings.len(), 9);
        assert_eq!(result.negative_crossings.len(), 9);
    }

    #[test]
    fn test_cadence_series_tracks_walk() {
        let walk = Walk {
            start_s: 4.2,
            ..Default::default()
        };
        let result = count_steps(&walk.samples(), &StepCounterConfig::default()).unwrap();

        assert_eq!(result.cadence_series.len(), result.step_count);
        assert_eq!(result.cadence_series[0].value, 0.0);
        for point in &result.cadence_series[1..] {
            assert_relative_eq!(point.value, 1.0 / 0.6, epsilon = 1e-6);
        }
        assert_relative_eq!(result.mean_cadence(), 1.0 / 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_single_bump_counts_zero() {
        let walk = Walk {
            bumps: 1,
            start_s: 2.0,
            duration_s: 4.0,
            ..Default::default()
        };
        let result = count_steps(&walk.samples(), &StepCounterConfig::default()).unwrap();
        assert_eq!(result.step_count, 0);
        assert!(result.accepted_steps.is_empty());
        assert_eq!(result.positive_crossings.len(), 1);
    }

    #[test]
    fn test_quiet_tail_revokes_last_step() {
        // Shallow bumps at 19 ms sampling: residual noise stays far below
        // St_RMS once the walk stops.
        let walk = Walk {
            peak: 1.2,
            trough: 0.95,
            period_ns: 19_000_000,
            duration_s: 12.0,
            ..Default::default()
        };
        let (events, result) = run_streaming(&walk.samples());

        let indices: Vec<usize> = result.accepted_steps.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![189, 220, 252]);
        assert_eq!(result.step_count, 3);
        assert_eq!(result.revoked_steps.len(), 1);
        assert_eq!(result.revoked_steps[0].index, 285);

        // One revoke, and it removed exactly one step.
        let mut count = 0usize;
        let mut revokes = 0;
        for event in &events {
            match event {
                ValidatorEvent::Accepted { .. } => count += 1,
                ValidatorEvent::Revoked { t, step } => {
                    assert_eq!(count, 4);
                    count -= 1;
                    revokes += 1;
                    assert!(t - step.t >= 1.5);
                }
                ValidatorEvent::StaleReset { .. } => panic!("quiet tail must not reset"),
                _ => {}
            }
        }
        assert_eq!(revokes, 1);
        assert_eq!(count, result.step_count);
    }

    #[test]
    fn test_noisy_tail_resets_without_revoking() {
        // Deep bumps leave the residual mean square above St_RMS after the
        // walk, so the stale run is dropped and the last step survives.
        let walk = Walk {
            period_ns: 19_000_000,
            duration_s: 12.0,
            ..Default::default()
        };
        let (events, result) = run_streaming(&walk.samples());

        let indices: Vec<usize> = result.accepted_steps.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![190, 221, 253, 284]);
        assert!(result.revoked_steps.is_empty());

        let stale: Vec<(f64, f64)> = events
            .iter()
            .filter_map(|e| match e {
                ValidatorEvent::StaleReset { t, noise } => Some((*t, *noise)),
                _ => None,
            })
            .collect();
        assert_eq!(stale.len(), 1);
        assert!(stale[0].1 >= StepCounterConfig::default().noise_floor);
        assert_relative_eq!(stale[0].0, 363.0 * 0.019, epsilon = 1e-9);
    }

    #[test]
    fn test_resting_recording_never_arms() {
        let samples: Vec<Sample> = (0..500)
            .map(|i| Sample::new(i * 20_000_000, 0.02, -0.01, 1.0))
            .collect();
        let (events, result) = run_streaming(&samples);
        assert!(events.is_empty());
        assert_eq!(result, StepCountResult::default());
    }

    // ========================================================================
    // PIPELINE GUARANTEES
    // ========================================================================

    #[test]
    fn test_streaming_matches_batch() {
        for walk in [
            Walk {
                start_s: 4.2,
                ..Default::default()
            },
            Walk {
                peak: 1.2,
                trough: 0.95,
                period_ns: 19_000_000,
                duration_s: 12.0,
                ..Default::default()
            },
        ] {
            let samples = walk.samples();
            let config = StepCounterConfig::default();
            let batch = count_steps(&samples, &config).unwrap();
            let signals = condition(&samples, &config).unwrap();

            let mut counter = StepCounter::new(config).unwrap();
            for (i, sample) in samples.iter().enumerate() {
                counter.observe(sample);
                assert_eq!(counter.last_sample(), Some(&signals.sample(i)));
            }
            assert_eq!(counter.total_samples(), samples.len());
            assert_eq!(counter.finish(), batch);
        }
    }

    #[test]
    fn test_conditioning_is_deterministic() {
        let samples = Walk::default().samples();
        let config = StepCounterConfig::default();
        let first = condition(&samples, &config).unwrap();
        let second = condition(&samples, &config).unwrap();
        assert_eq!(first, second);

        // A reset counter replays the same stream identically.
        let mut counter = StepCounter::new(config).unwrap();
        let events = counter.process_batch(&samples);
        counter.reset();
        assert_eq!(counter.process_batch(&samples), events);
    }

    #[test]
    fn test_timestamp_origin_is_irrelevant() {
        let walk = Walk {
            start_s: 4.2,
            ..Default::default()
        };
        let samples = walk.samples();
        let shifted: Vec<Sample> = samples
            .iter()
            .map(|s| Sample::new(s.timestamp + 1_700_000_000_000_000_000, s.x, s.y, s.z))
            .collect();
        let config = StepCounterConfig::default();
        assert_eq!(
            count_steps(&samples, &config).unwrap(),
            count_steps(&shifted, &config).unwrap()
        );
    }

    #[test]
    fn test_threshold_floor_holds_end_to_end() {
        let signals = condition(&Walk::default().samples(), &StepCounterConfig::default()).unwrap();
        assert!(signals.threshold.iter().all(|p| p.value >= 1.033));
    }

    #[test]
    fn test_unsorted_input_does_not_panic() {
        let mut samples = Walk::default().samples();
        samples.swap(10, 200);
        samples.swap(300, 301);
        samples.push(Sample::new(samples[5].timestamp, 0.1, 0.3, 0.9));

        let config = StepCounterConfig::default();
        let signals = condition(&samples, &config).unwrap();
        assert_eq!(signals.len(), samples.len());
        // Input order is kept: sample 10 now carries a later timestamp.
        assert!(signals.magnitude[10].t > signals.magnitude[11].t);
        let result = count_steps(&samples, &config).unwrap();
        assert_eq!(result.step_count, result.accepted_steps.len());
    }

    #[test]
    fn test_crossings_lie_between_their_samples() {
        let samples = Walk {
            start_s: 4.2,
            ..Default::default()
        }
        .samples();
        let result = count_steps(&samples, &StepCounterConfig::default()).unwrap();

        let mut all: Vec<&CrossingEvent> = result
            .positive_crossings
            .iter()
            .chain(&result.negative_crossings)
            .collect();
        all.sort_by_key(|c| c.source_index);
        let mut last = f64::NEG_INFINITY;
        for crossing in all {
            let t = crossing.time().unwrap();
            assert!(t <= crossing.sample.t + 1e-12);
            assert!(t >= crossing.sample.t - 0.02 - 1e-12);
            assert!(t > last);
            last = t;
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_report_from_pipeline() {
        use crate::export::StepReportBuilder;

        let samples = Walk {
            start_s: 4.2,
            ..Default::default()
        }
        .samples();
        let config = StepCounterConfig::default();
        let signals = condition(&samples, &config).unwrap();
        let result = count_steps(&samples, &config).unwrap();
        let report = StepReportBuilder::new(&result, &config)
            .recording(signals.len(), signals.duration())
            .build();

        assert_eq!(report.summary.step_count, 4);
        assert_eq!(report.summary.sample_count, 500);
        assert_relative_eq!(report.summary.duration_s, 9.98, epsilon = 1e-9);
        assert!(report.to_json().unwrap().contains(r#""step_count":4"#));
    }
}
