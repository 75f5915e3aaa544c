/// Basic usage example: feed accelerometer samples, get a step count
use step_sensing::{count_steps, Sample, StepCounter, StepCounterConfig, ValidatorEvent};

fn main() {
    println!("=== Step Sensing Engine: Basic Example ===\n");

    // Simulated 50 Hz recording: rest, then twelve steps 0.6 s apart,
    // then rest again.
    let samples = simulated_walk(12, 0.6, 14.0);
    println!("Processing {} samples...\n", samples.len());

    // Streaming: one sample at a time, events as they happen.
    let mut counter =
        StepCounter::new(StepCounterConfig::default()).expect("default config is valid");
    for sample in &samples {
        if let Some(event) = counter.observe(sample) {
            print_event(&event);
        }
    }
    let streamed = counter.finish();

    // Batch: same result from the whole recording at once.
    let batch =
        count_steps(&samples, &StepCounterConfig::default()).expect("default config is valid");
    assert_eq!(streamed, batch);

    println!("\n=== Summary ===");
    println!("Steps counted: {}", batch.step_count);
    println!("Steps revoked: {}", batch.revoked_steps.len());
    println!("Mean cadence:  {:.2} Hz", batch.mean_cadence());
    for step in &batch.accepted_steps {
        println!("  step at {:6.2} s, peak {:.3} g", step.t, step.magnitude);
    }
}

fn simulated_walk(steps: usize, spacing_s: f64, duration_s: f64) -> Vec<Sample> {
    let period_ns = 20_000_000i64;
    let centers: Vec<f64> = (0..steps).map(|j| 2.0 + j as f64 * spacing_s).collect();
    (0..)
        .map(|k: i64| k * period_ns)
        .take_while(|&ts| (ts as f64 / 1e9) < duration_s)
        .map(|ts| {
            let t = ts as f64 / 1e9;
            let bumps: f64 = centers
                .iter()
                .map(|c| 1.3 * (-((t - c) * (t - c)) / 0.045).exp())
                .sum();
            let m = 0.2 + bumps;
            Sample::new(ts, 0.1 * m, 0.3 * m, 0.95 * m)
        })
        .collect()
}

fn print_event(event: &ValidatorEvent) {
    match event {
        ValidatorEvent::Accepted { step, .. } => {
            println!("[{:6.2}s] step accepted (peak {:.3} g)", step.t, step.magnitude)
        }
        ValidatorEvent::Rejected { candidate, reason, .. } => {
            println!("[{:6.2}s] candidate rejected: {:?}", candidate.t, reason)
        }
        ValidatorEvent::Revoked { t, step } => {
            println!("[{:6.2}s] step at {:.2}s revoked", t, step.t)
        }
        ValidatorEvent::StaleReset { t, noise } => {
            println!("[{:6.2}s] stale run dropped (noise {:.4})", t, noise)
        }
        ValidatorEvent::Armed { .. } | ValidatorEvent::Disarmed { .. } => {}
    }
}
