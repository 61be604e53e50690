use rand::rngs::StdRng;
use rand::SeedableRng;

use cadence::timing::{next_delay, TimingModel, MIN_DELAY_MS};

fn mean_and_sd(samples: &[f64]) -> (f64, f64) {
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

#[test]
fn delays_follow_the_requested_normal() {
    let mut model = TimingModel::new(Some(42), 0.5);
    let samples: Vec<f64> = (0..10_000).map(|_| model.delay_ms(1_000.0)).collect();
    let (mean, sd) = mean_and_sd(&samples);

    // The 60 ms floor clips about 3% of the left tail, nudging the mean up slightly.
    assert!((mean - 1_000.0).abs() < 30.0, "mean {mean}");
    assert!((sd - 500.0).abs() < 50.0, "sd {sd}");
    assert!(samples.iter().all(|&d| d >= MIN_DELAY_MS));
}

#[test]
fn short_intervals_collapse_to_the_floor() {
    let mut rng = StdRng::seed_from_u64(3);
    let samples: Vec<f64> = (0..5_000).map(|_| next_delay(2.0, 1.0, &mut rng)).collect();
    assert!(samples.iter().all(|&d| d == MIN_DELAY_MS));
}

#[test]
fn seeded_models_agree() {
    let mut a = TimingModel::new(Some(9), 0.5);
    let mut b = TimingModel::new(Some(9), 0.5);
    for _ in 0..100 {
        assert_eq!(a.delay(250.0), b.delay(250.0));
    }
}
