//! Closed-form steady state of the Erlang loss model.
use crate::experiment::Metrics;

/// Probability that all `channels` are idle under offered load `load = λ/μ`:
/// `1 / Σ_{i=0..=c} load^i / i!`.
pub fn idle_probability(load: f64, channels: usize) -> f64 {
    let mut term = 1.0;
    let mut sum = term;
    for i in 1..=channels {
        term *= load / i as f64;
        sum += term;
    }
    if sum > 0.0 {
        1.0 / sum
    } else {
        0.0
    }
}

/// Erlang B: probability that an arrival finds every channel busy,
/// `load^c / c! * P0`.
pub fn rejection_probability(load: f64, channels: usize, idle_probability: f64) -> f64 {
    let top_term = (1..=channels).fold(1.0, |term, i| term * load / i as f64);
    top_term * idle_probability
}

/// The five steady-state metrics for one arrival rate.
pub fn erlang_loss(arrival_rate: f64, service_rate: f64, channels: usize) -> Metrics {
    let load = arrival_rate / service_rate;
    let idle = idle_probability(load, channels);
    let rejection = rejection_probability(load, channels, idle);
    let throughput = 1.0 - rejection;

    Metrics {
        idle_probability: idle,
        rejection_probability: rejection,
        relative_throughput: throughput,
        absolute_throughput: arrival_rate * throughput,
        mean_busy_channels: load * throughput,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn single_channel_matches_known_values() {
        // c = 1: P0 = 1 / (1 + ρ), Pn = ρ / (1 + ρ).
        let m = erlang_loss(2.0, 1.0, 1);
        assert!(close(m.idle_probability, 1.0 / 3.0));
        assert!(close(m.rejection_probability, 2.0 / 3.0));
        assert!(close(m.relative_throughput, 1.0 / 3.0));
        assert!(close(m.absolute_throughput, 2.0 / 3.0));
        assert!(close(m.mean_busy_channels, 2.0 / 3.0));
    }

    #[test]
    fn erlang_b_reference_value() {
        // B(c = 5, ρ = 3) = 0.110054...
        let p0 = idle_probability(3.0, 5);
        let b = rejection_probability(3.0, 5, p0);
        assert!((b - 0.110_054).abs() < 1e-6, "B was {b}");
    }

    #[test]
    fn zero_load_is_always_idle() {
        let m = erlang_loss(0.0, 1.0, 5);
        assert!(close(m.idle_probability, 1.0));
        assert!(close(m.rejection_probability, 0.0));
        assert!(close(m.relative_throughput, 1.0));
        assert!(close(m.mean_busy_channels, 0.0));
    }

    #[test]
    fn metrics_stay_in_range_across_loads() {
        for step in 1..=100 {
            let arrival_rate = f64::from(step) / 10.0;
            let m = erlang_loss(arrival_rate, 1.0, 5);
            assert!((0.0..=1.0).contains(&m.idle_probability));
            assert!((0.0..=1.0).contains(&m.rejection_probability));
            assert!((0.0..=5.0).contains(&m.mean_busy_channels));
            assert!(m.absolute_throughput <= arrival_rate);
        }
    }

    #[test]
    fn rejection_grows_with_load() {
        let rejections: Vec<_> = (1..=50)
            .map(|step| erlang_loss(f64::from(step) / 5.0, 1.0, 3).rejection_probability)
            .collect();
        assert!(rejections.windows(2).all(|w| w[0] < w[1]));
    }
}
