//! Tabulated sweep results, one line per arrival rate.
use crate::experiment::RunOutcome;
use crate::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// `λ μ P0 Pn Q A k P0' Pn' Q' A' k'`, theoretical values first, then
/// empirical ones.
pub fn format_outcome(outcome: &RunOutcome, service_rate: f64) -> String {
    let t = &outcome.theoretical;
    let e = &outcome.empirical;
    format!(
        "{:.1} {:.1} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4} {:.4}",
        outcome.arrival_rate,
        service_rate,
        t.idle_probability,
        t.rejection_probability,
        t.relative_throughput,
        t.absolute_throughput,
        t.mean_busy_channels,
        e.idle_probability,
        e.rejection_probability,
        e.relative_throughput,
        e.absolute_throughput,
        e.mean_busy_channels,
    )
}

/// A one-line theoretical/empirical comparison for console progress.
pub fn summarize_outcome(outcome: &RunOutcome, service_rate: f64) -> String {
    let t = &outcome.theoretical;
    let e = &outcome.empirical;
    format!(
        "λ = {:.1}, μ = {:.1}: {} accepted, {} rejected; P0 {:.4}/{:.4}, Pn {:.4}/{:.4}, k {:.4}/{:.4}",
        outcome.arrival_rate,
        service_rate,
        outcome.snapshot.accepted_arrivals,
        outcome.snapshot.rejected_arrivals,
        t.idle_probability,
        e.idle_probability,
        t.rejection_probability,
        e.rejection_probability,
        t.mean_busy_channels,
        e.mean_busy_channels,
    )
}

/// Appends one line per outcome to `path`, creating the file if needed.
pub fn append_outcomes<'a>(
    path: &Path,
    service_rate: f64,
    outcomes: impl IntoIterator<Item = &'a RunOutcome>,
) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for outcome in outcomes {
        writeln!(file, "{}", format_outcome(outcome, service_rate))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    use super::*;
    use crate::experiment::Metrics;
    use crate::PoolSnapshot;
    use std::time::Duration;

    fn outcome(arrival_rate: f64) -> RunOutcome {
        RunOutcome {
            arrival_rate,
            theoretical: Metrics {
                idle_probability: 0.5,
                rejection_probability: 0.25,
                relative_throughput: 0.75,
                absolute_throughput: 1.5,
                mean_busy_channels: 1.5,
            },
            empirical: Metrics {
                idle_probability: 0.123_45,
                rejection_probability: 0.2,
                relative_throughput: 0.8,
                absolute_throughput: 1.6,
                mean_busy_channels: 1.6,
            },
            snapshot: PoolSnapshot {
                total_arrivals: 5,
                accepted_arrivals: 4,
                rejected_arrivals: 1,
                active_channels: 0,
                cumulative_busy_time: Duration::from_secs(4),
                cumulative_idle_time: Duration::from_secs(1),
                elapsed: Duration::from_secs(2),
            },
        }
    }

    #[test]
    fn line_layout() {
        assert_eq!(
            format_outcome(&outcome(2.0), 1.0),
            "2.0 1.0 0.5000 0.2500 0.7500 1.5000 1.5000 0.1235 0.2000 0.8000 1.6000 1.6000"
        );
    }

    #[test]
    fn summary_pairs_theory_with_measurement() {
        assert_eq!(
            summarize_outcome(&outcome(2.0), 1.0),
            "λ = 2.0, μ = 1.0: 4 accepted, 1 rejected; \
             P0 0.5000/0.1235, Pn 0.2500/0.2000, k 1.5000/1.6000"
        );
    }

    #[test]
    fn appends_rather_than_truncates() {
        let path = std::env::temp_dir().join(format!("erlang-loss-report-{}.txt", std::process::id()));
        let _ = std::fs::remove_file(&path);

        append_outcomes(&path, 1.0, &[outcome(0.1)]).expect("first write");
        append_outcomes(&path, 1.0, &[outcome(0.2), outcome(0.3)]).expect("second write");

        let contents = std::fs::read_to_string(&path).expect("readable");
        let rates: Vec<_> = contents
            .lines()
            .map(|l| l.split(' ').next().unwrap_or_default())
            .collect();
        assert_eq!(rates, ["0.1", "0.2", "0.3"]);

        let _ = std::fs::remove_file(&path);
    }
}
