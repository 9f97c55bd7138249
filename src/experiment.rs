use crate::arrival::{ArrivalPacer, ArrivalSource, Pacing};
use crate::{theory, ChannelPool, EngineError, PoolSnapshot, Result};
use log::debug;
use std::thread;
use std::time::Duration;

/// The steady-state metrics of a loss system at one arrival rate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    /// P0: probability that no channel is occupied.
    pub idle_probability: f64,
    /// Pn: probability that an arrival is rejected.
    pub rejection_probability: f64,
    /// Q: fraction of arrivals served.
    pub relative_throughput: f64,
    /// A: arrivals served per unit time.
    pub absolute_throughput: f64,
    /// k: mean number of occupied channels.
    pub mean_busy_channels: f64,
}

/// Names one of the five metrics, e.g. to pull a series out of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// P0.
    IdleProbability,
    /// Pn.
    RejectionProbability,
    /// Q.
    RelativeThroughput,
    /// A.
    AbsoluteThroughput,
    /// k.
    MeanBusyChannels,
}

impl MetricKind {
    /// Every metric, in chart order.
    pub const ALL: [Self; 5] = [
        Self::IdleProbability,
        Self::RejectionProbability,
        Self::RelativeThroughput,
        Self::AbsoluteThroughput,
        Self::MeanBusyChannels,
    ];

    /// Chart caption.
    pub const fn title(self) -> &'static str {
        match self {
            Self::IdleProbability => "System idle probability (P0)",
            Self::RejectionProbability => "Rejection probability (Pn)",
            Self::RelativeThroughput => "Relative throughput (Q)",
            Self::AbsoluteThroughput => "Absolute throughput (A)",
            Self::MeanBusyChannels => "Mean number of busy channels (k)",
        }
    }

    /// Short symbol used as the y axis label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::IdleProbability => "P0",
            Self::RejectionProbability => "Pn",
            Self::RelativeThroughput => "Q",
            Self::AbsoluteThroughput => "A",
            Self::MeanBusyChannels => "k",
        }
    }

    /// Chart file name: `p-1.png` through `p-5.png`.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::IdleProbability => "p-1.png",
            Self::RejectionProbability => "p-2.png",
            Self::RelativeThroughput => "p-3.png",
            Self::AbsoluteThroughput => "p-4.png",
            Self::MeanBusyChannels => "p-5.png",
        }
    }
}

impl Metrics {
    /// The value of one metric.
    pub const fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::IdleProbability => self.idle_probability,
            MetricKind::RejectionProbability => self.rejection_probability,
            MetricKind::RelativeThroughput => self.relative_throughput,
            MetricKind::AbsoluteThroughput => self.absolute_throughput,
            MetricKind::MeanBusyChannels => self.mean_busy_channels,
        }
    }
}

/// The parameters of a sweep over arrival rates.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepParameters {
    /// μ: service completions per second per channel.
    pub service_rate: f64,
    /// c: number of channels.
    pub channel_count: usize,
    /// Arrivals emitted in each run, with ids `1..=queries_per_run`.
    pub queries_per_run: u64,
    /// λ of the first run.
    pub min_arrival_rate: f64,
    /// Upper bound on λ, inclusive.
    pub max_arrival_rate: f64,
    /// Increment of λ between runs.
    pub arrival_rate_step: f64,
    /// How arrivals are spaced within a run.
    pub pacing: Pacing,
    /// How often to check whether the pool has drained after the last arrival.
    pub drain_poll_interval: Duration,
}

impl Default for SweepParameters {
    fn default() -> Self {
        Self {
            service_rate: 1.0,
            channel_count: 5,
            queries_per_run: 25,
            min_arrival_rate: 0.1,
            max_arrival_rate: 10.0,
            arrival_rate_step: 0.1,
            pacing: Pacing::Fixed,
            drain_poll_interval: Duration::from_millis(100),
        }
    }
}

/// Fails unless `value` is positive and finite.
fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfiguration(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

impl SweepParameters {
    /// Rejects parameters no sweep can run with.
    pub fn validate(&self) -> Result<()> {
        positive("service rate", self.service_rate)?;
        positive("minimum arrival rate", self.min_arrival_rate)?;
        positive("maximum arrival rate", self.max_arrival_rate)?;
        positive("arrival rate step", self.arrival_rate_step)?;

        if self.min_arrival_rate > self.max_arrival_rate {
            return Err(EngineError::InvalidConfiguration(format!(
                "minimum arrival rate {} exceeds maximum {}",
                self.min_arrival_rate, self.max_arrival_rate
            )));
        }
        if self.channel_count == 0 {
            return Err(EngineError::InvalidConfiguration(
                "channel count must be positive".to_owned(),
            ));
        }
        if self.queries_per_run == 0 {
            return Err(EngineError::InvalidConfiguration(
                "queries per run must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// The arrival rates of the sweep, from min to max inclusive.
    ///
    /// Rates are computed as `min + i * step` rather than by repeated
    /// addition, and rounded to strip floating point noise.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn arrival_rates(&self) -> Vec<f64> {
        let span = (self.max_arrival_rate - self.min_arrival_rate) / self.arrival_rate_step;
        let steps = (span + 1e-9).floor() as usize;
        (0..=steps)
            .map(|i| {
                let rate = (i as f64).mul_add(self.arrival_rate_step, self.min_arrival_rate);
                (rate * 1e6).round() / 1e6
            })
            .collect()
    }
}

/// Both sides of the comparison at one arrival rate.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// λ of this run.
    pub arrival_rate: f64,
    /// Closed-form Erlang loss values.
    pub theoretical: Metrics,
    /// Values measured from the pool.
    pub empirical: Metrics,
    /// The pool statistics after drain.
    pub snapshot: PoolSnapshot,
}

/// The outcomes of a sweep, ordered by arrival rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepResults {
    /// One outcome per arrival rate.
    pub outcomes: Vec<RunOutcome>,
}

impl SweepResults {
    /// `(arrival_rate, value)` pairs for one metric: theoretical, then empirical.
    pub fn series(&self, kind: MetricKind) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
        self.outcomes
            .iter()
            .map(|o| {
                (
                    (o.arrival_rate, o.theoretical.get(kind)),
                    (o.arrival_rate, o.empirical.get(kind)),
                )
            })
            .unzip()
    }
}

/// Polls the pool until no channel is occupied.
pub fn await_drain(pool: &ChannelPool, poll_interval: Duration) {
    while pool.active_channel_count() > 0 {
        thread::sleep(poll_interval);
    }
}

/// Runs one simulation at `arrival_rate`: emits every arrival with the
/// configured pacing, waits for the pool to drain, then reads the empirical
/// metrics next to the closed-form ones.
pub fn run_single(parameters: &SweepParameters, arrival_rate: f64) -> Result<RunOutcome> {
    let mut pacer = ArrivalPacer::new(parameters.pacing, arrival_rate)?;
    let pool = ChannelPool::new(parameters.channel_count, parameters.service_rate)?;
    let source = ArrivalSource::new(pool.clone());

    debug!(
        "Simulating λ = {arrival_rate}, μ = {} with {} arrivals",
        parameters.service_rate, parameters.queries_per_run
    );
    for id in 1..=parameters.queries_per_run {
        source.emit(id);
        thread::sleep(pacer.next_gap());
    }
    await_drain(&pool, parameters.drain_poll_interval);
    pool.check_invariants()?;

    let relative_throughput = pool.throughput_ratio();
    let empirical = Metrics {
        idle_probability: pool.idle_probability(),
        rejection_probability: pool.rejection_probability(),
        relative_throughput,
        absolute_throughput: arrival_rate * relative_throughput,
        mean_busy_channels: pool.average_busy_channels(parameters.service_rate),
    };

    Ok(RunOutcome {
        arrival_rate,
        theoretical: theory::erlang_loss(
            arrival_rate,
            parameters.service_rate,
            parameters.channel_count,
        ),
        empirical,
        snapshot: pool.snapshot(),
    })
}

/// Runs one simulation per arrival rate, calling `on_run` after each.
pub fn run_sweep(
    parameters: &SweepParameters,
    mut on_run: impl FnMut(&RunOutcome),
) -> Result<SweepResults> {
    parameters.validate()?;

    let mut results = SweepResults::default();
    for arrival_rate in parameters.arrival_rates() {
        let outcome = run_single(parameters, arrival_rate)?;
        debug!(
            "λ = {arrival_rate}: {} accepted, {} rejected",
            outcome.snapshot.accepted_arrivals, outcome.snapshot.rejected_arrivals,
        );
        on_run(&outcome);
        results.outcomes.push(outcome);
    }

    Ok(results)
}
