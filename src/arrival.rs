use crate::{EngineError, Result};
use dyn_clone::DynClone;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// An Arrival is one simulated query entering the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    /// Sequence identifier supplied by whoever emitted the arrival.
    pub id: u64,
    /// When the arrival was emitted.
    pub emitted_at: Instant,
}

impl Arrival {
    /// An arrival stamped with the current time.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            emitted_at: Instant::now(),
        }
    }
}

/// The outcome of offering one Arrival to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Admission {
    /// The arrival now occupies the channel at this index.
    Accepted { channel: usize },
    /// Every channel was busy; the arrival is lost.
    Rejected,
}

impl Admission {
    /// Whether the arrival claimed a channel.
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Something that decides what happens to each Arrival.
pub trait ArrivalHandler: DynClone + Debug + Send + Sync {
    /// Decides accept-or-reject for `arrival`, on the caller's thread.
    fn on_arrival(&self, arrival: Arrival) -> Admission;
}

dyn_clone::clone_trait_object!(ArrivalHandler);

/// Emits numbered arrivals to a single registered handler.
///
/// Delivery is synchronous: `emit` runs the handler on the calling thread and
/// returns once the handler has made its decision.
#[derive(Debug, Clone)]
pub struct ArrivalSource {
    /// The single subscriber.
    handler: Box<dyn ArrivalHandler>,
}

impl ArrivalSource {
    /// Registers `handler` as the one receiver of every arrival.
    pub fn new(handler: impl ArrivalHandler + 'static) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    /// Offers arrival `id` to the handler. Ids are not checked for order or
    /// uniqueness.
    pub fn emit(&self, id: u64) -> Admission {
        self.handler.on_arrival(Arrival::new(id))
    }
}

/// How the driver spaces consecutive arrivals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// A constant gap of `1 / arrival_rate`.
    #[default]
    Fixed,
    /// Gaps drawn from `Exp(arrival_rate)`, i.e. a Poisson arrival process.
    /// With no seed the generator is seeded from the OS.
    Exponential {
        /// Seed for a reproducible gap sequence.
        seed: Option<u64>,
    },
}

/// Produces inter-arrival gaps for one run.
#[derive(Debug, Clone)]
pub enum ArrivalPacer {
    /// Always the same gap.
    Fixed(Duration),
    /// Gaps sampled from `dist` using `rng`.
    Exponential {
        /// Inter-arrival distribution with mean `1 / arrival_rate`.
        dist: Exp<f64>,
        /// Source of randomness, seeded once per run.
        rng: StdRng,
    },
}

impl ArrivalPacer {
    /// A pacer for `arrival_rate` arrivals per second. Fails if the rate is
    /// not positive or its mean gap does not fit in a `Duration`.
    pub fn new(pacing: Pacing, arrival_rate: f64) -> Result<Self> {
        if !(arrival_rate.is_finite() && arrival_rate > 0.0) {
            return Err(EngineError::InvalidConfiguration(format!(
                "arrival rate must be positive and finite, got {arrival_rate}"
            )));
        }

        let mean_gap = Duration::try_from_secs_f64(1.0 / arrival_rate).map_err(|e| {
            EngineError::InvalidConfiguration(format!(
                "arrival rate {arrival_rate} gives an unrepresentable gap: {e}"
            ))
        })?;

        Ok(match pacing {
            Pacing::Fixed => Self::Fixed(mean_gap),
            Pacing::Exponential { seed } => {
                let dist = Exp::new(arrival_rate)
                    .map_err(|e| EngineError::InvalidConfiguration(e.to_string()))?;
                let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
                Self::Exponential { dist, rng }
            }
        })
    }

    /// The time to wait before the next arrival. A sample too large for a
    /// `Duration` saturates to `Duration::MAX`.
    pub fn next_gap(&mut self) -> Duration {
        match self {
            Self::Fixed(gap) => *gap,
            Self::Exponential { dist, rng } => {
                Duration::try_from_secs_f64(dist.sample(rng)).unwrap_or(Duration::MAX)
            }
        }
    }
}
