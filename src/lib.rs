//! A wall-clock driven simulation of an Erlang loss system (M/M/c/c).
//!
//! Arrivals are offered to a [`ChannelPool`] with a fixed number of channels.
//! An arrival that finds a free channel occupies it for `1 / service_rate`
//! seconds on its own thread; an arrival that finds every channel busy is
//! rejected and lost. The pool accumulates busy and idle time so that the
//! empirical steady-state metrics can be compared against [`theory`].
pub mod arrival;
pub mod channel;
mod error;
pub mod experiment;
pub mod report;
pub mod theory;

use arrival::{Admission, Arrival, ArrivalHandler};
use channel::{Channel, ChannelState};
use log::{debug, error, trace};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub use error::{EngineError, Result};

/// The statistics of a ChannelPool, read in one critical section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSnapshot {
    /// Every arrival offered to the pool.
    pub total_arrivals: u64,
    /// Arrivals that claimed a channel.
    pub accepted_arrivals: u64,
    /// Arrivals that found every channel busy.
    pub rejected_arrivals: u64,
    /// Channels occupied at the time of the snapshot.
    pub active_channels: usize,
    /// Channel-seconds spent serving completed arrivals.
    pub cumulative_busy_time: Duration,
    /// Sampled time with no channel occupied, ending at an arrival.
    pub cumulative_idle_time: Duration,
    /// Time from construction to the most recent arrival.
    pub elapsed: Duration,
}

/// All mutable state of a ChannelPool. Only ever touched under the pool lock.
#[derive(Debug)]
struct EngineState {
    /// The service slots, scanned in index order for first-fit.
    channels: Vec<Channel>,
    /// Arrivals offered so far.
    total_arrivals: u64,
    /// Arrivals that claimed a channel.
    accepted_arrivals: u64,
    /// Arrivals dropped because every channel was busy.
    rejected_arrivals: u64,
    /// Sum of (release - claim) over completed occupations.
    cumulative_busy_time: Duration,
    /// Sum of inter-arrival gaps that ended with the pool fully idle.
    cumulative_idle_time: Duration,
    /// When the previous arrival was seen; start of the next idle delta.
    last_idle_sample: Instant,
    /// When the pool was constructed.
    run_start: Instant,
    /// `run_start` to the most recent arrival.
    elapsed: Duration,
    /// Channels whose release found them already free.
    faults: Vec<usize>,
}

impl EngineState {
    /// `channel_count` free channels; the run clock starts now.
    fn new(channel_count: usize) -> Self {
        let run_start = Instant::now();
        Self {
            channels: (0..channel_count).map(|_| Channel::default()).collect(),
            total_arrivals: 0,
            accepted_arrivals: 0,
            rejected_arrivals: 0,
            cumulative_busy_time: Duration::ZERO,
            cumulative_idle_time: Duration::ZERO,
            last_idle_sample: run_start,
            run_start,
            elapsed: Duration::ZERO,
            faults: vec![],
        }
    }

    /// Number of occupied channels.
    fn active_channel_count(&self) -> usize {
        self.channels.iter().filter(|c| c.is_occupied()).count()
    }

    /// Lowest-indexed free channel, if any.
    fn first_free_channel(&self) -> Option<usize> {
        self.channels.iter().position(|c| !c.is_occupied())
    }
}

/// What every pool handle and completion thread shares.
#[derive(Debug)]
struct Shared {
    /// The one engine lock.
    state: Mutex<EngineState>,
    /// Signalled whenever a release leaves no channel occupied.
    drained: Condvar,
}

/// The service engine of the loss system.
///
/// A ChannelPool owns `channel_count` channels and every counter and timer of
/// the run behind one lock. The arrival path and every completion thread go
/// through that lock, so `accepted + rejected == total` holds whenever it is
/// released.
///
/// Cloning a ChannelPool yields another handle to the same engine.
#[derive(Debug, Clone)]
pub struct ChannelPool {
    /// Engine state, shared with the completion threads.
    shared: Arc<Shared>,
    /// How long each accepted arrival holds its channel: `1 / service_rate`.
    service_duration: Duration,
}

impl ChannelPool {
    /// Creates a pool of idle channels. The run clock starts now.
    pub fn new(channel_count: usize, service_rate: f64) -> Result<Self> {
        if channel_count == 0 {
            return Err(EngineError::InvalidConfiguration(
                "channel count must be positive".to_owned(),
            ));
        }
        if !(service_rate.is_finite() && service_rate > 0.0) {
            return Err(EngineError::InvalidConfiguration(format!(
                "service rate must be positive and finite, got {service_rate}"
            )));
        }

        let service_duration = Duration::try_from_secs_f64(1.0 / service_rate).map_err(|e| {
            EngineError::InvalidConfiguration(format!(
                "service rate {service_rate} gives an unrepresentable service duration: {e}"
            ))
        })?;

        debug!("Starting pool with {channel_count} channels, service rate {service_rate}");
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState::new(channel_count)),
                drained: Condvar::new(),
            }),
            service_duration,
        })
    }

    /// How long each accepted arrival occupies its channel.
    pub const fn service_duration(&self) -> Duration {
        self.service_duration
    }

    /// The fixed number of channels in the pool.
    pub fn channel_count(&self) -> usize {
        self.shared.state.lock().channels.len()
    }

    /// Decides the fate of one arrival: first-fit into a free channel, or
    /// rejection if none is free.
    pub fn offer(&self, arrival: Arrival) -> Admission {
        let mut state = self.shared.state.lock();
        let now = Instant::now();

        state.total_arrivals += 1;
        state.elapsed = now.saturating_duration_since(state.run_start);

        // Idle time is only sampled when an arrival ends the idle period, so
        // any idle tail after the final arrival is never counted.
        if state.active_channel_count() == 0 {
            let idle = now.saturating_duration_since(state.last_idle_sample);
            state.cumulative_idle_time += idle;
        }
        state.last_idle_sample = now;

        let Some(index) = state.first_free_channel() else {
            state.rejected_arrivals += 1;
            trace!("Arrival #{} rejected", arrival.id);
            return Admission::Rejected;
        };

        state.channels[index].claim(now);
        state.accepted_arrivals += 1;
        trace!("Arrival #{} accepted into channel {}", arrival.id, index);

        let pool = self.clone();
        let id = arrival.id;
        let task = thread::spawn(move || {
            thread::sleep(pool.service_duration);
            pool.complete(index, id);
        });
        state.channels[index].attach(task);

        Admission::Accepted { channel: index }
    }

    /// The release half of a channel occupation, run by its completion thread.
    fn complete(&self, index: usize, id: u64) {
        let mut state = self.shared.state.lock();
        let now = Instant::now();

        match state.channels[index].release(now) {
            Some(busy) => {
                state.cumulative_busy_time += busy;
                trace!("Arrival #{id} served in channel {index} for {busy:?}");
            }
            None => {
                error!("Channel {index} was already free when arrival #{id} completed");
                state.faults.push(index);
            }
        }

        if state.active_channel_count() == 0 {
            self.shared.drained.notify_all();
        }
    }

    /// The state of every channel, in index order.
    pub fn channel_states(&self) -> Vec<ChannelState> {
        self.shared.state.lock().channels.iter().map(Channel::state).collect()
    }

    /// Number of channels currently occupied.
    pub fn active_channel_count(&self) -> usize {
        self.shared.state.lock().active_channel_count()
    }

    /// Blocks until no channel is occupied or `timeout` passes. Returns
    /// whether the pool drained. A timeout too large to form a deadline waits
    /// without one.
    pub fn wait_until_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.shared.state.lock();
        while state.active_channel_count() > 0 {
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .drained
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        return state.active_channel_count() == 0;
                    }
                }
                None => self.shared.drained.wait(&mut state),
            }
        }
        debug!("Pool drained after {} arrivals", state.total_arrivals);
        true
    }

    /// All counters and timers, read under one acquisition of the lock.
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.shared.state.lock();
        PoolSnapshot {
            total_arrivals: state.total_arrivals,
            accepted_arrivals: state.accepted_arrivals,
            rejected_arrivals: state.rejected_arrivals,
            active_channels: state.active_channel_count(),
            cumulative_busy_time: state.cumulative_busy_time,
            cumulative_idle_time: state.cumulative_idle_time,
            elapsed: state.elapsed,
        }
    }

    /// Fraction of the run with no channel occupied.
    pub fn idle_probability(&self) -> f64 {
        let state = self.shared.state.lock();
        let elapsed = state.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            state.cumulative_idle_time.as_secs_f64() / elapsed
        } else {
            0.0
        }
    }

    /// Fraction of arrivals that were rejected.
    pub fn rejection_probability(&self) -> f64 {
        let state = self.shared.state.lock();
        if state.total_arrivals > 0 {
            state.rejected_arrivals as f64 / state.total_arrivals as f64
        } else {
            0.0
        }
    }

    /// Fraction of arrivals that were served.
    pub fn throughput_ratio(&self) -> f64 {
        let state = self.shared.state.lock();
        if state.total_arrivals > 0 {
            state.accepted_arrivals as f64 / state.total_arrivals as f64
        } else {
            0.0
        }
    }

    /// Busy channel-seconds over `elapsed * service_rate`.
    pub fn average_busy_channels(&self, service_rate: f64) -> f64 {
        let state = self.shared.state.lock();
        let elapsed = state.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            state.cumulative_busy_time.as_secs_f64() / (elapsed * service_rate)
        } else {
            0.0
        }
    }

    /// Reports the first broken engine invariant, if any.
    pub fn check_invariants(&self) -> Result<()> {
        let state = self.shared.state.lock();
        if let Some(&channel) = state.faults.first() {
            return Err(EngineError::ChannelAlreadyFree { channel });
        }
        if state.accepted_arrivals + state.rejected_arrivals != state.total_arrivals {
            return Err(EngineError::CounterMismatch {
                total: state.total_arrivals,
                accepted: state.accepted_arrivals,
                rejected: state.rejected_arrivals,
            });
        }
        Ok(())
    }
}

impl ArrivalHandler for ChannelPool {
    fn on_arrival(&self, arrival: Arrival) -> Admission {
        self.offer(arrival)
    }
}
