use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Possible states a Channel can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelState {
    /// The Channel can accept the next arrival.
    Free,
    /// The Channel is serving an arrival claimed at `since`.
    Occupied {
        /// When the current occupation was claimed.
        since: Instant,
    },
}

/// One unit of service capacity in the pool.
///
/// A Channel only ever moves `Free -> Occupied -> Free`; there is no
/// cancellation path.
#[derive(Debug)]
pub struct Channel {
    /// Free or occupied since a claim time.
    state: ChannelState,
    /// The completion thread of the current (or most recent) occupation.
    running_task: Option<JoinHandle<()>>,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            state: ChannelState::Free,
            running_task: None,
        }
    }
}

impl Channel {
    /// The current state of the Channel.
    pub const fn state(&self) -> ChannelState {
        self.state
    }

    /// Whether an arrival currently holds this Channel.
    pub const fn is_occupied(&self) -> bool {
        matches!(self.state, ChannelState::Occupied { .. })
    }

    /// Marks the channel occupied as of `now`.
    pub(crate) fn claim(&mut self, now: Instant) {
        debug_assert!(!self.is_occupied(), "claimed an occupied channel");
        self.state = ChannelState::Occupied { since: now };
    }

    /// Binds the completion thread serving the current occupation. A handle
    /// left over from a previous occupation is detached; its thread has
    /// already released the channel.
    pub(crate) fn attach(&mut self, task: JoinHandle<()>) {
        self.running_task = Some(task);
    }

    /// Frees the channel and returns how long it was occupied, or `None` if
    /// it was not occupied.
    pub(crate) fn release(&mut self, now: Instant) -> Option<Duration> {
        match std::mem::replace(&mut self.state, ChannelState::Free) {
            ChannelState::Occupied { since } => Some(now.saturating_duration_since(since)),
            ChannelState::Free => None,
        }
    }

    /// Whether the most recently attached completion thread is still alive.
    /// It can outlive the release by the few instructions it runs after
    /// unlocking.
    pub fn has_running_task(&self) -> bool {
        self.running_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_then_release_reports_busy_time() {
        let mut channel = Channel::default();
        assert_eq!(channel.state(), ChannelState::Free);

        let claimed_at = Instant::now();
        channel.claim(claimed_at);
        assert!(channel.is_occupied());

        let busy = channel.release(claimed_at + Duration::from_millis(250));
        assert_eq!(busy, Some(Duration::from_millis(250)));
        assert_eq!(channel.state(), ChannelState::Free);
    }

    #[test]
    fn attached_task_is_tracked_until_it_finishes() {
        let mut channel = Channel::default();
        assert!(!channel.has_running_task());

        let (tx, rx) = std::sync::mpsc::channel::<()>();
        channel.claim(Instant::now());
        channel.attach(std::thread::spawn(move || {
            let _ = rx.recv();
        }));
        assert!(channel.has_running_task());

        drop(tx);
        while channel.has_running_task() {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(channel.release(Instant::now()).is_some());
    }

    #[test]
    fn release_of_free_channel_is_reported() {
        let mut channel = Channel::default();
        assert_eq!(channel.release(Instant::now()), None);
        assert!(!channel.is_occupied());
    }
}
