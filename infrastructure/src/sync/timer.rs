use std::future::pending;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Why a [`Timer`] stopped ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    Deadline,
    Cancelled,
}

/// Coarse periodic wake-ups: the first tick after `delay`, then every `period`, until the deadline
/// passes or the token is cancelled.
pub struct Timer {
    interval: Interval,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Timer {
    pub fn new(delay: Duration, period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + delay, period);
        // A slow query pushes the next wait back instead of bursting queries to catch up.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn tick(&mut self) -> ControlFlow<Stop> {
        if self.cancel.is_cancelled() {
            return ControlFlow::Break(Stop::Cancelled);
        }
        tokio::select! {
            biased;
            stop = stop_signal(&self.cancel, self.deadline) => ControlFlow::Break(stop),
            _ = self.interval.tick() => ControlFlow::Continue(()),
        }
    }

    /// Resolves once the deadline passes or the token is cancelled, whichever comes first.
    pub async fn stopped(&self) -> Stop {
        stop_signal(&self.cancel, self.deadline).await
    }
}

async fn stop_signal(cancel: &CancellationToken, deadline: Option<Instant>) -> Stop {
    let expired = async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => pending().await,
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Stop::Cancelled,
        _ = expired => Stop::Deadline,
    }
}
