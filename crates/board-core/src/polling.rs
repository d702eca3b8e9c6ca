//! Cancelable repeating timer behind `IssueStore::start_polling`.
//!
//! The controller owns at most one ticker task. Starting while running
//! replaces the ticker, stopping aborts it. Work triggered by a tick is
//! spawned separately by the callback, so aborting the ticker never cancels
//! a fetch that is already in flight.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Owner of the single polling timer handle.
#[derive(Debug, Default)]
pub(crate) struct PollingController {
    handle: Option<JoinHandle<()>>,
    period: Option<Duration>,
}

impl PollingController {
    pub(crate) const fn new() -> Self {
        Self {
            handle: None,
            period: None,
        }
    }

    /// Start ticking every `period`, first tick immediately.
    ///
    /// A running ticker is stopped first, so there is never more than one.
    /// The ticker ends on its own once `on_tick` returns `Break`.
    pub(crate) fn start<F>(&mut self, period: Duration, mut on_tick: F)
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        self.stop();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if on_tick().is_break() {
                    tracing::debug!("Polling target gone, ticker exiting");
                    break;
                }
            }
        });

        self.handle = Some(handle);
        self.period = Some(period);
    }

    /// Cancel future ticks. Returns whether a ticker was running.
    pub(crate) fn stop(&mut self) -> bool {
        self.period = None;
        if let Some(handle) = self.handle.take() {
            handle.abort();
            true
        } else {
            false
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Period of the running ticker.
    pub(crate) fn period(&self) -> Option<Duration> {
        if self.is_running() { self.period } else { None }
    }
}

impl Drop for PollingController {
    fn drop(&mut self) {
        self.stop();
    }
}
