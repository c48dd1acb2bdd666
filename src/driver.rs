//! Async event pump for feeding a state machine from a channel.
//!
//! The engine itself is synchronous. [`Driver`] only serializes delivery:
//! it awaits one event at a time from an [`EventSource`] and hands it to
//! [`StateMachine::handle_event`] before asking for the next.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::fsm::{Outcome, StateMachine};
use crate::graph::Event;
use crate::Duration;

/// Asynchronous supplier of events.
#[async_trait]
pub trait EventSource<E>: Send {
    /// Wait for the next event; `None` once the source is exhausted
    async fn next_event(&mut self) -> Option<E>;
}

#[async_trait]
impl<E: Send> EventSource<E> for mpsc::Receiver<E> {
    async fn next_event(&mut self) -> Option<E> {
        self.recv().await
    }
}

#[async_trait]
impl<E: Send> EventSource<E> for mpsc::UnboundedReceiver<E> {
    async fn next_event(&mut self) -> Option<E> {
        self.recv().await
    }
}

/// Why [`Driver::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The event source closed
    SourceClosed,
    /// The machine reached a final state (or its error state)
    MachineStopped,
    /// No event arrived within the configured idle timeout
    IdleTimeout,
}

/// Summary of one [`Driver::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of events handed to the machine
    pub events: usize,
    /// Outcome of the last event, if any was handled
    pub last_outcome: Option<Outcome>,
    /// Why the run ended
    pub reason: StopReason,
}

/// Pumps events from a source into a machine until it stops.
#[derive(Debug, Clone, Default)]
pub struct Driver {
    idle_timeout: Option<Duration>,
}

impl Driver {
    /// A driver that waits indefinitely for events
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up when no event arrives within `timeout`
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Feed events from `source` into `machine`.
    ///
    /// Returns once the source closes, the machine stops, or the idle timeout
    /// elapses. Fails with [`Error::StateMachineNotInitialized`] if the
    /// machine was never initialized.
    pub async fn run<E, D, C, S>(
        &self,
        machine: &mut StateMachine<'_, E, D, C>,
        source: &mut S,
    ) -> Result<RunSummary>
    where
        E: Event + Send,
        S: EventSource<E> + ?Sized,
    {
        if !machine.is_initialized() {
            return Err(Error::StateMachineNotInitialized);
        }

        let mut summary = RunSummary {
            events: 0,
            last_outcome: None,
            reason: StopReason::MachineStopped,
        };

        // A machine whose initial state did not resolve still takes one event,
        // which moves it to the error state.
        while !machine.stopped() || machine.current_state().is_none() {
            let next = match self.idle_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, source.next_event()).await {
                    Ok(next) => next,
                    Err(_) => {
                        debug!(?timeout, events = summary.events, "driver idle timeout");
                        summary.reason = StopReason::IdleTimeout;
                        return Ok(summary);
                    }
                },
                None => source.next_event().await,
            };

            let Some(event) = next else {
                summary.reason = StopReason::SourceClosed;
                return Ok(summary);
            };

            let outcome = machine.handle_event(&event);
            trace!(?outcome, "driver dispatched event");
            summary.events += 1;
            summary.last_outcome = Some(outcome);
        }

        debug!(events = summary.events, "driver stopped with machine");
        Ok(summary)
    }
}
