//! Control queue: the daemon's command inbox.
//!
//! Many producers, one consumer. Producers call [`ControlQueue::enqueue`]
//! from anywhere (operator console, signal handlers, other tasks) without
//! blocking. The daemon consumes with [`ControlQueue::wait_until`], which is
//! its only suspension point, so it stays responsive to both commands and
//! tick deadlines.
//!
//! The buffer sits behind a `std` mutex: critical sections are a push or a
//! pop and never span an `.await`. Wake-ups go through [`Notify`], whose
//! stored permit means a command enqueued just before the consumer starts
//! waiting is never missed.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use warlord_types::{Command, CommandEnvelope, CommandId};

use crate::clock::Clock;

/// Ordered inbox of operator commands.
#[derive(Debug, Default)]
pub struct ControlQueue {
    pending: Mutex<VecDeque<CommandEnvelope>>,
    notify: Notify,
}

impl ControlQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command and wake the consumer. Never blocks on the consumer.
    pub fn enqueue(&self, command: Command) -> CommandId {
        self.enqueue_envelope(CommandEnvelope::new(command))
    }

    /// Append an envelope built by the transport.
    pub fn enqueue_envelope(&self, envelope: CommandEnvelope) -> CommandId {
        let id = envelope.id;
        self.lock().push_back(envelope);
        self.notify.notify_one();
        id
    }

    /// Remove and return everything queued, oldest first.
    pub fn drain(&self) -> Vec<CommandEnvelope> {
        self.lock().drain(..).collect()
    }

    /// Number of undrained commands. Observational only.
    pub fn depth(&self) -> usize {
        self.lock().len()
    }

    /// Wait for the next command or for `deadline` to elapse.
    ///
    /// `None` waits indefinitely. Returns the oldest queued command as soon
    /// as one is available, and `None` only once the deadline has passed
    /// with the queue still empty.
    pub async fn wait_until<C: Clock + ?Sized>(
        &self,
        clock: &C,
        deadline: Option<Duration>,
    ) -> Option<CommandEnvelope> {
        let Some(deadline) = deadline else {
            return Some(self.wait_forever().await);
        };

        let expiry = clock.sleep(deadline);
        tokio::pin!(expiry);
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(envelope) = self.pop() {
                return Some(envelope);
            }

            tokio::select! {
                () = &mut notified => {}
                () = &mut expiry => return self.pop(),
            }
        }
    }

    async fn wait_forever(&self) -> CommandEnvelope {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(envelope) = self.pop() {
                return envelope;
            }
            notified.await;
        }
    }

    /// Remove every queued `GetStatus`, leaving other commands in order.
    pub fn take_status_requests(&self) -> Vec<CommandEnvelope> {
        let mut pending = self.lock();
        let (requests, rest): (VecDeque<_>, VecDeque<_>) = pending
            .drain(..)
            .partition(|envelope| matches!(envelope.command, Command::GetStatus { .. }));
        *pending = rest;
        requests.into()
    }

    /// Wait until at least one `GetStatus` is queued and take them all.
    ///
    /// Used while a turn run is in flight, so status requests are answered
    /// without waiting for the run. Other commands stay queued.
    pub async fn wait_for_status_requests(&self) -> Vec<CommandEnvelope> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let requests = self.take_status_requests();
            if !requests.is_empty() {
                return requests;
            }
            notified.await;
        }
    }

    fn pop(&self) -> Option<CommandEnvelope> {
        self.lock().pop_front()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<CommandEnvelope>> {
        // A panicking producer cannot leave a VecDeque half-written.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
