//! The turn daemon: state machine plus run loop.
//!
//! [`TurnDaemon`] owns the daemon state, the clock, the turn state store,
//! the processor and the hooks. Everything else talks to it through a
//! [`DaemonHandle`], which only enqueues commands and reads the state board.
//!
//! While `Running`, each cycle:
//!
//! 1. resolves the target (next tick, or an earlier pending general-turn),
//! 2. waits for it on the control queue, applying any command that arrives,
//! 3. runs the processor against the target within the configured budget,
//! 4. persists last turn time and checkpoint together,
//! 5. hands the result to the hooks.
//!
//! Processor and store failures are reported through
//! [`DaemonHooks::on_run_error`] and retried after a backoff that keeps
//! listening to the queue. A corrupted store ends the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use tracing::{debug, error, info, warn};
use warlord_types::{
    Checkpoint, Command, CommandEnvelope, CommandId, DaemonState, RunBudget, Status,
    TurnRunResult,
};

use crate::clock::{Clock, duration_until};
use crate::grid::{self, GridError};
use crate::hooks::{DaemonHooks, HookError};
use crate::processor::{ProcessorError, TurnProcessor};
use crate::queue::ControlQueue;
use crate::store::{StoreError, TurnStateStore};
use crate::transition::{self, Effect};

/// Errors surfaced by the run loop.
///
/// All variants except [`DaemonError::StoreCorrupted`] are reported through
/// hooks and retried; only that one is returned from [`TurnDaemon::run`].
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// The tick grid could not be resolved from the stored turn time.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },

    /// A recoverable store failure.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        source: StoreError,
    },

    /// The turn processor failed.
    #[error("processor error: {source}")]
    Processor {
        /// The underlying processor error.
        #[from]
        source: ProcessorError,
    },

    /// A hook failed after progress was persisted.
    #[error("hook error: {source}")]
    Hook {
        /// The underlying hook error.
        #[from]
        source: HookError,
    },

    /// Stored state cannot be trusted. The daemon stops.
    #[error("store corrupted: {source}")]
    StoreCorrupted {
        /// The underlying store error.
        source: StoreError,
    },
}

impl DaemonError {
    /// Whether the run loop must stop.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreCorrupted { .. })
    }
}

impl From<StoreError> for DaemonError {
    fn from(source: StoreError) -> Self {
        if source.is_fatal() {
            Self::StoreCorrupted { source }
        } else {
            Self::Store { source }
        }
    }
}

/// Why [`TurnDaemon::run`] returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonExit {
    /// A `Shutdown` command was applied.
    Shutdown,
}

/// Runtime settings for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Minutes between world-turn boundaries.
    pub turn_term_minutes: u32,
    /// Work allowed per processor run.
    pub budget: RunBudget,
    /// Delay before retrying a failed cycle.
    pub failure_backoff: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            turn_term_minutes: 60,
            budget: RunBudget::units(500).with_max_duration(Duration::from_secs(20)),
            failure_backoff: Duration::from_secs(5),
        }
    }
}

/// Lock-free published copy of the daemon state.
#[derive(Debug, Default)]
struct StateBoard {
    state: AtomicU8,
}

impl StateBoard {
    fn load(&self) -> DaemonState {
        DaemonState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn store(&self, state: DaemonState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

/// Cloneable handle for feeding and observing a [`TurnDaemon`].
#[derive(Debug, Clone)]
pub struct DaemonHandle {
    queue: Arc<ControlQueue>,
    board: Arc<StateBoard>,
}

impl DaemonHandle {
    /// Enqueue a command. Never blocks.
    pub fn send(&self, command: Command) -> CommandId {
        self.queue.enqueue(command)
    }

    /// Current state and queue depth. Never waits on a running cycle.
    pub fn status(&self) -> Status {
        Status::snapshot(self.board.load(), self.queue.depth())
    }
}

/// What a wait inside a cycle ended with.
enum Wake {
    /// Commands were applied; re-evaluate from the top of the loop.
    Commands,
    /// A `Shutdown` was applied.
    Exit(DaemonExit),
}

/// The turn daemon for one world.
pub struct TurnDaemon<C, S, P, H> {
    clock: C,
    store: S,
    processor: P,
    hooks: H,
    config: DaemonConfig,
    queue: Arc<ControlQueue>,
    board: Arc<StateBoard>,
    state: DaemonState,
    last_turn_time: Option<NaiveDateTime>,
    checkpoint: Option<Checkpoint>,
    pending_target: Option<NaiveDateTime>,
    unsaved: Option<TurnRunResult>,
}

impl<C, S, P, H> TurnDaemon<C, S, P, H>
where
    C: Clock,
    S: TurnStateStore,
    P: TurnProcessor,
    H: DaemonHooks,
{
    /// Create an idle daemon.
    pub fn new(clock: C, store: S, processor: P, hooks: H, config: DaemonConfig) -> Self {
        if config.budget.is_unbounded() {
            warn!("Run budget is unbounded, a long catch-up will not yield to commands");
        }
        Self {
            clock,
            store,
            processor,
            hooks,
            config,
            queue: Arc::new(ControlQueue::new()),
            board: Arc::new(StateBoard::default()),
            state: DaemonState::Idle,
            last_turn_time: None,
            checkpoint: None,
            pending_target: None,
            unsaved: None,
        }
    }

    /// A handle for sending commands and reading status.
    pub fn handle(&self) -> DaemonHandle {
        DaemonHandle {
            queue: Arc::clone(&self.queue),
            board: Arc::clone(&self.board),
        }
    }

    /// Current state and queue depth.
    pub fn status(&self) -> Status {
        Status::snapshot(self.state, self.queue.depth())
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> DaemonState {
        self.state
    }

    /// The turn state store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The turn processor.
    pub const fn processor(&self) -> &P {
        &self.processor
    }

    /// The hooks.
    pub const fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Drive the daemon until a `Shutdown` command is applied.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::StoreCorrupted`] if stored progress cannot be
    /// trusted. Every other failure is reported through hooks and retried.
    pub async fn run(&mut self) -> Result<DaemonExit, DaemonError> {
        info!(
            turn_term_minutes = self.config.turn_term_minutes,
            max_units = ?self.config.budget.max_units,
            max_duration = ?self.config.budget.max_duration,
            "Turn daemon starting"
        );

        loop {
            if let Some(exit) = self.apply_queued() {
                return Ok(exit);
            }

            if self.state != DaemonState::Running {
                let envelope = self.queue.wait_until(&self.clock, None).await;
                if let Some(exit) = envelope.and_then(|envelope| self.apply(&envelope)) {
                    return Ok(exit);
                }
                continue;
            }

            match self.cycle().await {
                Ok(Some(Wake::Exit(exit))) => return Ok(exit),
                Ok(Some(Wake::Commands) | None) => {}
                Err(err) if err.is_fatal() => {
                    error!(error = %err, "Turn daemon stopping");
                    self.set_state(DaemonState::Idle);
                    return Err(err);
                }
                Err(err) => {
                    error!(error = %err, "Turn cycle failed");
                    self.hooks.on_run_error(&err);
                    if let Some(exit) = self.back_off().await {
                        return Ok(exit);
                    }
                }
            }
        }
    }

    /// One pass of the run loop while `Running`.
    ///
    /// Returns `Some` when a command interrupted the wait for the target.
    async fn cycle(&mut self) -> Result<Option<Wake>, DaemonError> {
        if let Some(result) = self.unsaved.take() {
            debug!(turn_target = %result.target(), "Retrying unsaved turn progress");
            self.commit(result).await?;
        }

        let last_turn_time = match self.last_turn_time {
            Some(last) => last,
            None => self.reload().await?,
        };
        let target = match self.pending_target {
            Some(target) => target,
            None => self.resolve_target(last_turn_time).await?,
        };

        if let Some(deadline) = duration_until(self.clock.now(), target) {
            debug!(turn_target = %target, wait_ms = deadline.as_millis(), "Waiting for next turn");
            if let Some(envelope) = self.queue.wait_until(&self.clock, Some(deadline)).await {
                return Ok(Some(self.apply_woken(&envelope)));
            }
        } else {
            // Catching up: let producers on this thread enqueue between runs.
            tokio::task::yield_now().await;
            if self.queue.depth() > 0 {
                return Ok(Some(Wake::Commands));
            }
        }

        let outcome = {
            let run = self
                .processor
                .run(target, &self.config.budget, self.checkpoint.as_ref());
            tokio::pin!(run);
            loop {
                tokio::select! {
                    outcome = &mut run => break outcome,
                    requests = self.queue.wait_for_status_requests() => {
                        // Only status is answered mid-run; everything else waits
                        // for the run to finish, in order.
                        for envelope in &requests {
                            if let Command::GetStatus { request_id } = envelope.command {
                                let status = Status::snapshot(self.state, self.queue.depth());
                                debug!(command_id = %envelope.id, "Status answered during run");
                                self.hooks.on_status(request_id, &status);
                            }
                        }
                    }
                }
            }
        };

        let result = match outcome {
            Ok(result) => result,
            Err(source) => {
                self.pending_target = Some(target);
                return Err(source.into());
            }
        };
        self.commit(result).await?;
        Ok(None)
    }

    /// Persist a run result, then hand it to the hooks.
    ///
    /// On a store failure the result is kept for the next cycle and the
    /// hooks are skipped.
    async fn commit(&mut self, result: TurnRunResult) -> Result<(), DaemonError> {
        let checkpoint = result.checkpoint().cloned();
        if let Err(source) = self
            .store
            .save_progress(result.last_turn_time(), checkpoint.clone())
            .await
        {
            error!(turn_target = %result.target(), error = %source, "Failed to persist turn progress");
            self.unsaved = Some(result);
            return Err(source.into());
        }

        self.last_turn_time = Some(result.last_turn_time());
        self.checkpoint = checkpoint;
        self.pending_target = if result.reached_target() {
            None
        } else {
            Some(result.target())
        };

        info!(
            turn_target = %result.target(),
            last_turn_time = %result.last_turn_time(),
            units = result.units_executed(),
            reached_target = result.reached_target(),
            events = result.events().len(),
            "Turn cycle complete"
        );

        if let Err(source) = self.hooks.flush_changes(&result) {
            self.report_hook_failure(source);
        }
        if let Err(source) = self.hooks.publish_events(&result) {
            self.report_hook_failure(source);
        }
        Ok(())
    }

    fn report_hook_failure(&mut self, source: HookError) {
        warn!(error = %source, "Hook failed");
        self.hooks.on_run_error(&DaemonError::Hook { source });
    }

    /// Load last turn time and checkpoint from the store.
    async fn reload(&mut self) -> Result<NaiveDateTime, DaemonError> {
        let last_turn_time = self.store.load_last_turn_time().await?;
        let checkpoint = self.store.load_checkpoint().await?;
        debug!(
            %last_turn_time,
            has_checkpoint = checkpoint.is_some(),
            "Reloaded turn progress"
        );
        self.last_turn_time = Some(last_turn_time);
        self.checkpoint = checkpoint;
        Ok(last_turn_time)
    }

    /// Next tick boundary, or the earliest pending general-turn if sooner.
    async fn resolve_target(
        &self,
        last_turn_time: NaiveDateTime,
    ) -> Result<NaiveDateTime, DaemonError> {
        let tick = grid::next_tick_time(last_turn_time, i64::from(self.config.turn_term_minutes))?;
        let pending = self
            .store
            .load_next_general_turn_time(self.checkpoint.as_ref())
            .await?;
        Ok(pending.map_or(tick, |due| due.min(tick)))
    }

    /// Sleep out the failure backoff while still applying commands.
    ///
    /// Ends early if the daemon leaves `Running`.
    async fn back_off(&mut self) -> Option<DaemonExit> {
        let resume_at = TimeDelta::from_std(self.config.failure_backoff)
            .ok()
            .and_then(|delay| self.clock.now().checked_add_signed(delay))?;
        debug!(%resume_at, "Backing off before retry");

        while let Some(remaining) = duration_until(self.clock.now(), resume_at) {
            if let Some(envelope) = self.queue.wait_until(&self.clock, Some(remaining)).await {
                if let Wake::Exit(exit) = self.apply_woken(&envelope) {
                    return Some(exit);
                }
                if self.state != DaemonState::Running {
                    return None;
                }
            }
        }
        None
    }

    /// Apply the command that ended a wait, then everything queued behind it.
    fn apply_woken(&mut self, envelope: &CommandEnvelope) -> Wake {
        if let Some(exit) = self.apply(envelope) {
            return Wake::Exit(exit);
        }
        self.apply_queued().map_or(Wake::Commands, Wake::Exit)
    }

    fn apply_queued(&mut self) -> Option<DaemonExit> {
        let pending = self.queue.drain();
        for (applied, envelope) in pending.iter().enumerate() {
            if let Some(exit) = self.apply(envelope) {
                let dropped = pending.len().saturating_sub(applied.saturating_add(1));
                if dropped > 0 {
                    warn!(dropped, "Commands after shutdown were not applied");
                }
                return Some(exit);
            }
        }
        None
    }

    fn apply(&mut self, envelope: &CommandEnvelope) -> Option<DaemonExit> {
        let step = match transition::transition(self.state, envelope.command) {
            Ok(step) => step,
            Err(err) => {
                warn!(
                    command_id = %envelope.id,
                    command = %envelope.command,
                    state = %self.state,
                    "Illegal transition ignored"
                );
                self.hooks.on_command_rejected(envelope, &err);
                return None;
            }
        };

        if step.from != step.to {
            info!(
                command_id = %envelope.id,
                from = %step.from,
                to = %step.to,
                "Daemon state changed"
            );
        }
        self.set_state(step.to);

        match step.effect {
            Effect::None => {}
            Effect::Reload => {
                self.last_turn_time = None;
                self.checkpoint = None;
                self.pending_target = None;
            }
            Effect::ReportStatus { request_id } => {
                let status = self.status();
                self.hooks.on_status(request_id, &status);
            }
            Effect::Shutdown => {
                info!(command_id = %envelope.id, "Turn daemon shutting down");
                return Some(DaemonExit::Shutdown);
            }
        }
        None
    }

    fn set_state(&mut self, state: DaemonState) {
        self.state = state;
        self.board.store(state);
    }
}
