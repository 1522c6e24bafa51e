//! Turn state store: the daemon's persistence boundary.
//!
//! The store durably owns two values that must always be recoverable as a
//! pair: the last completed turn time, and the checkpoint of a run that was
//! cut short inside the window after it. It also answers a read-only
//! question about the world: when is the earliest general-turn due?
//!
//! The daemon is the only writer, and it writes only after a turn run.

use std::future::Future;

use chrono::NaiveDateTime;
use warlord_types::Checkpoint;

/// Errors that can occur in a turn state store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing medium is temporarily unusable. The cycle is retried.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// Reading or writing the backing file failed.
    #[error("store I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Encoding state for storage failed.
    #[error("store serialization error: {source}")]
    Serialization {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// Stored state is unreadable or self-contradictory. Continuing could
    /// double-apply or lose turns, so this is fatal to the daemon.
    #[error("store corrupted: {reason}")]
    Corrupted {
        /// What is wrong with the stored state.
        reason: String,
    },
}

impl StoreError {
    /// Whether the daemon must stop rather than retry.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }
}

/// Durable home of the daemon's turn progress.
pub trait TurnStateStore: Send {
    /// The last fully completed (or checkpoint-resumable) tick boundary.
    fn load_last_turn_time(&self)
    -> impl Future<Output = Result<NaiveDateTime, StoreError>> + Send;

    /// Earliest pending general-turn due time, or `None` if nothing is pending.
    ///
    /// `checkpoint` is the in-flight checkpoint, if any, for stores that keep
    /// per-run progress alongside the world.
    fn load_next_general_turn_time(
        &self,
        checkpoint: Option<&Checkpoint>,
    ) -> impl Future<Output = Result<Option<NaiveDateTime>, StoreError>> + Send;

    /// Persist the last completed turn time.
    fn save_last_turn_time(
        &mut self,
        last_turn_time: NaiveDateTime,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Load the in-flight checkpoint, if any.
    fn load_checkpoint(
        &self,
    ) -> impl Future<Output = Result<Option<Checkpoint>, StoreError>> + Send;

    /// Persist (or clear, with `None`) the in-flight checkpoint.
    fn save_checkpoint(
        &mut self,
        checkpoint: Option<Checkpoint>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persist last turn time and checkpoint as one unit.
    ///
    /// The default writes the checkpoint first and the time second, which is
    /// only as atomic as the two calls. Implementations that can commit both
    /// at once should override it.
    fn save_progress(
        &mut self,
        last_turn_time: NaiveDateTime,
        checkpoint: Option<Checkpoint>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            self.save_checkpoint(checkpoint).await?;
            self.save_last_turn_time(last_turn_time).await
        }
    }
}
