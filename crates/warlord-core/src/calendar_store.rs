//! [`TurnStateStore`] over the shared [`WorldCalendar`].
//!
//! Without a snapshot path the store is purely in-memory. With one, every
//! write serializes the whole calendar (which carries the checkpoint too)
//! and replaces the snapshot file atomically: write to a sibling temp file,
//! then rename over the original. Last turn time, checkpoint and world
//! progress are therefore always recovered together after a restart.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info};
use warlord_types::Checkpoint;

use crate::calendar::{SharedCalendar, WorldCalendar};
use crate::store::{StoreError, TurnStateStore};

/// Calendar-backed turn state store.
#[derive(Debug, Clone)]
pub struct CalendarStore {
    calendar: SharedCalendar,
    snapshot_path: Option<PathBuf>,
}

impl CalendarStore {
    /// A store that keeps everything in memory.
    pub const fn in_memory(calendar: SharedCalendar) -> Self {
        Self {
            calendar,
            snapshot_path: None,
        }
    }

    /// Open the snapshot at `path`, or create it from `fresh` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupted`] if the file exists but cannot be
    /// parsed or violates calendar invariants, and [`StoreError::Io`] if it
    /// cannot be read or the initial snapshot cannot be written.
    pub async fn open(path: impl Into<PathBuf>, fresh: WorldCalendar) -> Result<Self, StoreError> {
        let path = path.into();
        let calendar = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let calendar: WorldCalendar =
                    serde_json::from_slice(&bytes).map_err(|err| StoreError::Corrupted {
                        reason: format!("{}: {err}", path.display()),
                    })?;
                calendar.validate().map_err(|reason| StoreError::Corrupted {
                    reason: format!("{}: {reason}", path.display()),
                })?;
                info!(
                    path = %path.display(),
                    last_turn_time = %calendar.last_turn_time(),
                    date = %calendar.date(),
                    has_checkpoint = calendar.checkpoint().is_some(),
                    "Loaded calendar snapshot"
                );
                calendar
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No calendar snapshot, starting fresh");
                write_snapshot(&path, &fresh).await?;
                fresh
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            calendar: calendar.into_shared(),
            snapshot_path: Some(path),
        })
    }

    /// The calendar this store persists, for handing to the processor.
    pub fn calendar(&self) -> SharedCalendar {
        SharedCalendar::clone(&self.calendar)
    }

    /// Path of the snapshot file, if any.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let snapshot = self.calendar.lock().await.clone();
        write_snapshot(path, &snapshot).await
    }
}

async fn write_snapshot(path: &Path, calendar: &WorldCalendar) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(calendar)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote calendar snapshot");
    Ok(())
}

impl TurnStateStore for CalendarStore {
    async fn load_last_turn_time(&self) -> Result<NaiveDateTime, StoreError> {
        Ok(self.calendar.lock().await.last_turn_time())
    }

    async fn load_next_general_turn_time(
        &self,
        _checkpoint: Option<&Checkpoint>,
    ) -> Result<Option<NaiveDateTime>, StoreError> {
        Ok(self.calendar.lock().await.next_general_turn_time())
    }

    async fn save_last_turn_time(&mut self, last_turn_time: NaiveDateTime) -> Result<(), StoreError> {
        self.calendar.lock().await.set_last_turn_time(last_turn_time);
        self.flush().await
    }

    async fn load_checkpoint(&self) -> Result<Option<Checkpoint>, StoreError> {
        Ok(self.calendar.lock().await.checkpoint().cloned())
    }

    async fn save_checkpoint(&mut self, checkpoint: Option<Checkpoint>) -> Result<(), StoreError> {
        self.calendar.lock().await.set_checkpoint(checkpoint);
        self.flush().await
    }

    async fn save_progress(
        &mut self,
        last_turn_time: NaiveDateTime,
        checkpoint: Option<Checkpoint>,
    ) -> Result<(), StoreError> {
        {
            let mut calendar = self.calendar.lock().await;
            calendar.set_last_turn_time(last_turn_time);
            calendar.set_checkpoint(checkpoint);
        }
        self.flush().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use warlord_types::GameDate;

    use super::*;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 4, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn fresh() -> WorldCalendar {
        WorldCalendar::seeded(at(6), GameDate::new(184, 1).unwrap(), 3, 60)
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("warlord-{label}-{}.json", uuid::Uuid::now_v7()))
    }

    #[tokio::test]
    async fn in_memory_round_trip() {
        let mut store = CalendarStore::in_memory(fresh().into_shared());
        let checkpoint = Checkpoint::new(serde_json::json!({ "units_done": 2 }));

        store.save_progress(at(7), Some(checkpoint.clone())).await.unwrap();
        assert_eq!(store.load_last_turn_time().await.unwrap(), at(7));
        assert_eq!(store.load_checkpoint().await.unwrap(), Some(checkpoint));

        store.save_checkpoint(None).await.unwrap();
        assert_eq!(store.load_checkpoint().await.unwrap(), None);
        assert_eq!(
            store.load_next_general_turn_time(None).await.unwrap(),
            Some(at(6))
        );
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let path = temp_path("reopen");
        let checkpoint = Checkpoint::new(serde_json::json!({ "units_done": 5 }));
        {
            let mut store = CalendarStore::open(&path, fresh()).await.unwrap();
            store.save_progress(at(8), Some(checkpoint.clone())).await.unwrap();
        }

        let other_seed = WorldCalendar::new(at(0), GameDate::new(1, 1).unwrap());
        let reopened = CalendarStore::open(&path, other_seed).await.unwrap();
        assert_eq!(reopened.load_last_turn_time().await.unwrap(), at(8));
        assert_eq!(reopened.load_checkpoint().await.unwrap(), Some(checkpoint));
        assert_eq!(reopened.calendar().lock().await.generals().count(), 3);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_snapshot_is_corrupted() {
        let path = temp_path("corrupt");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let result = CalendarStore::open(&path, fresh()).await;
        let err = result.unwrap_err();
        assert!(err.is_fatal(), "expected corruption, got {err}");

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
