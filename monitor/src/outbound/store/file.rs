//! Monitor store persisted as one pretty-printed JSON document.
//!
//! Every mutation rewrites the document through a temporary sibling file and
//! a rename, so readers never observe a partial write.

use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::{Dir, OpenOptions};
use chrono::Duration;
use mockable::Clock;
use tracing::debug;

use super::state::{MonitorState, session_expiry};
use crate::domain::ports::{MonitorStore, MonitorStoreError, SessionExpiry};
use crate::domain::{
    CachedPayload, CourseId, SharedSession, TrackedTarget, TrackedTargetId, UserId,
};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// [`MonitorStore`] keeping [`MonitorState`] in a JSON file.
pub struct JsonFileMonitorStore {
    dir: Dir,
    file_name: String,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl JsonFileMonitorStore {
    /// Open (creating parent directories as needed) the store at `path`.
    ///
    /// A missing file is treated as empty state.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorStoreError::Connection`] when the path has no file
    /// name or its directory cannot be created or opened.
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> Result<Self, MonitorStoreError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                MonitorStoreError::connection(format!(
                    "state path {} must name a UTF-8 file",
                    path.display()
                ))
            })?
            .to_owned();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Dir::create_ambient_dir_all(parent, ambient_authority()).map_err(|error| {
            MonitorStoreError::connection(format!("create {}: {error}", parent.display()))
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|error| {
            MonitorStoreError::connection(format!("open {}: {error}", parent.display()))
        })?;

        Ok(Self {
            dir,
            file_name,
            clock,
            write_lock: Mutex::new(()),
        })
    }

    /// Track `course_id` for `user_id`; `None` when already tracked.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorStoreError::Query`] when the file cannot be read or
    /// written.
    pub fn track_course(
        &self,
        user_id: UserId,
        course_id: CourseId,
        email: impl Into<String>,
    ) -> Result<Option<TrackedTarget>, MonitorStoreError> {
        let now = self.clock.utc();
        let email_text = email.into();
        self.update(|state| state.track(user_id, course_id, email_text, now))
    }

    /// Stop tracking; returns whether a target was removed.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorStoreError::Query`] when the file cannot be read or
    /// written.
    pub fn untrack_course(
        &self,
        user_id: UserId,
        course_id: &CourseId,
    ) -> Result<bool, MonitorStoreError> {
        self.update(|state| state.untrack(user_id, course_id))
    }

    /// Read the whole state.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorStoreError::Query`] when the file cannot be read.
    pub fn snapshot(&self) -> Result<MonitorState, MonitorStoreError> {
        self.load()
    }

    fn load(&self) -> Result<MonitorState, MonitorStoreError> {
        match self.dir.read_to_string(&self.file_name) {
            Ok(contents) if contents.trim().is_empty() => Ok(MonitorState::default()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|error| {
                MonitorStoreError::query(format!("decode {}: {error}", self.file_name))
            }),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(MonitorState::default()),
            Err(error) => Err(MonitorStoreError::query(format!(
                "read {}: {error}",
                self.file_name
            ))),
        }
    }

    fn update<T>(
        &self,
        mutate: impl FnOnce(&mut MonitorState) -> T,
    ) -> Result<T, MonitorStoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| MonitorStoreError::query("state file lock poisoned"))?;
        let mut state = self.load()?;
        let result = mutate(&mut state);
        let contents = serde_json::to_string_pretty(&state)
            .map_err(|error| MonitorStoreError::query(format!("encode state: {error}")))?;
        self.write_atomic(&contents)?;
        Ok(result)
    }

    fn write_atomic(&self, contents: &str) -> Result<(), MonitorStoreError> {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(".{}.tmp.{}.{counter}", self.file_name, std::process::id());

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        let written = self
            .dir
            .open_with(&tmp_name, &options)
            .and_then(|mut file| {
                file.write_all(contents.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| self.dir.rename(&tmp_name, &self.dir, &self.file_name));

        if let Err(error) = written {
            drop(self.dir.remove_file(&tmp_name));
            return Err(MonitorStoreError::query(format!(
                "write {}: {error}",
                self.file_name
            )));
        }
        debug!(file = %self.file_name, bytes = contents.len(), "state file written");
        Ok(())
    }
}

#[async_trait]
impl MonitorStore for JsonFileMonitorStore {
    async fn shared_session(&self) -> Result<Option<SharedSession>, MonitorStoreError> {
        Ok(self.load()?.shared_session)
    }

    async fn mark_shared_session_expired(
        &self,
        reason: &str,
    ) -> Result<SessionExpiry, MonitorStoreError> {
        let now = self.clock.utc();
        self.update(|state| state.mark_expired(reason, now))
    }

    async fn mark_shared_session_ok(
        &self,
        session_duration: Duration,
    ) -> Result<(), MonitorStoreError> {
        let now = self.clock.utc();
        let expires_at = session_expiry(now, session_duration)?;
        self.update(|state| state.mark_ok(expires_at, now))
    }

    async fn list_tracked_targets(&self) -> Result<Vec<TrackedTarget>, MonitorStoreError> {
        Ok(self.load()?.tracked_targets)
    }

    async fn find_tracked_target(
        &self,
        user_id: UserId,
        course_id: &CourseId,
    ) -> Result<Option<TrackedTarget>, MonitorStoreError> {
        Ok(self.load()?.find_target(user_id, course_id).cloned())
    }

    async fn cached_payload(&self) -> Result<Option<CachedPayload>, MonitorStoreError> {
        Ok(self.load()?.cached_payload)
    }

    async fn save_cached_payload(&self, payload: &CachedPayload) -> Result<(), MonitorStoreError> {
        self.update(|state| state.cached_payload = Some(payload.clone()))
    }

    async fn upsert_course(
        &self,
        course_id: &CourseId,
        display_name: &str,
        open_seats: i64,
    ) -> Result<(), MonitorStoreError> {
        let now = self.clock.utc();
        self.update(|state| state.upsert_course(course_id, display_name, open_seats, now))
    }

    async fn remove_tracked_target(
        &self,
        target_id: TrackedTargetId,
    ) -> Result<(), MonitorStoreError> {
        self.update(|state| state.remove_target(target_id))
    }
}
