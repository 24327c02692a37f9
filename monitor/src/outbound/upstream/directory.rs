//! Source reading captured payload files from a directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::PayloadCandidate;
use crate::domain::ports::{
    AvailabilitySource, AvailabilitySourceError, CandidateBatch, CandidateRequest,
};

const FILE_MARKER: &str = "getclassdata";
const FILE_EXTENSION: &str = ".jsp";

/// [`AvailabilitySource`] listing `*getClassData*.jsp` captures on disk.
///
/// Each matching file is one candidate, stamped with its modification time.
pub struct DirectoryPayloadSource {
    dir: Dir,
    root: PathBuf,
}

impl DirectoryPayloadSource {
    /// Open the capture directory at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`AvailabilitySourceError::Transport`] when the directory
    /// cannot be opened.
    pub fn open(root: &Path) -> Result<Self, AvailabilitySourceError> {
        let dir = Dir::open_ambient_dir(root, ambient_authority()).map_err(|error| {
            AvailabilitySourceError::transport(format!("open {}: {error}", root.display()))
        })?;
        Ok(Self {
            dir,
            root: root.to_path_buf(),
        })
    }

    fn read_candidate(&self, name: &str) -> Result<PayloadCandidate, AvailabilitySourceError> {
        let io_error = |error: std::io::Error| {
            AvailabilitySourceError::transport(format!("read {name}: {error}"))
        };
        let modified = self
            .dir
            .metadata(name)
            .and_then(|metadata| metadata.modified())
            .map_err(io_error)?;
        let raw_payload = self.dir.read_to_string(name).map_err(io_error)?;
        Ok(PayloadCandidate {
            raw_payload,
            generated_at: DateTime::<Utc>::from(modified.into_std()),
            source_path: Some(self.root.join(name).display().to_string()),
        })
    }
}

fn is_capture_file(name: &str) -> bool {
    let lowered = name.to_lowercase();
    lowered.contains(FILE_MARKER) && lowered.ends_with(FILE_EXTENSION)
}

#[async_trait]
impl AvailabilitySource for DirectoryPayloadSource {
    async fn collect_candidates(
        &self,
        request: &CandidateRequest,
    ) -> Result<CandidateBatch, AvailabilitySourceError> {
        let entries = self.dir.entries().map_err(|error| {
            AvailabilitySourceError::transport(format!("list {}: {error}", self.root.display()))
        })?;

        let mut candidates = Vec::new();
        for listed in entries {
            let entry = listed.map_err(|error| {
                AvailabilitySourceError::transport(format!(
                    "list {}: {error}",
                    self.root.display()
                ))
            })?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().filter(|name| is_capture_file(name)) else {
                continue;
            };
            candidates.push(self.read_candidate(name)?);
        }

        debug!(
            course_id = %request.course_id,
            count = candidates.len(),
            "capture files listed"
        );
        Ok(CandidateBatch::replayed(candidates))
    }
}
