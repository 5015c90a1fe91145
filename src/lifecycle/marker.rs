//! Process marker file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::AgentError;

/// Advisory "an instance is running" file holding the decimal process id.
///
/// There is no locking: presence is a hint, not a guarantee.
#[derive(Debug, Clone)]
pub struct ProcessMarker {
    path: PathBuf,
}

impl ProcessMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current process id.
    pub fn write_current(&self) -> Result<u32, AgentError> {
        let pid = std::process::id();
        self.write(pid)?;
        Ok(pid)
    }

    pub fn write(&self, pid: u32) -> Result<(), AgentError> {
        let marker_err = |source| AgentError::Marker {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(marker_err)?;
        }
        fs::write(&self.path, pid.to_string()).map_err(marker_err)
    }

    /// Process id recorded in the marker, if any.
    pub fn read(&self) -> Option<u32> {
        fs::read_to_string(&self.path).ok()?.trim().parse().ok()
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Delete the marker. Best effort.
    pub fn remove(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = ?self.path, "Process marker removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = ?self.path, error = %e, "Failed to remove process marker"),
        }
    }
}
