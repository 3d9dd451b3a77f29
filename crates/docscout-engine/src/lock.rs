//! Single-writer guard for index construction.
//!
//! The marker `<index>.building` is created with create-new semantics, so two
//! processes racing on a missing index cannot both build it. The loser fails
//! fast with [`Error::IndexBuildInProgress`]. The marker is removed on drop.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use docscout_core::error::{Error, Result};

#[derive(Debug)]
pub struct BuildLock {
    marker: PathBuf,
}

impl BuildLock {
    pub fn marker_path(location: &Path) -> PathBuf {
        let mut name = location.as_os_str().to_owned();
        name.push(".building");
        PathBuf::from(name)
    }

    pub fn acquire(location: &Path) -> Result<Self> {
        let marker = Self::marker_path(location);
        if let Some(parent) = marker.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::Ingestion(e.into()))?;
        }
        match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(mut file) => {
                // Owner pid helps when clearing a marker left by a crashed build.
                let _ = writeln!(file, "{}", std::process::id());
                tracing::debug!(marker = %marker.display(), "acquired build lock");
                Ok(Self { marker })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::IndexBuildInProgress(location.to_path_buf())),
            Err(e) => Err(Error::Ingestion(e.into())),
        }
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.marker) {
            tracing::warn!(marker = %self.marker.display(), error = %e, "could not remove build lock");
        }
    }
}
