//! Temporary on-disk copies of uploaded files
//!
//! Every upload is written to its own file so concurrent requests never share
//! state. The file is removed by [`SpooledUpload::remove`], or on drop if the
//! upload is abandoned before that.

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

/// An uploaded file spooled to disk
#[derive(Debug)]
pub struct SpooledUpload {
    path: PathBuf,
    writer: Option<File>,
    size: u64,
    removed: bool,
}

impl SpooledUpload {
    /// Create an empty spool file with a unique name under `dir`
    pub async fn create(dir: &Path) -> io::Result<Self> {
        let path = dir.join(format!("custlink-upload-{}.txt", Uuid::now_v7()));
        let writer = File::create(&path).await?;

        debug!(path = %path.display(), "Created spool file");

        Ok(Self {
            path,
            writer: Some(writer),
            size: 0,
            removed: false,
        })
    }

    /// Append a chunk of the upload
    pub async fn write_chunk(&mut self, chunk: &Bytes) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "spool file already finished"))?;

        writer.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Flush and close the writer, then reopen the file for reading
    pub async fn open(&mut self) -> io::Result<File> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            writer.sync_all().await?;
        }

        File::open(&self.path).await
    }

    /// Delete the spool file without blocking the runtime
    pub async fn remove(mut self) {
        self.writer.take();
        self.removed = true;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Removed spool file"),
            Err(err) => warn!(path = %self.path.display(), error = %err, "Failed to remove spool file"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for SpooledUpload {
    fn drop(&mut self) {
        if self.removed {
            return;
        }

        // Reached only when `remove` was never awaited
        self.writer.take();

        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "Failed to remove spool file");
        } else {
            debug!(path = %self.path.display(), "Removed spool file");
        }
    }
}
