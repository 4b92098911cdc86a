//! Named-pipe provisioning and duplex handle management.
//!
//! Both session pipes are plain filesystem FIFOs. They are created on
//! first use and never deleted by this crate, so they persist across
//! sessions. All opens are read+write: on a FIFO that mode never blocks
//! waiting for a peer, and it keeps a writer attached to the read side so
//! the reader does not observe EOF just because the child exited.

use std::fs::{File, OpenOptions};
use std::path::Path;

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tracing::debug;

use crate::{AppError, Result};

/// Ensure a FIFO exists at `path`.
///
/// Creates the FIFO when no filesystem entry exists there; any existing
/// entry (of any kind) is left untouched. Idempotent.
///
/// # Errors
///
/// Returns `AppError::Pipe` if the FIFO cannot be created.
pub fn ensure_fifo(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IWGRP;
    mkfifo(path, mode)
        .map_err(|err| AppError::Pipe(format!("failed to create fifo {}: {err}", path.display())))?;
    debug!(path = %path.display(), "fifo created");
    Ok(())
}

/// Open a pipe in duplex (read+write) mode.
///
/// # Errors
///
/// Returns `AppError::Pipe` if the path cannot be opened.
pub fn open_duplex(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|err| AppError::Pipe(format!("failed to open pipe {}: {err}", path.display())))
}
