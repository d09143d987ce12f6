//! Network-namespace scoping.
//!
//! When the engine is constructed with a namespace path, every call into
//! the transport (`start`, `send_rs`) is bracketed by a guard that enters
//! the target namespace on construction and restores the prior one on
//! every exit path, including a panic unwinding through the call.

use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use crate::error::{Error, Result};

/// Enter a network namespace by path, returning a guard that restores the
/// calling thread's original namespace when dropped.
pub fn enter_path<P: AsRef<Path>>(path: P) -> Result<NamespaceGuard> {
    let original = File::open("/proc/self/ns/net").map_err(|e| {
        Error::NamespaceEntryFailed(format!("cannot open current namespace: {e}"))
    })?;

    let target = File::open(path.as_ref()).map_err(|e| {
        Error::NamespaceEntryFailed(format!(
            "cannot open namespace '{}': {e}",
            path.as_ref().display()
        ))
    })?;

    // SAFETY: libc::setns is a standard Linux syscall for switching
    // namespaces. target.as_raw_fd() is a valid fd to a namespace file,
    // CLONE_NEWNET selects the network namespace.
    let ret = unsafe { libc::setns(target.as_raw_fd(), libc::CLONE_NEWNET) };
    if ret < 0 {
        return Err(Error::NamespaceEntryFailed(
            std::io::Error::last_os_error().to_string(),
        ));
    }

    Ok(NamespaceGuard { original })
}

/// Restores the original namespace on drop.
#[derive(Debug)]
pub struct NamespaceGuard {
    original: File,
}

impl NamespaceGuard {
    /// Restore the original namespace explicitly, surfacing any failure.
    pub fn restore(self) -> Result<()> {
        self.do_restore()
    }

    fn do_restore(&self) -> Result<()> {
        // SAFETY: the fd was opened from /proc/self/ns/net when this guard
        // was created and is held open for the guard's whole lifetime.
        let ret = unsafe { libc::setns(self.original.as_raw_fd(), libc::CLONE_NEWNET) };
        if ret < 0 {
            return Err(Error::NamespaceEntryFailed(
                std::io::Error::last_os_error().to_string(),
            ));
        }
        Ok(())
    }
}

impl Drop for NamespaceGuard {
    fn drop(&mut self) {
        if let Err(e) = self.do_restore() {
            tracing::warn!(error = %e, "failed to restore network namespace");
        }
    }
}
