use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{DeviceError, Result};

/// Read side of an IIO buffer character device, opened nonblocking.
///
/// Reads return `ErrorKind::WouldBlock` once the kernel buffer is drained;
/// callers treat that as "no more data right now", not as a failure.
pub struct DataChannel {
    file: File,
    path: PathBuf,
}

impl DataChannel {
    /// Open `path` read-only with `O_NONBLOCK`.
    ///
    /// Returns [`DeviceError::Open`] if the file cannot be opened and
    /// [`DeviceError::Configure`] if nonblocking mode cannot be confirmed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
            .map_err(|source| DeviceError::Open {
                path: path.clone(),
                source,
            })?;

        let channel = Self { file, path };
        channel.ensure_nonblocking()?;
        debug!(path = ?channel.path, "opened data channel");
        Ok(channel)
    }

    /// Whether `O_NONBLOCK` is set on the descriptor.
    pub fn is_nonblocking(&self) -> Result<bool> {
        Ok(self.status_flags()? & libc::O_NONBLOCK != 0)
    }

    /// Set `O_NONBLOCK` if the open flags did not stick.
    pub fn ensure_nonblocking(&self) -> Result<()> {
        let flags = self.status_flags()?;
        if flags & libc::O_NONBLOCK != 0 {
            return Ok(());
        }

        warn!(path = ?self.path, "O_NONBLOCK not set after open; setting explicitly");
        // SAFETY: the descriptor is owned by `self.file` and stays open for the call.
        let rc = unsafe {
            libc::fcntl(
                self.file.as_raw_fd(),
                libc::F_SETFL,
                flags | libc::O_NONBLOCK,
            )
        };
        if rc == -1 {
            return Err(self.configure_error(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Path the channel was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn status_flags(&self) -> Result<libc::c_int> {
        // SAFETY: the descriptor is owned by `self.file` and stays open for the call.
        let flags = unsafe { libc::fcntl(self.file.as_raw_fd(), libc::F_GETFL) };
        if flags == -1 {
            return Err(self.configure_error(std::io::Error::last_os_error()));
        }
        Ok(flags)
    }

    fn configure_error(&self, source: std::io::Error) -> DeviceError {
        DeviceError::Configure {
            path: self.path.clone(),
            source,
        }
    }
}

impl Read for DataChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl AsRawFd for DataChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsFd for DataChannel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl std::fmt::Debug for DataChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChannel")
            .field("path", &self.path)
            .field("fd", &self.file.as_raw_fd())
            .finish()
    }
}
