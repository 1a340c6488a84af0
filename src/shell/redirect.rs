//! Input/output redirection for child processes.
//!
//! Every redirection follows the same two steps: save a duplicate of the
//! standard stream slot, then overlay the new descriptor onto the slot. The
//! returned [`Redirection`] remembers both so [`restore`] can put the slot
//! back. If either step fails the slot is left exactly as it was.

use std::fs::OpenOptions;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::fcntl::{fcntl, FcntlArg};
use nix::unistd::{close, dup2};
use tracing::{debug, warn};

use super::command::{OutputMode, OutputTarget};
use crate::error::RedirectError;

/// Owner read/write, like the files the shell creates for `>` and `>>`.
const OUTPUT_FILE_MODE: u32 = 0o600;

/// Saved duplicates are moved above the standard slots.
const SAVED_FD_FLOOR: RawFd = 10;

/// A standard stream slot that can be redirected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StdSlot {
    Input,
    Output,
}

impl StdSlot {
    pub fn fd(self) -> RawFd {
        match self {
            StdSlot::Input => libc::STDIN_FILENO,
            StdSlot::Output => libc::STDOUT_FILENO,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StdSlot::Input => "stdin",
            StdSlot::Output => "stdout",
        }
    }
}

/// An applied redirection, consumed by [`restore`].
#[must_use = "a redirection must be restored or outlived by exec"]
#[derive(Debug)]
pub struct Redirection {
    slot: StdSlot,
    saved: OwnedFd,
    opened: RawFd,
}

impl Redirection {
    pub fn slot(&self) -> StdSlot {
        self.slot
    }

    /// Descriptor of the file or pipe end now sitting behind the slot.
    pub fn opened_fd(&self) -> RawFd {
        self.opened
    }
}

/// Reads standard input from `path`.
pub fn redirect_input(path: &Path) -> Result<Redirection, RedirectError> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|source| RedirectError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Opened {} for input redirection", path.display());
    redirect_fd(file.into(), StdSlot::Input)
}

/// Writes standard output to `path`, truncating it first.
pub fn redirect_output_overwrite(path: &Path) -> Result<Redirection, RedirectError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(OUTPUT_FILE_MODE)
        .open(path)
        .map_err(|source| RedirectError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Opened {} for output redirection (overwrite)", path.display());
    redirect_fd(file.into(), StdSlot::Output)
}

/// Appends standard output to `path`.
pub fn redirect_output_append(path: &Path) -> Result<Redirection, RedirectError> {
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .mode(OUTPUT_FILE_MODE)
        .open(path)
        .map_err(|source| RedirectError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Opened {} for output redirection (append)", path.display());
    redirect_fd(file.into(), StdSlot::Output)
}

pub fn redirect_output(target: &OutputTarget) -> Result<Redirection, RedirectError> {
    match target.mode {
        OutputMode::Overwrite => redirect_output_overwrite(&target.path),
        OutputMode::Append => redirect_output_append(&target.path),
    }
}

/// Overlays an already open descriptor (e.g. a pipe end) onto `slot`.
///
/// Takes ownership of `fd`; on failure it is closed.
pub fn redirect_fd(fd: OwnedFd, slot: StdSlot) -> Result<Redirection, RedirectError> {
    // Saved copy is close-on-exec so the program never inherits it.
    let saved = match fcntl(slot.fd(), FcntlArg::F_DUPFD_CLOEXEC(SAVED_FD_FLOOR)) {
        // SAFETY: F_DUPFD_CLOEXEC returned a fresh descriptor nobody else owns.
        Ok(raw) => unsafe { OwnedFd::from_raw_fd(raw) },
        Err(source) => {
            return Err(RedirectError::Save {
                slot: slot.name(),
                source,
            });
        }
    };

    if let Err(source) = dup2(fd.as_raw_fd(), slot.fd()) {
        return Err(RedirectError::Overlay {
            slot: slot.name(),
            source,
        });
    }

    Ok(Redirection {
        slot,
        saved,
        opened: fd.into_raw_fd(),
    })
}

/// Puts the saved descriptor back onto its slot and closes the extras.
///
/// Best effort: failures are logged and never reported to the caller.
pub fn restore(redirection: Redirection) {
    let Redirection {
        slot,
        saved,
        opened,
    } = redirection;

    if let Err(e) = dup2(saved.as_raw_fd(), slot.fd()) {
        warn!("Could not restore {} file descriptor: {}", slot.name(), e);
    }
    drop(saved);

    // Descriptors 0..=2 are standard streams, never ours to close.
    if opened > libc::STDERR_FILENO {
        if let Err(e) = close(opened) {
            warn!("Could not close descriptor {} after restoring {}: {}", opened, slot.name(), e);
        }
    }
    debug!("Restored {}", slot.name());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use std::os::unix::fs::PermissionsExt;

    use nix::sys::stat::fstat;
    use nix::unistd::{read, write};

    use crate::shell::serial;

    fn identity(fd: RawFd) -> (u64, u64) {
        let st = fstat(fd).unwrap();
        (st.st_dev as u64, st.st_ino as u64)
    }

    #[test]
    fn test_missing_input_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = redirect_input(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, RedirectError::Open { .. }));
        assert!(err.to_string().contains("Could not open file"));
    }

    #[test]
    fn test_input_redirect_then_restore_round_trip() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        std::fs::File::create(&path).unwrap().write_all(b"hello\n").unwrap();

        let before = identity(libc::STDIN_FILENO);

        let redirection = redirect_input(&path).unwrap();
        assert_eq!(redirection.slot(), StdSlot::Input);
        assert!(redirection.opened_fd() > libc::STDERR_FILENO);

        let mut buf = [0u8; 16];
        let n = read(libc::STDIN_FILENO, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello\n");
        assert_ne!(identity(libc::STDIN_FILENO), before);

        restore(redirection);
        assert_eq!(identity(libc::STDIN_FILENO), before);
    }

    #[test]
    fn test_failed_open_leaves_slot_untouched() {
        let _guard = serial();
        let before = identity(libc::STDIN_FILENO);
        assert!(redirect_input(Path::new("/definitely/not/here")).is_err());
        assert_eq!(identity(libc::STDIN_FILENO), before);
    }

    #[test]
    fn test_output_redirect_then_restore_round_trip() {
        let _guard = serial();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let before = identity(libc::STDOUT_FILENO);

        let redirection = redirect_output_overwrite(&path).unwrap();
        assert_eq!(redirection.slot(), StdSlot::Output);
        write(std::io::stdout(), b"captured\n").unwrap();
        restore(redirection);

        assert_eq!(identity(libc::STDOUT_FILENO), before);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "captured\n");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, OUTPUT_FILE_MODE);
    }

    #[test]
    fn test_restore_keeps_standard_descriptor_open() {
        let _guard = serial();
        let before = identity(libc::STDOUT_FILENO);

        // SAFETY: restore never closes descriptors 0..=2, so fd 2 stays open.
        let stderr = unsafe { OwnedFd::from_raw_fd(libc::STDERR_FILENO) };
        let redirection = redirect_fd(stderr, StdSlot::Output).unwrap();
        assert_eq!(redirection.opened_fd(), libc::STDERR_FILENO);
        assert_eq!(identity(libc::STDOUT_FILENO), identity(libc::STDERR_FILENO));

        restore(redirection);
        assert_eq!(identity(libc::STDOUT_FILENO), before);
        assert!(fcntl(libc::STDERR_FILENO, FcntlArg::F_GETFD).is_ok());
    }
}
