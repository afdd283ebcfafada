// SPDX-License-Identifier: GPL-3.0-only

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::error::Result;

/// Requested access for [`open_object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Open `path` as whatever it is: regular file, directory, or device node.
///
/// Directories get O_DIRECTORY and are always opened read-only at the
/// descriptor level; ioctls and xattr calls work on such descriptors
/// regardless. The returned File closes the descriptor when dropped.
pub fn open_object(path: &Path, access: Access) -> Result<File> {
    let metadata = std::fs::metadata(path)?;
    if metadata.is_dir() {
        return open_directory(path);
    }

    let mut options = OpenOptions::new();
    match access {
        Access::ReadOnly => options.read(true),
        Access::ReadWrite => options.read(true).write(true),
    };
    Ok(options.open(path)?)
}

/// Open a directory handle, e.g. a mount point for filesystem-level ioctls.
pub fn open_directory(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).custom_flags(libc::O_DIRECTORY);
    Ok(options.open(path)?)
}

#[cfg(test)]
mod tests {
    use super::{open_directory, open_object, Access};

    #[test]
    fn opens_directories_for_reading() {
        assert!(open_directory(std::path::Path::new("/tmp")).is_ok());
        assert!(open_object(std::path::Path::new("/tmp"), Access::ReadWrite).is_ok());
    }

    #[test]
    fn refuses_directory_open_on_a_file() {
        assert!(open_directory(std::path::Path::new("/proc/self/cmdline")).is_err());
    }

    #[test]
    fn missing_paths_report_the_os_error() {
        assert!(open_object(std::path::Path::new("/no/such/object"), Access::ReadOnly).is_err());
    }
}
