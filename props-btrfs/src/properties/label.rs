// SPDX-License-Identifier: GPL-3.0-only

use std::fs::File;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use props_sys::object::{self, Access};

use crate::error::{PropError, Result};
use crate::ioctl::{self, BTRFS_IOC_GET_FSLABEL, BTRFS_IOC_SET_FSLABEL, BTRFS_LABEL_SIZE, LabelBuf};
use crate::registry::PropertyHandler;
use crate::resolver;

/// Filesystem label, backed by the FSLABEL ioctl pair on the mounted
/// filesystem. A device object is routed to its owning mount point first.
pub struct Label;

impl PropertyHandler for Label {
    fn get(&self, object: &Path, _name: &str) -> Result<Option<String>> {
        let file = open_labeled_fs(object)?;
        let mut label: LabelBuf = [0; BTRFS_LABEL_SIZE];
        ioctl::ioctl(&file, BTRFS_IOC_GET_FSLABEL, &mut label).map_err(|e| {
            PropError::Backend(format!("failed to get label of {}: {}", object.display(), e))
        })?;
        Ok(Some(label_text(&label)))
    }

    fn set(&self, object: &Path, name: &str, value: &str) -> Result<()> {
        // The exchange buffer is fixed; anything that cannot fit with its
        // terminating NUL would be rejected by the kernel as well.
        if value.len() >= BTRFS_LABEL_SIZE {
            return Err(PropError::InvalidValue {
                property: name.to_string(),
                value: value.to_string(),
            });
        }

        let file = open_labeled_fs(object)?;
        let mut label: LabelBuf = [0; BTRFS_LABEL_SIZE];
        label[..value.len()].copy_from_slice(value.as_bytes());
        ioctl::ioctl(&file, BTRFS_IOC_SET_FSLABEL, &mut label).map_err(|e| {
            PropError::Backend(format!("failed to set label of {}: {}", object.display(), e))
        })
    }
}

/// The label ioctls act on the mounted filesystem, so a block device node is
/// first resolved to the mount point it backs.
fn open_labeled_fs(object: &Path) -> Result<File> {
    let metadata = std::fs::metadata(object).map_err(|e| {
        PropError::Backend(format!("cannot stat '{}': {}", object.display(), e))
    })?;

    if metadata.file_type().is_block_device() {
        let resolution = resolver::resolve(object)?;
        Ok(object::open_directory(&resolution.mount_point)?)
    } else {
        object::open_object(object, Access::ReadOnly).map_err(|e| {
            PropError::Backend(format!("failed to open {}: {}", object.display(), e))
        })
    }
}

/// Label text up to the first NUL; the kernel terminates inside the buffer.
fn label_text(buf: &[u8]) -> String {
    let end = buf.iter().position(|byte| *byte == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).to_string()
}

#[cfg(test)]
mod tests {
    use super::{BTRFS_LABEL_SIZE, label_text};

    #[test]
    fn truncates_at_the_first_nul() {
        let mut buf = [0u8; BTRFS_LABEL_SIZE];
        buf[..4].copy_from_slice(b"pool");
        assert_eq!(label_text(&buf), "pool");
    }

    #[test]
    fn empty_label_reads_as_empty_text() {
        let buf = [0u8; BTRFS_LABEL_SIZE];
        assert_eq!(label_text(&buf), "");
    }

    #[test]
    fn a_full_buffer_without_nul_is_taken_whole() {
        let buf = [b'x'; 8];
        assert_eq!(label_text(&buf), "xxxxxxxx");
    }
}
