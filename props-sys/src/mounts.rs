// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SysError};

/// One btrfs entry from /proc/self/mountinfo: where the filesystem is
/// mounted and the device it was mounted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BtrfsMount {
    pub mount_point: PathBuf,
    pub source: PathBuf,
}

/// Find the mount point of the live btrfs filesystem backed by `device`.
///
/// Matching is by kernel device number rather than path string, so symlinks
/// like /dev/disk/by-uuid/... resolve to the same filesystem as the
/// canonical device node.
pub fn btrfs_mount_for_device(device: &Path) -> Result<PathBuf> {
    let mount_info = fs::read_to_string("/proc/self/mountinfo")?;
    let mounts = parse_btrfs_mounts(&mount_info)?;

    let wanted = fs::metadata(device)?.rdev();

    for mount in mounts {
        let Ok(source_meta) = fs::metadata(&mount.source) else {
            debug!("cannot stat mount source {}", mount.source.display());
            continue;
        };
        if same_device(source_meta.rdev(), wanted) {
            return Ok(mount.mount_point);
        }
    }

    Err(SysError::NotMounted(device.display().to_string()))
}

/// Extract all btrfs entries from mountinfo text.
///
/// A multi-device filesystem reports a single source device here; the one
/// the kernel recorded at mount time.
pub fn parse_btrfs_mounts(input: &str) -> Result<Vec<BtrfsMount>> {
    let mut mounts = Vec::new();

    for line in input.lines().filter(|line| !line.trim().is_empty()) {
        let (left, right) = line
            .split_once(" - ")
            .ok_or_else(|| SysError::InvalidMountInfoLine(line.to_string()))?;

        let mount_point = left
            .split_whitespace()
            .nth(4)
            .ok_or_else(|| SysError::InvalidMountInfoLine(line.to_string()))?;

        let mut right_fields = right.split_whitespace();
        let fs_type = right_fields
            .next()
            .ok_or_else(|| SysError::InvalidMountInfoLine(line.to_string()))?;
        let source = right_fields
            .next()
            .ok_or_else(|| SysError::InvalidMountInfoLine(line.to_string()))?;

        if fs_type != "btrfs" {
            continue;
        }

        mounts.push(BtrfsMount {
            mount_point: PathBuf::from(unescape_mount_field(mount_point)),
            source: PathBuf::from(unescape_mount_field(source)),
        });
    }

    Ok(mounts)
}

/// Compare two st_rdev values by their (major, minor) pair.
pub fn same_device(a: u64, b: u64) -> bool {
    libc::major(a) == libc::major(b) && libc::minor(a) == libc::minor(b)
}

fn unescape_mount_field(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'\\'
            && index + 3 < bytes.len()
            && bytes[index + 1].is_ascii_digit()
            && bytes[index + 2].is_ascii_digit()
            && bytes[index + 3].is_ascii_digit()
        {
            let octal = &value[index + 1..index + 4];
            if let Ok(num) = u8::from_str_radix(octal, 8) {
                output.push(num as char);
                index += 4;
                continue;
            }
        }

        output.push(bytes[index] as char);
        index += 1;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::{parse_btrfs_mounts, same_device, BtrfsMount};
    use std::path::PathBuf;

    #[test]
    fn parses_mountinfo_and_keeps_btrfs_lines_only() {
        let sample = "36 25 8:2 / / rw,relatime - ext4 /dev/nvme0n1p2 rw\n\
                      37 25 0:38 /@ /mnt/pool rw,relatime shared:1 - btrfs /dev/sdb1 rw,compress=zstd\n\
                      38 25 0:5 / /proc rw,nosuid - proc proc rw\n";

        let mounts = parse_btrfs_mounts(sample).expect("parse should succeed");
        assert_eq!(
            mounts,
            vec![BtrfsMount {
                mount_point: PathBuf::from("/mnt/pool"),
                source: PathBuf::from("/dev/sdb1"),
            }]
        );
    }

    #[test]
    fn unescapes_octal_sequences_in_mount_fields() {
        let sample = "40 25 0:40 / /mnt/with\\040space rw - btrfs /dev/sdc1 rw\n";

        let mounts = parse_btrfs_mounts(sample).expect("parse should succeed");
        assert_eq!(mounts[0].mount_point, PathBuf::from("/mnt/with space"));
    }

    #[test]
    fn rejects_lines_without_separator() {
        assert!(parse_btrfs_mounts("garbage without the separator\n").is_err());
    }

    #[test]
    fn device_numbers_compare_by_major_minor() {
        let a = libc::makedev(8, 1);
        let b = libc::makedev(8, 1);
        let c = libc::makedev(8, 2);
        assert!(same_device(a, b));
        assert!(!same_device(a, c));
    }
}
