// SPDX-License-Identifier: GPL-3.0-only

//! Device resolver: maps a device path to the internal device id and mount
//! point of the live filesystem it belongs to.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use props_sys::{mounts, object};
use tracing::debug;

use crate::error::{PropError, Result};
use crate::ioctl::{self, BTRFS_IOC_DEV_INFO, BTRFS_IOC_FS_INFO, DevInfoArgs, FsInfoArgs};

/// A device path resolved against a live mounted filesystem. Computed per
/// call, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceResolution {
    pub devid: u64,
    pub mount_point: PathBuf,
}

/// Outcome of one per-device info query during the scan.
enum DeviceSlot {
    /// Id never assigned, device detached, or no resolvable path.
    Missing,
    /// Live device: its id and the kernel device number of its node.
    Present { devid: u64, rdev: u64 },
}

/// Map `device` to the device id of the filesystem it belongs to.
///
/// Enumerates every id the filesystem has ever assigned (0..=max_id),
/// skipping slots of detached or missing devices, and compares kernel device
/// numbers with the input path's. The first match is returned immediately;
/// device numbers are unique per filesystem, so no later id can also match.
pub fn resolve(device: &Path) -> Result<DeviceResolution> {
    let mount_point = mounts::btrfs_mount_for_device(device)?;
    let dir = object::open_directory(&mount_point)?;

    let target = fs::metadata(device)
        .map_err(|e| PropError::Backend(format!("cannot stat '{}': {}", device.display(), e)))?
        .rdev();

    let mut fs_info = FsInfoArgs::zeroed();
    ioctl::ioctl(&dir, BTRFS_IOC_FS_INFO, &mut fs_info).map_err(|e| {
        if e.raw_os_error() == Some(libc::EPERM) {
            PropError::PermissionDenied(format!(
                "filesystem info query on {}: {}",
                mount_point.display(),
                e
            ))
        } else {
            PropError::Backend(format!(
                "cannot get filesystem info for {}: {}",
                mount_point.display(),
                e
            ))
        }
    })?;
    debug!(max_id = fs_info.max_id, num_devices = fs_info.num_devices, "scanning devices");

    let devid = scan_devices(target, fs_info.max_id, &mut |devid| {
        query_device(&dir, devid)
    })?;

    match devid {
        Some(devid) => Ok(DeviceResolution { devid, mount_point }),
        None => Err(PropError::DeviceNotFound(device.display().to_string())),
    }
}

/// Walk candidate ids from 0 to `max_id` inclusive and return the first one
/// whose device number matches `target`. The query callback isolates the
/// ioctl traffic so the scan order and match rule are testable on their own.
fn scan_devices(
    target: u64,
    max_id: u64,
    query: &mut dyn FnMut(u64) -> Result<DeviceSlot>,
) -> Result<Option<u64>> {
    for id in 0..=max_id {
        match query(id)? {
            DeviceSlot::Missing => continue,
            DeviceSlot::Present { devid, rdev } => {
                if mounts::same_device(rdev, target) {
                    return Ok(Some(devid));
                }
            }
        }
    }
    Ok(None)
}

/// One DEV_INFO exchange plus the stat of the reported path.
fn query_device(dir: &fs::File, devid: u64) -> Result<DeviceSlot> {
    let mut dev_info = DevInfoArgs::zeroed();
    dev_info.devid = devid;
    if let Err(e) = ioctl::ioctl(dir, BTRFS_IOC_DEV_INFO, &mut dev_info) {
        // Ids of detached devices report ENODEV; any other failure aborts
        // the scan.
        if e.raw_os_error() == Some(libc::ENODEV) {
            return Ok(DeviceSlot::Missing);
        }
        return Err(PropError::Backend(format!(
            "cannot get info about device devid={devid}: {e}"
        )));
    }

    let Some(path) = dev_info.path_str() else {
        debug!(devid, "device slot has no path, skipping");
        return Ok(DeviceSlot::Missing);
    };

    let metadata = fs::metadata(path)
        .map_err(|e| PropError::Backend(format!("cannot stat '{path}': {e}")))?;
    Ok(DeviceSlot::Present {
        devid: dev_info.devid,
        rdev: metadata.rdev(),
    })
}
