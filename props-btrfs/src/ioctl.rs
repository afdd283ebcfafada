// SPDX-License-Identifier: GPL-3.0-only

//! Fixed-layout btrfs ioctl records and request codes
//!
//! The exchange structures mirror the kernel ABI byte for byte: #[repr(C)]
//! with explicit reserved padding, so the struct sizes are part of the wire
//! contract (locked by the tests below). Field order is documented on each
//! record.

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;

/// ioctl magic shared by all btrfs requests (linux/btrfs.h)
pub const BTRFS_IOCTL_MAGIC: u64 = 0x94;

/// Filesystem label capacity, terminating NUL included (BTRFS_LABEL_SIZE).
pub const BTRFS_LABEL_SIZE: usize = 256;

/// Capacity of the device path reported by DEV_INFO.
pub const BTRFS_DEVICE_PATH_NAME_MAX: usize = 1024;

/// Selector bit: the `type_bits` field takes part in the exchange.
pub const BTRFS_DEV_PROPERTY_TYPE: u64 = 1 << 0;
/// Selector bit: the exchange is a read; without it, a write.
pub const BTRFS_DEV_PROPERTY_READ: u64 = 1 << 60;

/// The allocation-hint classes occupy the low bits of the device type mask.
pub const BTRFS_DEV_ALLOCATION_MASK_BIT_COUNT: u32 = 3;
pub const BTRFS_DEV_ALLOCATION_MASK: u64 = (1 << BTRFS_DEV_ALLOCATION_MASK_BIT_COUNT) - 1;
pub const BTRFS_DEV_ALLOCATION_PREFERRED_DATA: u64 = 0;
pub const BTRFS_DEV_ALLOCATION_PREFERRED_METADATA: u64 = 1;
pub const BTRFS_DEV_ALLOCATION_METADATA_ONLY: u64 = 2;
pub const BTRFS_DEV_ALLOCATION_DATA_ONLY: u64 = 3;

// asm-generic/ioctl.h request encoding: nr, type, size, direction.
const IOC_NRBITS: u64 = 8;
const IOC_TYPEBITS: u64 = 8;
const IOC_SIZEBITS: u64 = 14;

const IOC_NRSHIFT: u64 = 0;
const IOC_TYPESHIFT: u64 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u64 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u64 = IOC_SIZESHIFT + IOC_SIZEBITS;

const IOC_WRITE: u64 = 1;
const IOC_READ: u64 = 2;

const fn ioc(dir: u64, nr: u64, size: usize) -> libc::c_ulong {
    ((dir << IOC_DIRSHIFT)
        | (BTRFS_IOCTL_MAGIC << IOC_TYPESHIFT)
        | ((size as u64) << IOC_SIZESHIFT)
        | (nr << IOC_NRSHIFT)) as libc::c_ulong
}

const fn ior<T>(nr: u64) -> libc::c_ulong {
    ioc(IOC_READ, nr, std::mem::size_of::<T>())
}

const fn iow<T>(nr: u64) -> libc::c_ulong {
    ioc(IOC_WRITE, nr, std::mem::size_of::<T>())
}

const fn iowr<T>(nr: u64) -> libc::c_ulong {
    ioc(IOC_READ | IOC_WRITE, nr, std::mem::size_of::<T>())
}

/// Exchange buffer of the FSLABEL request pair.
pub type LabelBuf = [u8; BTRFS_LABEL_SIZE];

/// BTRFS_IOC_FS_INFO = _IOR(0x94, 31, struct btrfs_ioctl_fs_info_args)
pub const BTRFS_IOC_FS_INFO: libc::c_ulong = ior::<FsInfoArgs>(31);
/// BTRFS_IOC_DEV_INFO = _IOWR(0x94, 30, struct btrfs_ioctl_dev_info_args)
pub const BTRFS_IOC_DEV_INFO: libc::c_ulong = iowr::<DevInfoArgs>(30);
/// BTRFS_IOC_GET_FSLABEL = _IOR(0x94, 49, char[BTRFS_LABEL_SIZE])
pub const BTRFS_IOC_GET_FSLABEL: libc::c_ulong = ior::<LabelBuf>(49);
/// BTRFS_IOC_SET_FSLABEL = _IOW(0x94, 50, char[BTRFS_LABEL_SIZE])
pub const BTRFS_IOC_SET_FSLABEL: libc::c_ulong = iow::<LabelBuf>(50);
/// BTRFS_IOC_DEV_PROPERTIES = _IOWR(0x94, 64, struct btrfs_ioctl_dev_properties)
pub const BTRFS_IOC_DEV_PROPERTIES: libc::c_ulong = iowr::<DevProperties>(64);

/// Filesystem-wide info (struct btrfs_ioctl_fs_info_args, 1024 bytes).
///
/// Field order: max_id, num_devices, fsid, nodesize, sectorsize,
/// clone_alignment, csum_type, csum_size, flags, generation, metadata_uuid,
/// reserved padding. All fields are kernel-filled on return.
#[repr(C)]
pub struct FsInfoArgs {
    /// Highest device id the filesystem has assigned.
    pub max_id: u64,
    pub num_devices: u64,
    pub fsid: [u8; 16],
    pub nodesize: u32,
    pub sectorsize: u32,
    pub clone_alignment: u32,
    pub csum_type: u16,
    pub csum_size: u16,
    pub flags: u64,
    pub generation: u64,
    pub metadata_uuid: [u8; 16],
    pub reserved: [u8; 944],
}

impl FsInfoArgs {
    /// A zeroed request is the documented starting state for this exchange.
    pub fn zeroed() -> Self {
        // SAFETY: every field of this POD record is valid when all-zero.
        unsafe { std::mem::zeroed() }
    }
}

/// Per-device info (struct btrfs_ioctl_dev_info_args, 4096 bytes).
///
/// Field order: devid (in), uuid, bytes_used, total_bytes, unused padding,
/// path. The caller sets devid; the kernel fills the rest.
#[repr(C)]
pub struct DevInfoArgs {
    pub devid: u64,
    pub uuid: [u8; 16],
    pub bytes_used: u64,
    pub total_bytes: u64,
    pub unused: [u64; 379],
    pub path: [u8; BTRFS_DEVICE_PATH_NAME_MAX],
}

impl DevInfoArgs {
    pub fn zeroed() -> Self {
        // SAFETY: every field of this POD record is valid when all-zero.
        unsafe { std::mem::zeroed() }
    }

    /// Device path as reported by the kernel, or None when the slot refers
    /// to a missing device and carries no path.
    pub fn path_str(&self) -> Option<&str> {
        let end = self
            .path
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(self.path.len());
        if end == 0 {
            return None;
        }
        std::str::from_utf8(&self.path[..end]).ok()
    }
}

/// Device property exchange (struct btrfs_ioctl_dev_properties, 1024 bytes).
///
/// Field order: devid, properties, type_bits, reserved padding. `properties`
/// is the selector bitmask choosing which fields the kernel reads or writes;
/// a write request must select TYPE alone so other stored fields keep their
/// values.
#[repr(C)]
pub struct DevProperties {
    pub devid: u64,
    pub properties: u64,
    pub type_bits: u64,
    pub reserved: [u8; 1000],
}

impl DevProperties {
    pub fn zeroed() -> Self {
        // SAFETY: every field of this POD record is valid when all-zero.
        unsafe { std::mem::zeroed() }
    }
}

/// Issue `request` against `file`, exchanging `argp` with the kernel.
pub fn ioctl<T>(file: &File, request: libc::c_ulong, argp: &mut T) -> io::Result<()> {
    let ret = unsafe { libc::ioctl(file.as_raw_fd(), request, argp as *mut T) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_records_match_kernel_sizes() {
        assert_eq!(std::mem::size_of::<FsInfoArgs>(), 1024);
        assert_eq!(std::mem::size_of::<DevInfoArgs>(), 4096);
        assert_eq!(std::mem::size_of::<DevProperties>(), 1024);
        assert_eq!(std::mem::size_of::<LabelBuf>(), BTRFS_LABEL_SIZE);
    }

    #[test]
    fn request_codes_match_the_c_macro_encoding() {
        assert_eq!(BTRFS_IOC_FS_INFO, 0x8400_941f);
        assert_eq!(BTRFS_IOC_DEV_INFO, 0xd000_941e);
        assert_eq!(BTRFS_IOC_GET_FSLABEL, 0x8100_9431);
        assert_eq!(BTRFS_IOC_SET_FSLABEL, 0x4100_9432);
        assert_eq!(BTRFS_IOC_DEV_PROPERTIES, 0xc400_9440);
    }

    #[test]
    fn dev_info_path_is_nul_terminated_text() {
        let mut info = DevInfoArgs::zeroed();
        info.path[..8].copy_from_slice(b"/dev/sda");
        assert_eq!(info.path_str(), Some("/dev/sda"));

        let empty = DevInfoArgs::zeroed();
        assert_eq!(empty.path_str(), None);
    }

    #[test]
    fn allocation_mask_covers_exactly_the_four_classes() {
        for class in [
            BTRFS_DEV_ALLOCATION_PREFERRED_DATA,
            BTRFS_DEV_ALLOCATION_PREFERRED_METADATA,
            BTRFS_DEV_ALLOCATION_METADATA_ONLY,
            BTRFS_DEV_ALLOCATION_DATA_ONLY,
        ] {
            assert_eq!(class & !BTRFS_DEV_ALLOCATION_MASK, 0);
        }
    }
}
