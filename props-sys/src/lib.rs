// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system helpers for btrfs property operations
//!
//! This crate provides the direct-syscall collaborators the property layer
//! builds on:
//! - mount-point lookup for a block device via /proc/self/mountinfo
//! - opening an arbitrary path as file, directory, or device node
//!
//! Nothing here knows about property names or ioctl layouts; that lives in
//! props-btrfs.

pub mod error;
pub mod mounts;
pub mod object;

pub use error::{Result, SysError};
pub use mounts::{btrfs_mount_for_device, parse_btrfs_mounts, same_device, BtrfsMount};
pub use object::{open_directory, open_object, Access};
