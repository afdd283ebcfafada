// SPDX-License-Identifier: GPL-3.0-only

//! Property get/set interface over btrfs filesystem objects
//!
//! One get/set contract covers four kinds of objects (subvolumes, whole
//! devices, the filesystem root, individual inodes) whose properties live in
//! different backing stores: the btrfsutil management library, raw extended
//! attributes, and binary ioctl exchanges. The registry reconciles those
//! behind [`PropertyDescriptor`] lookups and enforces per-property
//! applicability and value validation; the device resolver maps an arbitrary
//! device path to the device id and mount point of its live filesystem.

pub mod error;
pub mod ioctl;
pub mod properties;
pub mod registry;
pub mod resolver;

// Re-export commonly used types
pub use error::{PropError, Result};
pub use registry::{
    ObjectType, PROPERTIES, PropertyDescriptor, PropertyHandler, applicable_to, lookup,
};
pub use resolver::{DeviceResolution, resolve};
