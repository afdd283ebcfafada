// SPDX-License-Identifier: GPL-3.0-only

//! One module per property, each implementing
//! [`PropertyHandler`](crate::registry::PropertyHandler) against its
//! backing store: the btrfsutil management library (ro), the FSLABEL ioctl
//! pair (label), btrfs-namespace xattrs (compression), and the device
//! properties ioctl (allocation_hint).

pub mod allocation;
pub mod compression;
pub mod label;
pub mod readonly;
