// SPDX-License-Identifier: GPL-3.0-only

use std::fs::File;
use std::path::Path;

use props_sys::object;
use tracing::debug;

use crate::error::{PropError, Result};
use crate::ioctl::{
    self, BTRFS_DEV_ALLOCATION_DATA_ONLY, BTRFS_DEV_ALLOCATION_MASK,
    BTRFS_DEV_ALLOCATION_METADATA_ONLY, BTRFS_DEV_ALLOCATION_PREFERRED_DATA,
    BTRFS_DEV_ALLOCATION_PREFERRED_METADATA, BTRFS_DEV_PROPERTY_READ, BTRFS_DEV_PROPERTY_TYPE,
    BTRFS_IOC_DEV_PROPERTIES, DevProperties,
};
use crate::registry::PropertyHandler;
use crate::resolver::{self, DeviceResolution};

/// Named allocation classes, in lookup order. The first matching entry wins;
/// stored values matching no entry render as the raw number.
const ALLOCATION_CLASSES: &[(u64, &str)] = &[
    (BTRFS_DEV_ALLOCATION_PREFERRED_METADATA, "PREFERRED_METADATA"),
    (BTRFS_DEV_ALLOCATION_METADATA_ONLY, "METADATA_ONLY"),
    (BTRFS_DEV_ALLOCATION_PREFERRED_DATA, "PREFERRED_DATA"),
    (BTRFS_DEV_ALLOCATION_DATA_ONLY, "DATA_ONLY"),
];

/// Per-device allocation preference, stored in the low bits of the device
/// type mask and exchanged over the device-properties ioctl.
pub struct AllocationHint;

impl PropertyHandler for AllocationHint {
    fn get(&self, object: &Path, _name: &str) -> Result<Option<String>> {
        let (resolution, props, _file) = read_device_properties(object)?;
        debug!(
            devid = resolution.devid,
            type_bits = props.type_bits,
            "device properties read"
        );
        Ok(Some(describe(props.type_bits & BTRFS_DEV_ALLOCATION_MASK)))
    }

    fn set(&self, object: &Path, name: &str, value: &str) -> Result<()> {
        // Validate before touching the device; an invalid value must not
        // cause any exchange at all.
        let Some(class) = parse_class(value) else {
            return Err(PropError::InvalidValue {
                property: name.to_string(),
                value: value.to_string(),
            });
        };

        let (resolution, mut props, file) = read_device_properties(object)?;
        props.type_bits = merge_allocation_bits(props.type_bits, class);

        // Write back with only the type field selected so the other stored
        // fields keep their current values.
        props.devid = resolution.devid;
        props.properties = BTRFS_DEV_PROPERTY_TYPE;
        ioctl::ioctl(&file, BTRFS_IOC_DEV_PROPERTIES, &mut props).map_err(|e| {
            PropError::Backend(format!(
                "failed to write device properties of {}: {}",
                object.display(),
                e
            ))
        })
    }
}

/// Resolve the device, open its mount point, and read the type field of its
/// property record. The handle is returned so a set can write through it.
fn read_device_properties(object: &Path) -> Result<(DeviceResolution, DevProperties, File)> {
    let resolution = resolver::resolve(object)?;
    let file = object::open_directory(&resolution.mount_point)?;

    let mut props = DevProperties::zeroed();
    props.devid = resolution.devid;
    props.properties = BTRFS_DEV_PROPERTY_TYPE | BTRFS_DEV_PROPERTY_READ;
    ioctl::ioctl(&file, BTRFS_IOC_DEV_PROPERTIES, &mut props).map_err(|e| {
        PropError::Backend(format!(
            "failed to read device properties of {}: {}",
            object.display(),
            e
        ))
    })?;

    Ok((resolution, props, file))
}

/// Render a stored allocation value: class name when it matches, raw number
/// otherwise.
fn describe(bits: u64) -> String {
    for (value, name) in ALLOCATION_CLASSES {
        if bits == *value {
            return (*name).to_string();
        }
    }
    bits.to_string()
}

/// Accept a class name (exact case) or a raw integer with no bits outside
/// the allocation sub-mask.
fn parse_class(value: &str) -> Option<u64> {
    for (bits, name) in ALLOCATION_CLASSES {
        if value == *name {
            return Some(*bits);
        }
    }

    let raw: u64 = value.parse().ok()?;
    if raw & !BTRFS_DEV_ALLOCATION_MASK != 0 {
        return None;
    }
    Some(raw)
}

/// Replace only the allocation sub-mask, leaving every other bit of the
/// stored type mask untouched.
fn merge_allocation_bits(current: u64, class: u64) -> u64 {
    (current & !BTRFS_DEV_ALLOCATION_MASK) | (class & BTRFS_DEV_ALLOCATION_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_round_trip_through_parse_merge_describe() {
        for (_, name) in ALLOCATION_CLASSES {
            let class = parse_class(name).expect("class name must parse");
            let stored = merge_allocation_bits(0xff00, class);
            assert_eq!(describe(stored & BTRFS_DEV_ALLOCATION_MASK), *name);
        }
    }

    #[test]
    fn raw_in_mask_integers_are_accepted() {
        assert_eq!(parse_class("0"), Some(0));
        assert_eq!(parse_class("3"), Some(3));
    }

    #[test]
    fn out_of_mask_integers_are_rejected() {
        assert_eq!(parse_class("8"), None);
        assert_eq!(parse_class("18446744073709551615"), None);
    }

    #[test]
    fn negative_and_symbolic_garbage_is_rejected() {
        assert_eq!(parse_class("-1"), None);
        assert_eq!(parse_class("preferred_metadata"), None);
        assert_eq!(parse_class("METADATA"), None);
        assert_eq!(parse_class(""), None);
    }

    #[test]
    fn merge_preserves_bits_outside_the_sub_mask() {
        let stored = 0xdead_beef_0000_0005;
        let merged = merge_allocation_bits(stored, BTRFS_DEV_ALLOCATION_METADATA_ONLY);
        assert_eq!(merged & !BTRFS_DEV_ALLOCATION_MASK, stored & !BTRFS_DEV_ALLOCATION_MASK);
        assert_eq!(merged & BTRFS_DEV_ALLOCATION_MASK, BTRFS_DEV_ALLOCATION_METADATA_ONLY);
    }

    #[test]
    fn unknown_stored_patterns_render_as_raw_numbers() {
        assert_eq!(describe(7), "7");
        assert_eq!(describe(BTRFS_DEV_ALLOCATION_PREFERRED_DATA), "PREFERRED_DATA");
    }
}
