// SPDX-License-Identifier: GPL-3.0-only

//! The property registry: one static descriptor per property name, each
//! carrying its applicability set and a handler for its backing store.

use std::fmt;
use std::path::Path;

use enumflags2::{BitFlags, bitflags, make_bitflags};

use crate::error::{PropError, Result};
use crate::properties::{allocation, compression, label, readonly};

/// Kinds of filesystem objects a property can attach to.
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Subvolume = 1 << 0,
    Device = 1 << 1,
    Root = 1 << 2,
    Inode = 1 << 3,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::Subvolume => "subvolume",
            ObjectType::Device => "device",
            ObjectType::Root => "root",
            ObjectType::Inode => "inode",
        };
        f.write_str(name)
    }
}

/// Backing-store strategy for one property.
///
/// `name` is the registry name of the property being handled; the xattr
/// backed handler derives its attribute name from it.
pub trait PropertyHandler: Sync {
    /// Read the current value. `Ok(None)` means the property is unset on
    /// this object, which is not an error and produces no output.
    fn get(&self, object: &Path, name: &str) -> Result<Option<String>>;

    /// Write a new value.
    fn set(&self, object: &Path, name: &str, value: &str) -> Result<()>;
}

/// One entry of the static property table.
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// True for properties that can only ever be read.
    pub read_only: bool,
    pub types: BitFlags<ObjectType>,
    pub handler: &'static dyn PropertyHandler,
}

/// The property table. Names are unique and every entry names at least one
/// applicable object type; built once, never mutated.
pub static PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor {
        name: "ro",
        description: "read-only status of a subvolume",
        read_only: false,
        types: make_bitflags!(ObjectType::{Subvolume}),
        handler: &readonly::ReadOnly,
    },
    PropertyDescriptor {
        name: "label",
        description: "label of the filesystem",
        read_only: false,
        types: make_bitflags!(ObjectType::{Device | Root}),
        handler: &label::Label,
    },
    PropertyDescriptor {
        name: "compression",
        description: "compression algorithm for the file or directory",
        read_only: false,
        types: make_bitflags!(ObjectType::{Inode}),
        handler: &compression::Compression,
    },
    PropertyDescriptor {
        name: "allocation_hint",
        description: "hint to store the data/metadata chunks",
        read_only: false,
        types: make_bitflags!(ObjectType::{Device}),
        handler: &allocation::AllocationHint,
    },
];

/// Look a property up by name.
pub fn lookup(name: &str) -> Option<&'static PropertyDescriptor> {
    PROPERTIES.iter().find(|descriptor| descriptor.name == name)
}

/// Descriptors applicable to one object type, in table order.
pub fn applicable_to(
    object_type: ObjectType,
) -> impl Iterator<Item = &'static PropertyDescriptor> {
    PROPERTIES
        .iter()
        .filter(move |descriptor| descriptor.types.contains(object_type))
}

impl PropertyDescriptor {
    fn check_applicable(&self, object_type: ObjectType) -> Result<()> {
        if !self.types.contains(object_type) {
            return Err(PropError::NotApplicable {
                property: self.name.to_string(),
                object_type,
            });
        }
        Ok(())
    }

    /// Read the property from `object`, declared to be of `object_type`.
    /// `Ok(None)` means unset.
    pub fn get(&self, object_type: ObjectType, object: &Path) -> Result<Option<String>> {
        self.check_applicable(object_type)?;
        self.handler.get(object, self.name)
    }

    /// Write `value` to the property on `object`.
    pub fn set(&self, object_type: ObjectType, object: &Path, value: &str) -> Result<()> {
        self.check_applicable(object_type)?;
        if self.read_only {
            return Err(PropError::ReadOnlyProperty {
                property: self.name.to_string(),
            });
        }
        self.handler.set(object, self.name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stands in for a backing store that must never be reached.
    struct Unreachable;

    impl PropertyHandler for Unreachable {
        fn get(&self, _object: &Path, _name: &str) -> Result<Option<String>> {
            panic!("handler must not run");
        }

        fn set(&self, _object: &Path, _name: &str, _value: &str) -> Result<()> {
            panic!("handler must not run");
        }
    }

    struct Fixed;

    impl PropertyHandler for Fixed {
        fn get(&self, _object: &Path, _name: &str) -> Result<Option<String>> {
            Ok(Some("fixed".to_string()))
        }

        fn set(&self, _object: &Path, _name: &str, _value: &str) -> Result<()> {
            Ok(())
        }
    }

    fn descriptor(read_only: bool, handler: &'static dyn PropertyHandler) -> PropertyDescriptor {
        PropertyDescriptor {
            name: "test",
            description: "test property",
            read_only,
            types: make_bitflags!(ObjectType::{Subvolume}),
            handler,
        }
    }

    #[test]
    fn registry_names_are_unique_and_types_non_empty() {
        for (index, entry) in PROPERTIES.iter().enumerate() {
            assert!(!entry.types.is_empty(), "{} has no applicable types", entry.name);
            assert!(
                PROPERTIES[..index].iter().all(|other| other.name != entry.name),
                "duplicate name {}",
                entry.name
            );
        }
    }

    #[test]
    fn table_matches_the_external_contract() {
        assert_eq!(
            lookup("ro").unwrap().types,
            make_bitflags!(ObjectType::{Subvolume})
        );
        assert_eq!(
            lookup("label").unwrap().types,
            make_bitflags!(ObjectType::{Device | Root})
        );
        assert_eq!(
            lookup("compression").unwrap().types,
            make_bitflags!(ObjectType::{Inode})
        );
        assert_eq!(
            lookup("allocation_hint").unwrap().types,
            make_bitflags!(ObjectType::{Device})
        );
        assert!(lookup("nonexistent").is_none());
    }

    #[test]
    fn applicability_filters_by_type() {
        let device_props: Vec<&str> = applicable_to(ObjectType::Device)
            .map(|descriptor| descriptor.name)
            .collect();
        assert_eq!(device_props, vec!["label", "allocation_hint"]);

        let inode_props: Vec<&str> = applicable_to(ObjectType::Inode)
            .map(|descriptor| descriptor.name)
            .collect();
        assert_eq!(inode_props, vec!["compression"]);
    }

    #[test]
    fn inapplicable_type_is_rejected_before_the_handler_runs() {
        let descriptor = descriptor(false, &Unreachable);

        let err = descriptor
            .get(ObjectType::Inode, Path::new("/x"))
            .unwrap_err();
        assert!(matches!(err, PropError::NotApplicable { .. }));

        let err = descriptor
            .set(ObjectType::Device, Path::new("/x"), "v")
            .unwrap_err();
        assert!(matches!(err, PropError::NotApplicable { .. }));
    }

    #[test]
    fn read_only_properties_reject_set_before_the_handler_runs() {
        let descriptor = descriptor(true, &Unreachable);

        let err = descriptor
            .set(ObjectType::Subvolume, Path::new("/x"), "v")
            .unwrap_err();
        assert!(matches!(err, PropError::ReadOnlyProperty { .. }));
    }

    #[test]
    fn valid_requests_reach_the_handler() {
        let descriptor = descriptor(false, &Fixed);

        let value = descriptor
            .get(ObjectType::Subvolume, Path::new("/x"))
            .unwrap();
        assert_eq!(value.as_deref(), Some("fixed"));
        assert!(descriptor.set(ObjectType::Subvolume, Path::new("/x"), "v").is_ok());
    }
}
