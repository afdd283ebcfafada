// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use btrfsutil::subvolume::Subvolume;

use crate::error::{PropError, Result};
use crate::registry::PropertyHandler;

/// Subvolume read-only flag, backed by the btrfsutil management library.
pub struct ReadOnly;

impl PropertyHandler for ReadOnly {
    fn get(&self, object: &Path, _name: &str) -> Result<Option<String>> {
        let subvol = open_subvolume(object)?;
        let read_only = subvol.is_ro().map_err(|e| {
            PropError::Backend(format!(
                "failed to get read-only flag of {}: {}",
                object.display(),
                e
            ))
        })?;
        Ok(Some(read_only.to_string()))
    }

    fn set(&self, object: &Path, name: &str, value: &str) -> Result<()> {
        let Some(read_only) = parse_flag(value) else {
            return Err(PropError::InvalidValue {
                property: name.to_string(),
                value: value.to_string(),
            });
        };

        let subvol = open_subvolume(object)?;
        subvol.set_ro(read_only).map_err(|e| {
            PropError::Backend(format!(
                "failed to set read-only={} on {}: {}",
                read_only,
                object.display(),
                e
            ))
        })
    }
}

/// Only the literal words are valid; anything else is an invalid value.
fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn open_subvolume(object: &Path) -> Result<Subvolume> {
    Subvolume::try_from(object).map_err(|e| {
        PropError::Backend(format!(
            "failed to open subvolume {}: {}",
            object.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn accepts_exactly_the_two_literals() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
    }

    #[test]
    fn rejects_everything_else() {
        for value in ["True", "FALSE", "1", "0", "yes", ""] {
            assert_eq!(parse_flag(value), None, "{value:?} must be rejected");
        }
    }
}
