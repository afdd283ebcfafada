// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

use crate::registry::ObjectType;

/// Error types for property operations
#[derive(Debug, Error)]
pub enum PropError {
    #[error("invalid value for property {property}: '{value}'")]
    InvalidValue { property: String, value: String },

    #[error("property {property} does not apply to {object_type} objects")]
    NotApplicable {
        property: String,
        object_type: ObjectType,
    },

    #[error("property {property} is read-only")]
    ReadOnlyProperty { property: String },

    #[error("backend operation failed: {0}")]
    Backend(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no device of the filesystem matches {0}")]
    DeviceNotFound(String),

    #[error(transparent)]
    Sys(#[from] props_sys::SysError),
}

/// Result type alias for property operations
pub type Result<T> = std::result::Result<T, PropError>;
