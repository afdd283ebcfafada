// SPDX-License-Identifier: GPL-3.0-only

use std::io;

use thiserror::Error;

/// Error types for system-level operations
#[derive(Debug, Error)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid mountinfo line: {0}")]
    InvalidMountInfoLine(String),

    #[error("no mounted btrfs filesystem found for {0}")]
    NotMounted(String),
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;
