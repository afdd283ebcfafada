// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::{CStr, CString};
use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

use props_sys::object::{self, Access};

use crate::error::{PropError, Result};
use crate::registry::PropertyHandler;

/// Xattr namespace the kernel interprets for btrfs-managed attributes. The
/// property name is appended directly, with no separator.
const XATTR_BTRFS_PREFIX: &str = "btrfs.";

/// Per-inode compression codec, stored as a btrfs-namespace xattr.
pub struct Compression;

impl PropertyHandler for Compression {
    fn get(&self, object: &Path, name: &str) -> Result<Option<String>> {
        let file = open_inode(object, Access::ReadOnly)?;
        let attr = xattr_name(name)?;

        // Probe the stored length first, then read with an exactly-sized
        // buffer. An absent attribute means "unset", not an error.
        let backend = |e: io::Error| {
            PropError::Backend(format!(
                "failed to get {} for {}: {}",
                name,
                object.display(),
                e
            ))
        };
        let Some(len) = fgetxattr(&file, &attr, &mut []).map_err(backend)? else {
            return Ok(None);
        };

        let mut buf = vec![0u8; len];
        match fgetxattr(&file, &attr, &mut buf).map_err(backend)? {
            Some(read) => {
                buf.truncate(read);
                Ok(Some(String::from_utf8_lossy(&buf).to_string()))
            }
            None => Ok(None),
        }
    }

    fn set(&self, object: &Path, name: &str, value: &str) -> Result<()> {
        let file = open_inode(object, Access::ReadWrite)?;
        let attr = xattr_name(name)?;

        // "no" and "none" clear the codec back to unset rather than storing
        // a literal word.
        let value = normalize(value);
        fsetxattr(&file, &attr, value.as_bytes()).map_err(|e| {
            PropError::Backend(format!(
                "failed to set {} for {}: {}",
                name,
                object.display(),
                e
            ))
        })
    }
}

fn open_inode(object: &Path, access: Access) -> Result<File> {
    object::open_object(object, access).map_err(|e| {
        PropError::Backend(format!("failed to open {}: {}", object.display(), e))
    })
}

fn xattr_name(name: &str) -> Result<CString> {
    CString::new(format!("{XATTR_BTRFS_PREFIX}{name}")).map_err(|_| {
        PropError::Backend(format!("property name {name:?} is not a valid xattr name"))
    })
}

/// "no" and "none" both mean "unset"; everything else is stored verbatim.
fn normalize(value: &str) -> &str {
    if value == "no" || value == "none" { "" } else { value }
}

/// fgetxattr with an empty `buf` probes the stored length. `Ok(None)` is the
/// absent-attribute case (ENODATA, spelled ENOATTR in some headers).
fn fgetxattr(file: &File, name: &CStr, buf: &mut [u8]) -> io::Result<Option<usize>> {
    let ptr = if buf.is_empty() {
        std::ptr::null_mut()
    } else {
        buf.as_mut_ptr().cast()
    };
    let ret = unsafe { libc::fgetxattr(file.as_raw_fd(), name.as_ptr(), ptr, buf.len()) };
    if ret < 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENODATA) {
            return Ok(None);
        }
        return Err(err);
    }
    Ok(Some(ret as usize))
}

/// Replaces any existing value; an empty `value` stores an empty attribute,
/// which the kernel treats as "compression unset".
fn fsetxattr(file: &File, name: &CStr, value: &[u8]) -> io::Result<()> {
    let ptr = if value.is_empty() {
        std::ptr::null()
    } else {
        value.as_ptr().cast()
    };
    let ret = unsafe { libc::fsetxattr(file.as_raw_fd(), name.as_ptr(), ptr, value.len(), 0) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{normalize, xattr_name};

    #[test]
    fn attribute_name_is_prefix_plus_property_with_no_separator() {
        let name = xattr_name("compression").unwrap();
        assert_eq!(name.to_str().unwrap(), "btrfs.compression");
    }

    #[test]
    fn no_and_none_clear_the_value() {
        assert_eq!(normalize("no"), "");
        assert_eq!(normalize("none"), "");
    }

    #[test]
    fn codec_names_pass_through_verbatim() {
        for codec in ["zstd", "lzo", "zlib", "zstd:3"] {
            assert_eq!(normalize(codec), codec);
        }
    }
}
