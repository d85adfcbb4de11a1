//! Profile store - read-only access to operator-provisioned overrides.
//!
//! A profile is a directory holding one raw blob per descriptor
//! (`cpuinfo`, `dmi_sys_vendor`, `dmi_product_name`, `dmi_product_uuid`).
//! It is owned by the operator; nothing here ever writes to it.

use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use crate::descriptor::Descriptor;
use crate::error::ProfileError;

/// Fixed location of the active profile
pub const PROFILE_ROOT: &str = "/etc/hwshim/profiles/active";

#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at [`PROFILE_ROOT`]
    pub fn system() -> Self {
        Self::new(PROFILE_ROOT)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, descriptor: Descriptor) -> PathBuf {
        self.root.join(descriptor.profile_file())
    }

    /// Read the override for `descriptor`, at most `descriptor.bound()` bytes.
    ///
    /// A missing file (or missing profile root) is `NotFound`; anything else
    /// that prevents reading, including a non-regular file, is `IoFault`.
    pub fn load(&self, descriptor: Descriptor) -> Result<Vec<u8>, ProfileError> {
        let path = self.path_for(descriptor);
        let fault = |source: io::Error, path: &Path| ProfileError::IoFault {
            descriptor,
            path: path.to_path_buf(),
            source,
        };

        let not_regular =
            || io::Error::new(io::ErrorKind::InvalidInput, "not a regular file");

        // A FIFO or device node would block in open(), so reject it first
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(fault(not_regular(), &path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ProfileError::NotFound { descriptor, path });
            }
            Err(e) => return Err(fault(e, &path)),
        }

        // The entry may be swapped between the check and the open
        let file = match OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ProfileError::NotFound { descriptor, path });
            }
            Err(e) => return Err(fault(e, &path)),
        };

        let metadata = file.metadata().map_err(|e| fault(e, &path))?;
        if !metadata.is_file() {
            return Err(fault(not_regular(), &path));
        }

        let bound = descriptor.bound();
        let mut buf = Vec::with_capacity(bound);
        file.take(bound as u64)
            .read_to_end(&mut buf)
            .map_err(|e| fault(e, &path))?;

        Ok(buf)
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::system()
    }
}
