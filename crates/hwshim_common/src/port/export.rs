//! Export port - materializes endpoints as files for bind-mounting.
//!
//! Each attached descriptor is written to `<root>/<endpoint path>`, e.g.
//! `/run/hwshim/proc/cpuinfo`, with mode 0444. A container runtime
//! bind-mounts these over the real paths. Detaching removes the file, which
//! leaves the native endpoint visible again. Only the token of the current
//! export can remove it.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use super::{InterceptionPort, PortToken};
use crate::descriptor::Descriptor;
use crate::dispatch::Endpoint;
use crate::error::PortError;

#[derive(Debug)]
pub struct ExportPort {
    root: PathBuf,
    /// Serial of the live export per descriptor
    exported: Mutex<BTreeMap<Descriptor, u64>>,
    next_serial: AtomicU64,
}

impl ExportPort {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exported: Mutex::new(BTreeMap::new()),
            next_serial: AtomicU64::new(1),
        }
    }

    /// Where `descriptor` is materialized
    pub fn file_for(&self, descriptor: Descriptor) -> PathBuf {
        self.root
            .join(descriptor.endpoint_path().trim_start_matches('/'))
    }

    fn publish(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Atomic write
        let temp_path = path.with_extension("tmp");
        let written = fs::write(&temp_path, content)
            .and_then(|()| fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o444)))
            .and_then(|()| fs::rename(&temp_path, path));
        if written.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        written
    }
}

impl InterceptionPort for ExportPort {
    fn attach(&self, descriptor: Descriptor, endpoint: Endpoint) -> Result<PortToken, PortError> {
        let mut exported = self.exported.lock().unwrap_or_else(PoisonError::into_inner);
        if exported.contains_key(&descriptor) {
            return Err(PortError::Busy {
                endpoint: descriptor.endpoint_path().to_string(),
            });
        }

        let path = self.file_for(descriptor);
        self.publish(&path, &endpoint.read_all())
            .map_err(|e| PortError::Exhausted {
                endpoint: descriptor.endpoint_path().to_string(),
                reason: format!("cannot publish {}: {}", path.display(), e),
            })?;

        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        exported.insert(descriptor, serial);
        debug!("Exported {} to {}", descriptor, path.display());
        Ok(PortToken::new(descriptor, serial))
    }

    fn detach(&self, token: PortToken) {
        let mut exported = self.exported.lock().unwrap_or_else(PoisonError::into_inner);
        if exported.get(&token.descriptor()) != Some(&token.serial()) {
            debug!("Ignoring stale token for {}", token.descriptor());
            return;
        }
        exported.remove(&token.descriptor());

        let path = self.file_for(token.descriptor());
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}
