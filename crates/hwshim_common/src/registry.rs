//! Interception registry.
//!
//! Tracks which descriptors currently have a replacement attached through the
//! port, and holds the token needed to restore each one. At most one
//! [`InstalledHandler`] exists per descriptor.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::descriptor::Descriptor;
use crate::dispatch::Dispatcher;
use crate::error::RegistryError;
use crate::port::{InterceptionPort, PortToken};

/// An active replacement of one descriptor's native handler
#[derive(Debug)]
pub struct InstalledHandler {
    descriptor: Descriptor,
    token: PortToken,
    installed_at: DateTime<Utc>,
}

impl InstalledHandler {
    pub fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    pub fn installed_at(&self) -> DateTime<Utc> {
        self.installed_at
    }
}

pub struct Registry {
    port: Arc<dyn InterceptionPort>,
    installed: BTreeMap<Descriptor, InstalledHandler>,
}

impl Registry {
    pub fn new(port: Arc<dyn InterceptionPort>) -> Self {
        Self {
            port,
            installed: BTreeMap::new(),
        }
    }

    /// Attach the dispatcher's endpoint for `descriptor`.
    ///
    /// Installing a descriptor that is already installed is an invariant
    /// violation and leaves the existing handler untouched.
    pub fn install(
        &mut self,
        descriptor: Descriptor,
        dispatcher: &Dispatcher,
    ) -> Result<&InstalledHandler, RegistryError> {
        if self.installed.contains_key(&descriptor) {
            return Err(RegistryError::InvariantViolation {
                descriptor,
                detail: "handler already installed",
            });
        }

        let token = self
            .port
            .attach(descriptor, dispatcher.endpoint(descriptor))
            .map_err(|source| RegistryError::ResourceExhausted { descriptor, source })?;

        info!("Installed handler for {}", descriptor.endpoint_path());
        let handler = InstalledHandler {
            descriptor,
            token,
            installed_at: Utc::now(),
        };
        Ok(self.installed.entry(descriptor).or_insert(handler))
    }

    /// Detach `descriptor` if installed. A no-op otherwise.
    pub fn uninstall(&mut self, descriptor: Descriptor) {
        match self.installed.remove(&descriptor) {
            Some(handler) => {
                self.port.detach(handler.token);
                info!("Uninstalled handler for {}", descriptor.endpoint_path());
            }
            None => debug!("{} not installed, nothing to uninstall", descriptor),
        }
    }

    /// Uninstall everything currently installed
    pub fn uninstall_all(&mut self) {
        let installed: Vec<Descriptor> = self.installed.keys().copied().collect();
        for descriptor in installed {
            self.uninstall(descriptor);
        }
    }

    pub fn is_installed(&self, descriptor: Descriptor) -> bool {
        self.installed.contains_key(&descriptor)
    }

    pub fn handler(&self, descriptor: Descriptor) -> Option<&InstalledHandler> {
        self.installed.get(&descriptor)
    }

    pub fn installed(&self) -> Vec<Descriptor> {
        self.installed.keys().copied().collect()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.uninstall_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MemoryPort;
    use crate::synth::Synthesizer;

    fn setup() -> (Arc<MemoryPort>, Registry, Dispatcher) {
        let port = Arc::new(MemoryPort::new());
        let registry = Registry::new(port.clone());
        let dispatcher = Dispatcher::new(Arc::new(Synthesizer::fallback_only()));
        (port, registry, dispatcher)
    }

    #[test]
    fn test_install_routes_reads_to_dispatcher() {
        let (port, mut registry, dispatcher) = setup();

        let handler = registry.install(Descriptor::ProductName, &dispatcher).unwrap();
        assert_eq!(handler.descriptor(), Descriptor::ProductName);
        assert!(registry.is_installed(Descriptor::ProductName));
        assert_eq!(
            port.read_attribute("/sys/class/dmi/id/product_name").unwrap(),
            b"Standard PC\n"
        );
    }

    #[test]
    fn test_double_install_is_invariant_violation() {
        let (port, mut registry, dispatcher) = setup();
        registry.install(Descriptor::CpuInfo, &dispatcher).unwrap();

        let err = registry.install(Descriptor::CpuInfo, &dispatcher).unwrap_err();
        assert!(matches!(err, RegistryError::InvariantViolation { .. }));
        assert!(port.is_attached(Descriptor::CpuInfo));
        assert_eq!(registry.installed(), vec![Descriptor::CpuInfo]);
    }

    #[test]
    fn test_uninstall_is_idempotent() {
        let (port, mut registry, dispatcher) = setup();
        registry.install(Descriptor::SysVendor, &dispatcher).unwrap();

        registry.uninstall(Descriptor::SysVendor);
        let after_first = port.read_attribute("/sys/class/dmi/id/sys_vendor").unwrap();
        registry.uninstall(Descriptor::SysVendor);
        let after_second = port.read_attribute("/sys/class/dmi/id/sys_vendor").unwrap();

        assert_eq!(after_first, after_second);
        assert!(!registry.is_installed(Descriptor::SysVendor));

        // never installed
        registry.uninstall(Descriptor::ProductUuid);
        assert!(registry.installed().is_empty());
    }

    #[test]
    fn test_install_failure_leaves_nothing_behind() {
        let (port, mut registry, dispatcher) = setup();
        port.fail_attach(Descriptor::ProductUuid);

        let err = registry.install(Descriptor::ProductUuid, &dispatcher).unwrap_err();
        assert!(matches!(err, RegistryError::ResourceExhausted { .. }));
        assert!(!registry.is_installed(Descriptor::ProductUuid));
        assert!(!port.is_attached(Descriptor::ProductUuid));
    }

    #[test]
    fn test_drop_uninstalls() {
        let (port, mut registry, dispatcher) = setup();
        registry.install(Descriptor::CpuInfo, &dispatcher).unwrap();
        registry.install(Descriptor::SysVendor, &dispatcher).unwrap();

        drop(registry);
        assert!(!port.is_attached(Descriptor::CpuInfo));
        assert!(!port.is_attached(Descriptor::SysVendor));
    }
}
