//! In-process port.
//!
//! Models the OS endpoint table: every descriptor has native content, and an
//! attached endpoint shadows it until detached. Consumers read by endpoint
//! path, which makes this the port of choice for tests and for embedders
//! that serve the virtual files themselves.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use tracing::debug;

use super::{InterceptionPort, PortToken};
use crate::descriptor::Descriptor;
use crate::dispatch::{Endpoint, SeqFile};
use crate::error::PortError;

/// Native content of the modelled host
pub const NATIVE_CPUINFO: &str = "processor\t: 0\nvendor_id\t: HostVendor\nmodel name\t: Host CPU\n\n";
pub const NATIVE_ATTRIBUTE: &str = "host\n";

#[derive(Debug)]
struct Node {
    native: Vec<u8>,
    attached: Option<(u64, Endpoint)>,
}

#[derive(Debug)]
pub struct MemoryPort {
    nodes: RwLock<BTreeMap<Descriptor, Node>>,
    failing: Mutex<BTreeSet<Descriptor>>,
    next_serial: AtomicU64,
}

impl MemoryPort {
    pub fn new() -> Self {
        let nodes = Descriptor::ALL
            .into_iter()
            .map(|d| {
                let native = match d {
                    Descriptor::CpuInfo => NATIVE_CPUINFO,
                    _ => NATIVE_ATTRIBUTE,
                };
                (
                    d,
                    Node {
                        native: native.as_bytes().to_vec(),
                        attached: None,
                    },
                )
            })
            .collect();

        Self {
            nodes: RwLock::new(nodes),
            failing: Mutex::new(BTreeSet::new()),
            next_serial: AtomicU64::new(1),
        }
    }

    /// Replace the native content of one descriptor
    pub fn with_native(self, descriptor: Descriptor, content: &[u8]) -> Self {
        if let Some(node) = self
            .nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&descriptor)
        {
            node.native = content.to_vec();
        }
        self
    }

    /// Make every `attach` of `descriptor` fail as if the OS were out of memory
    pub fn fail_attach(&self, descriptor: Descriptor) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(descriptor);
    }

    pub fn clear_failures(&self) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_attached(&self, descriptor: Descriptor) -> bool {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&descriptor)
            .is_some_and(|n| n.attached.is_some())
    }

    /// Open a sequential endpoint the way a consumer would
    pub fn open(&self, path: &str) -> io::Result<OpenFile> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        let node = lookup(&nodes, path)?;
        Ok(match &node.attached {
            Some((_, Endpoint::Sequential(endpoint))) => OpenFile::Virtual(endpoint.open()),
            Some((_, Endpoint::Attribute(endpoint))) => {
                OpenFile::Native(Cursor::new(endpoint.show().as_bytes().to_vec()))
            }
            None => OpenFile::Native(Cursor::new(node.native.clone())),
        })
    }

    /// One attribute read: the complete current value
    pub fn read_attribute(&self, path: &str) -> io::Result<Vec<u8>> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        let node = lookup(&nodes, path)?;
        Ok(match &node.attached {
            Some((_, endpoint)) => endpoint.read_all(),
            None => node.native.clone(),
        })
    }

    /// Open and read to the end
    pub fn read_to_vec(&self, path: &str) -> io::Result<Vec<u8>> {
        let mut file = self.open(path)?;
        let mut out = Vec::new();
        file.read_to_end(&mut out)?;
        Ok(out)
    }
}

impl Default for MemoryPort {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(nodes: &'a BTreeMap<Descriptor, Node>, path: &str) -> io::Result<&'a Node> {
    Descriptor::from_endpoint_path(path)
        .and_then(|d| nodes.get(&d))
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no endpoint at {path}")))
}

impl InterceptionPort for MemoryPort {
    fn attach(&self, descriptor: Descriptor, endpoint: Endpoint) -> Result<PortToken, PortError> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&descriptor);
        if failing {
            return Err(PortError::Exhausted {
                endpoint: descriptor.endpoint_path().to_string(),
                reason: "out of memory".to_string(),
            });
        }

        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let node = nodes.get_mut(&descriptor).ok_or_else(|| PortError::Exhausted {
            endpoint: descriptor.endpoint_path().to_string(),
            reason: "no such endpoint".to_string(),
        })?;
        if node.attached.is_some() {
            return Err(PortError::Busy {
                endpoint: descriptor.endpoint_path().to_string(),
            });
        }

        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        node.attached = Some((serial, endpoint));
        debug!("Attached {} (serial {})", descriptor.endpoint_path(), serial);
        Ok(PortToken::new(descriptor, serial))
    }

    fn detach(&self, token: PortToken) {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(node) = nodes.get_mut(&token.descriptor()) {
            // A stale token must not tear down a newer attachment
            if matches!(node.attached, Some((serial, _)) if serial == token.serial()) {
                node.attached = None;
                debug!("Detached {}", token.descriptor().endpoint_path());
            }
        }
    }
}

/// A consumer's open file on a [`MemoryPort`] endpoint
#[derive(Debug)]
pub enum OpenFile {
    Virtual(SeqFile),
    Native(Cursor<Vec<u8>>),
}

impl Read for OpenFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            OpenFile::Virtual(f) => f.read(buf),
            OpenFile::Native(c) => c.read(buf),
        }
    }
}

impl Seek for OpenFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            OpenFile::Virtual(f) => f.seek(pos),
            OpenFile::Native(c) => c.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Dispatcher;
    use crate::synth::Synthesizer;
    use std::sync::Arc;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(Synthesizer::fallback_only()))
    }

    #[test]
    fn test_native_content_before_attach() {
        let port = MemoryPort::new();
        assert_eq!(port.read_to_vec("/proc/cpuinfo").unwrap(), NATIVE_CPUINFO.as_bytes());
        assert_eq!(
            port.read_attribute("/sys/class/dmi/id/sys_vendor").unwrap(),
            b"host\n"
        );
    }

    #[test]
    fn test_attach_then_detach_restores_native() {
        let port = MemoryPort::new().with_native(Descriptor::SysVendor, b"Real Vendor\n");
        let token = port
            .attach(Descriptor::SysVendor, dispatcher().endpoint(Descriptor::SysVendor))
            .unwrap();

        assert!(port.is_attached(Descriptor::SysVendor));
        assert_eq!(
            port.read_attribute("/sys/class/dmi/id/sys_vendor").unwrap(),
            b"Intel Corporation\n"
        );

        port.detach(token);
        assert!(!port.is_attached(Descriptor::SysVendor));
        assert_eq!(
            port.read_attribute("/sys/class/dmi/id/sys_vendor").unwrap(),
            b"Real Vendor\n"
        );
    }

    #[test]
    fn test_double_attach_is_busy() {
        let port = MemoryPort::new();
        let d = dispatcher();
        let _token = port.attach(Descriptor::CpuInfo, d.endpoint(Descriptor::CpuInfo)).unwrap();
        let err = port
            .attach(Descriptor::CpuInfo, d.endpoint(Descriptor::CpuInfo))
            .unwrap_err();
        assert!(matches!(err, PortError::Busy { .. }));
    }

    #[test]
    fn test_stale_token_is_ignored() {
        let port = MemoryPort::new();
        let d = dispatcher();
        let token = port.attach(Descriptor::CpuInfo, d.endpoint(Descriptor::CpuInfo)).unwrap();
        let stale = PortToken::new(Descriptor::CpuInfo, token.serial() + 100);

        port.detach(stale);
        assert!(port.is_attached(Descriptor::CpuInfo));
        port.detach(token);
        assert!(!port.is_attached(Descriptor::CpuInfo));
    }

    #[test]
    fn test_injected_failure() {
        let port = MemoryPort::new();
        port.fail_attach(Descriptor::ProductName);
        let err = port
            .attach(Descriptor::ProductName, dispatcher().endpoint(Descriptor::ProductName))
            .unwrap_err();
        assert_eq!(err.code(), -12);

        port.clear_failures();
        assert!(port
            .attach(Descriptor::ProductName, dispatcher().endpoint(Descriptor::ProductName))
            .is_ok());
    }

    #[test]
    fn test_unknown_path() {
        let port = MemoryPort::new();
        let err = port.read_attribute("/sys/class/dmi/id/bios_vendor").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
