//! Platform ports - where handler replacements actually take effect.
//!
//! The core never touches the OS directly. A port attaches an [`Endpoint`]
//! in place of a descriptor's native handler and hands back a [`PortToken`];
//! giving the token back to `detach` restores the native handler.

pub mod export;
pub mod memory;

pub use export::ExportPort;
pub use memory::{MemoryPort, OpenFile};

use crate::descriptor::Descriptor;
use crate::dispatch::Endpoint;
use crate::error::PortError;

/// Capability for one attached replacement. Not clonable: exactly one owner
/// can detach it.
#[derive(Debug, PartialEq, Eq)]
pub struct PortToken {
    descriptor: Descriptor,
    serial: u64,
}

impl PortToken {
    pub fn new(descriptor: Descriptor, serial: u64) -> Self {
        Self { descriptor, serial }
    }

    pub fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }
}

pub trait InterceptionPort: Send + Sync {
    /// Route every later read of `descriptor` to `endpoint`.
    ///
    /// The endpoint's content is complete when this is called, so a port may
    /// publish it immediately.
    fn attach(&self, descriptor: Descriptor, endpoint: Endpoint) -> Result<PortToken, PortError>;

    /// Undo an `attach`. Must not fail; ports log what they cannot clean up.
    fn detach(&self, token: PortToken);
}
