//! hwshim common - hardware identity virtualization core.
//!
//! Serves a chosen CPU and DMI identity in place of the host's:
//! `/proc/cpuinfo` plus `/sys/class/dmi/id/{sys_vendor,product_name,product_uuid}`.
//! Content comes from the operator profile or compiled-in fallbacks and is
//! attached through an injected [`port::InterceptionPort`].

pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod fallback;
pub mod lifecycle;
pub mod port;
pub mod profile;
pub mod registry;
pub mod status;
pub mod synth;

pub use config::HwshimConfig;
pub use descriptor::{Descriptor, EndpointShape};
pub use dispatch::{Dispatcher, Endpoint, SeqFile};
pub use error::{ActivationError, LifecycleError, PortError, ProfileError, RegistryError};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use port::{ExportPort, InterceptionPort, MemoryPort, PortToken};
pub use profile::{ProfileStore, PROFILE_ROOT};
pub use registry::{InstalledHandler, Registry};
pub use status::{DescriptorStatus, StatusReport};
pub use synth::{ContentSource, Rendered, Synthesizer};
