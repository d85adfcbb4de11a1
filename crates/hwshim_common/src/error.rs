//! Error types for hwshim.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::descriptor::Descriptor;
use crate::lifecycle::LifecycleState;

const ENOENT: i32 = 2;
const EIO: i32 = 5;
const ENOMEM: i32 = 12;
const EBUSY: i32 = 16;
const EINVAL: i32 = 22;

/// Why a profile override could not be used. Both variants degrade to fallback.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("no override for {descriptor} at {}", path.display())]
    NotFound { descriptor: Descriptor, path: PathBuf },

    #[error("override for {descriptor} at {} is unreadable: {source}", path.display())]
    IoFault {
        descriptor: Descriptor,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProfileError {
    pub fn code(&self) -> i32 {
        match self {
            ProfileError::NotFound { .. } => -ENOENT,
            ProfileError::IoFault { .. } => -EIO,
        }
    }
}

/// Failure reported by a platform port
#[derive(Error, Debug)]
pub enum PortError {
    #[error("cannot allocate registration for {endpoint}: {reason}")]
    Exhausted { endpoint: String, reason: String },

    #[error("endpoint {endpoint} is already attached")]
    Busy { endpoint: String },
}

impl PortError {
    pub fn code(&self) -> i32 {
        match self {
            PortError::Exhausted { .. } => -ENOMEM,
            PortError::Busy { .. } => -EBUSY,
        }
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("cannot install handler for {descriptor}: {source}")]
    ResourceExhausted {
        descriptor: Descriptor,
        #[source]
        source: PortError,
    },

    /// Precondition breach; unreachable under correct lifecycle sequencing
    #[error("invariant violated for {descriptor}: {detail}")]
    InvariantViolation {
        descriptor: Descriptor,
        detail: &'static str,
    },
}

impl RegistryError {
    pub fn code(&self) -> i32 {
        match self {
            RegistryError::ResourceExhausted { source, .. } => source.code(),
            RegistryError::InvariantViolation { .. } => -EINVAL,
        }
    }

    pub fn descriptor(&self) -> Descriptor {
        match self {
            RegistryError::ResourceExhausted { descriptor, .. }
            | RegistryError::InvariantViolation { descriptor, .. } => *descriptor,
        }
    }
}

/// One aggregate failure for a whole activation attempt
#[derive(Error, Debug)]
#[error("activation failed at {failed}; rolled back {} handler(s)", rolled_back.len())]
pub struct ActivationError {
    /// Descriptor whose install failed
    pub failed: Descriptor,
    /// Descriptors uninstalled during rollback, in uninstall order
    pub rolled_back: Vec<Descriptor>,
    #[source]
    pub source: RegistryError,
}

impl ActivationError {
    pub fn code(&self) -> i32 {
        self.source.code()
    }
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("cannot {op} while {state}")]
    InvalidState {
        op: &'static str,
        state: LifecycleState,
    },

    #[error(transparent)]
    Activation(#[from] ActivationError),
}

impl LifecycleError {
    pub fn code(&self) -> i32 {
        match self {
            LifecycleError::InvalidState { .. } => -EBUSY,
            LifecycleError::Activation(e) => e.code(),
        }
    }
}
