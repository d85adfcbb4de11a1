//! Lifecycle manager.
//!
//! `Unloaded -> Loading -> Active -> Unloading -> Unloaded`
//!
//! Activation loads the profile, then installs every descriptor in
//! `Descriptor::ALL` order. If any install fails, everything installed in the
//! attempt is uninstalled in reverse order and the manager returns to
//! `Unloaded`, so consumers never see a partially virtualized system. The
//! whole state machine sits behind one mutex.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::descriptor::Descriptor;
use crate::dispatch::Dispatcher;
use crate::error::{ActivationError, LifecycleError};
use crate::port::InterceptionPort;
use crate::profile::ProfileStore;
use crate::registry::Registry;
use crate::status::{DescriptorStatus, StatusReport};
use crate::synth::Synthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Unloaded,
    Loading,
    Active,
    Unloading,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Unloaded => "unloaded",
            LifecycleState::Loading => "loading",
            LifecycleState::Active => "active",
            LifecycleState::Unloading => "unloading",
        };
        f.write_str(s)
    }
}

struct Inner {
    state: LifecycleState,
    registry: Registry,
    synth: Option<Arc<Synthesizer>>,
}

pub struct Lifecycle {
    store: ProfileStore,
    inner: Mutex<Inner>,
}

impl Lifecycle {
    pub fn new(store: ProfileStore, port: Arc<dyn InterceptionPort>) -> Self {
        Self {
            store,
            inner: Mutex::new(Inner {
                state: LifecycleState::Unloaded,
                registry: Registry::new(port),
                synth: None,
            }),
        }
    }

    /// Manager reading the fixed system profile
    pub fn system(port: Arc<dyn InterceptionPort>) -> Self {
        Self::new(ProfileStore::system(), port)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    pub fn is_installed(&self, descriptor: Descriptor) -> bool {
        self.lock().registry.is_installed(descriptor)
    }

    /// Load the profile and install every handler, or nothing at all.
    pub fn activate(&self) -> Result<(), LifecycleError> {
        let attempt = Uuid::new_v4();
        let _span = info_span!("activate", %attempt).entered();

        let mut inner = self.lock();
        if inner.state != LifecycleState::Unloaded {
            return Err(LifecycleError::InvalidState {
                op: "activate",
                state: inner.state,
            });
        }

        inner.state = LifecycleState::Loading;
        info!("Loading profile from {}", self.store.root().display());
        // Content is complete before any handler that serves it is attached
        let synth = Arc::new(Synthesizer::load(&self.store));
        let dispatcher = Dispatcher::new(Arc::clone(&synth));

        let mut installed = Vec::with_capacity(Descriptor::ALL.len());
        for descriptor in Descriptor::ALL {
            let outcome = inner.registry.install(descriptor, &dispatcher).map(|_| ());
            if let Err(source) = outcome {
                error!("Failed to install {}: {} (code {})", descriptor, source, source.code());

                let mut rolled_back = Vec::with_capacity(installed.len());
                for done in installed.into_iter().rev() {
                    inner.registry.uninstall(done);
                    rolled_back.push(done);
                }
                warn!("Rolled back {} handler(s)", rolled_back.len());

                inner.state = LifecycleState::Unloaded;
                return Err(ActivationError {
                    failed: descriptor,
                    rolled_back,
                    source,
                }
                .into());
            }
            installed.push(descriptor);
        }

        inner.synth = Some(synth);
        inner.state = LifecycleState::Active;
        info!("Activated {} virtual endpoints", installed.len());
        Ok(())
    }

    /// Uninstall every handler and release cached content.
    pub fn deactivate(&self) -> Result<(), LifecycleError> {
        let mut inner = self.lock();
        if inner.state != LifecycleState::Active {
            return Err(LifecycleError::InvalidState {
                op: "deactivate",
                state: inner.state,
            });
        }

        inner.state = LifecycleState::Unloading;
        for descriptor in Descriptor::ALL {
            inner.registry.uninstall(descriptor);
        }
        inner.synth = None;
        inner.state = LifecycleState::Unloaded;
        info!("Deactivated");
        Ok(())
    }

    pub fn status(&self) -> StatusReport {
        let inner = self.lock();
        let descriptors = Descriptor::ALL
            .into_iter()
            .map(|descriptor| DescriptorStatus {
                descriptor,
                endpoint: descriptor.endpoint_path().to_string(),
                installed: inner.registry.is_installed(descriptor),
                installed_at: inner.registry.handler(descriptor).map(|h| h.installed_at()),
                source: inner.synth.as_ref().map(|s| s.source(descriptor)),
                bytes: inner.synth.as_ref().map(|s| s.render(descriptor).len()),
            })
            .collect();

        StatusReport {
            state: inner.state,
            profile_root: self.store.root().to_path_buf(),
            descriptors,
            generated_at: Utc::now(),
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if self.state() == LifecycleState::Active {
            let _ = self.deactivate();
        }
    }
}
