//! Descriptor synthesizer.
//!
//! Decides, once per activation, whether each descriptor serves its profile
//! override or its compiled-in fallback, and keeps the rendered result as an
//! immutable value. After construction nothing here performs I/O or mutates,
//! so `render` can be called from any number of readers without locking.

use std::ffi::CString;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::descriptor::{Descriptor, EndpointShape};
use crate::error::ProfileError;
use crate::profile::ProfileStore;

/// Where the active content of a descriptor came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSource {
    Profile,
    Fallback,
}

/// Terminated descriptor content, never longer than its bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    text: CString,
}

impl Rendered {
    /// Normalize raw override bytes for `descriptor`.
    ///
    /// Returns `None` when nothing usable remains, which callers treat the
    /// same as a missing override.
    pub fn from_override(descriptor: Descriptor, raw: &[u8]) -> Option<Self> {
        let payload = normalize(descriptor, raw)?;
        CString::new(payload).ok().map(|text| Self { text })
    }

    pub fn fallback(descriptor: Descriptor) -> Self {
        let text = CString::new(descriptor.fallback()).unwrap_or_default();
        Self { text }
    }

    /// Served bytes, without the terminator
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Served bytes followed by the terminating NUL
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        self.text.as_bytes_with_nul()
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Cut at the first NUL, keep one line for attributes, and fit `bound - 1`.
fn normalize(descriptor: Descriptor, raw: &[u8]) -> Option<Vec<u8>> {
    let budget = descriptor.bound() - 1;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let text = &raw[..end];

    match descriptor.shape() {
        EndpointShape::Sequential => {
            let kept = &text[..text.len().min(budget)];
            (!kept.is_empty()).then(|| kept.to_vec())
        }
        EndpointShape::Attribute => {
            let line_end = text.iter().position(|&b| b == b'\n').unwrap_or(text.len());
            let line = &text[..line_end];
            if line.is_empty() {
                return None;
            }
            let kept = &line[..line.len().min(budget - 1)];
            let mut out = Vec::with_capacity(kept.len() + 1);
            out.extend_from_slice(kept);
            out.push(b'\n');
            Some(out)
        }
    }
}

#[derive(Debug)]
struct Slot {
    source: ContentSource,
    content: Arc<Rendered>,
}

impl Slot {
    fn fallback(descriptor: Descriptor) -> Self {
        Self {
            source: ContentSource::Fallback,
            content: Arc::new(Rendered::fallback(descriptor)),
        }
    }
}

/// Active content for every descriptor
#[derive(Debug)]
pub struct Synthesizer {
    slots: [Slot; 4],
}

impl Synthesizer {
    /// Consult the profile store exactly once per descriptor.
    ///
    /// Profile failures never escape: every error degrades to the fallback.
    pub fn load(store: &ProfileStore) -> Self {
        let slots = Descriptor::ALL.map(|descriptor| load_slot(store, descriptor));
        Self { slots }
    }

    /// Synthesizer that serves only compiled-in content
    pub fn fallback_only() -> Self {
        Self {
            slots: Descriptor::ALL.map(Slot::fallback),
        }
    }

    /// Active content for `descriptor`. Pure read.
    pub fn render(&self, descriptor: Descriptor) -> &Rendered {
        &self.slots[descriptor.index()].content
    }

    /// Shared handle on the active content, for readers that outlive a call
    pub fn snapshot(&self, descriptor: Descriptor) -> Arc<Rendered> {
        Arc::clone(&self.slots[descriptor.index()].content)
    }

    pub fn source(&self, descriptor: Descriptor) -> ContentSource {
        self.slots[descriptor.index()].source
    }
}

fn load_slot(store: &ProfileStore, descriptor: Descriptor) -> Slot {
    match store.load(descriptor) {
        Ok(raw) => match Rendered::from_override(descriptor, &raw) {
            Some(rendered) => {
                if raw.len() >= descriptor.bound() {
                    warn!(
                        "{} override truncated to {} bytes (bound {})",
                        descriptor,
                        rendered.len(),
                        descriptor.bound()
                    );
                }
                info!("Loaded {} override ({} bytes)", descriptor, rendered.len());
                Slot {
                    source: ContentSource::Profile,
                    content: Arc::new(rendered),
                }
            }
            None => {
                debug!("{} override is empty, using fallback", descriptor);
                Slot::fallback(descriptor)
            }
        },
        Err(e @ ProfileError::NotFound { .. }) => {
            debug!("{}, using fallback", e);
            Slot::fallback(descriptor)
        }
        Err(e @ ProfileError::IoFault { .. }) => {
            warn!("{} (code {}), using fallback", e, e.code());
            Slot::fallback(descriptor)
        }
    }
}
