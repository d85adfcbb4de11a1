//! Request dispatcher - serves consumer reads from the synthesizer.
//!
//! Two endpoint shapes exist. The CPU descriptor is a sequential file: each
//! `open` takes a snapshot of the rendered content and the returned
//! [`SeqFile`] supports reads and repositioning within that snapshot. DMI
//! attributes return their whole value on every `show`.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::descriptor::{Descriptor, EndpointShape};
use crate::synth::{Rendered, Synthesizer};

/// Entry point handed to ports; cheap to clone
#[derive(Debug, Clone)]
pub struct Dispatcher {
    synth: Arc<Synthesizer>,
}

impl Dispatcher {
    pub fn new(synth: Arc<Synthesizer>) -> Self {
        Self { synth }
    }

    /// Endpoint serving `descriptor` in its native shape
    pub fn endpoint(&self, descriptor: Descriptor) -> Endpoint {
        match descriptor.shape() {
            EndpointShape::Sequential => Endpoint::Sequential(SeqEndpoint {
                descriptor,
                synth: Arc::clone(&self.synth),
            }),
            EndpointShape::Attribute => Endpoint::Attribute(AttrEndpoint {
                descriptor,
                synth: Arc::clone(&self.synth),
            }),
        }
    }
}

/// Replacement handler for one descriptor
#[derive(Debug, Clone)]
pub enum Endpoint {
    Sequential(SeqEndpoint),
    Attribute(AttrEndpoint),
}

impl Endpoint {
    pub fn descriptor(&self) -> Descriptor {
        match self {
            Endpoint::Sequential(e) => e.descriptor,
            Endpoint::Attribute(e) => e.descriptor,
        }
    }

    /// Full content as a consumer would read it end to end
    pub fn read_all(&self) -> Vec<u8> {
        match self {
            Endpoint::Sequential(e) => e.open().into_snapshot().as_bytes().to_vec(),
            Endpoint::Attribute(e) => e.show().as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeqEndpoint {
    descriptor: Descriptor,
    synth: Arc<Synthesizer>,
}

impl SeqEndpoint {
    /// Render a fresh snapshot for one open file
    pub fn open(&self) -> SeqFile {
        SeqFile::new(self.synth.snapshot(self.descriptor))
    }
}

#[derive(Debug, Clone)]
pub struct AttrEndpoint {
    descriptor: Descriptor,
    synth: Arc<Synthesizer>,
}

impl AttrEndpoint {
    /// The complete current value; never partial
    pub fn show(&self) -> Arc<Rendered> {
        self.synth.snapshot(self.descriptor)
    }
}

/// An open sequential file over one rendered snapshot.
///
/// Dropping it is the release.
#[derive(Debug)]
pub struct SeqFile {
    snapshot: Arc<Rendered>,
    pos: u64,
}

impl SeqFile {
    fn new(snapshot: Arc<Rendered>) -> Self {
        Self { snapshot, pos: 0 }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn len(&self) -> u64 {
        self.snapshot.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    fn into_snapshot(self) -> Arc<Rendered> {
        self.snapshot
    }
}

impl Read for SeqFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.snapshot.as_bytes();
        let start = usize::try_from(self.pos).unwrap_or(usize::MAX).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for SeqFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, offset) = match pos {
            SeekFrom::Start(n) => {
                self.pos = n;
                return Ok(n);
            }
            SeekFrom::Current(off) => (self.pos, off),
            SeekFrom::End(off) => (self.len(), off),
        };
        match base.checked_add_signed(offset) {
            Some(n) => {
                self.pos = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
