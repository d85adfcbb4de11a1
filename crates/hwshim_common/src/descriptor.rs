//! Virtualized hardware-identity descriptors.
//!
//! The set is closed: one sequential CPU endpoint and three DMI attributes.
//! `Descriptor::ALL` is also the install order used during activation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fallback;

/// Bound of the CPU descriptor, terminator included
pub const CPUINFO_BOUND: usize = 8192;

/// Bound of each DMI attribute descriptor, terminator included
pub const ATTRIBUTE_BOUND: usize = 256;

/// How consumers read an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointShape {
    /// Snapshot stream with open/read/seek/release
    Sequential,
    /// One full value per read
    Attribute,
}

/// A consumer-visible interface point whose content we control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Descriptor {
    #[serde(rename = "cpuinfo")]
    CpuInfo,
    #[serde(rename = "dmi.sys_vendor")]
    SysVendor,
    #[serde(rename = "dmi.product_name")]
    ProductName,
    #[serde(rename = "dmi.product_uuid")]
    ProductUuid,
}

impl Descriptor {
    /// Every descriptor, in install order
    pub const ALL: [Descriptor; 4] = [
        Descriptor::CpuInfo,
        Descriptor::SysVendor,
        Descriptor::ProductName,
        Descriptor::ProductUuid,
    ];

    /// Stable descriptor name used in logs and status reports
    pub fn name(self) -> &'static str {
        match self {
            Descriptor::CpuInfo => "cpuinfo",
            Descriptor::SysVendor => "dmi.sys_vendor",
            Descriptor::ProductName => "dmi.product_name",
            Descriptor::ProductUuid => "dmi.product_uuid",
        }
    }

    /// File name of the override inside the profile directory
    pub fn profile_file(self) -> &'static str {
        match self {
            Descriptor::CpuInfo => "cpuinfo",
            Descriptor::SysVendor => "dmi_sys_vendor",
            Descriptor::ProductName => "dmi_product_name",
            Descriptor::ProductUuid => "dmi_product_uuid",
        }
    }

    /// Path under which the OS exposes this descriptor
    pub fn endpoint_path(self) -> &'static str {
        match self {
            Descriptor::CpuInfo => "/proc/cpuinfo",
            Descriptor::SysVendor => "/sys/class/dmi/id/sys_vendor",
            Descriptor::ProductName => "/sys/class/dmi/id/product_name",
            Descriptor::ProductUuid => "/sys/class/dmi/id/product_uuid",
        }
    }

    pub fn bound(self) -> usize {
        match self.shape() {
            EndpointShape::Sequential => CPUINFO_BOUND,
            EndpointShape::Attribute => ATTRIBUTE_BOUND,
        }
    }

    pub fn shape(self) -> EndpointShape {
        match self {
            Descriptor::CpuInfo => EndpointShape::Sequential,
            _ => EndpointShape::Attribute,
        }
    }

    /// Compiled-in content served when no usable override exists
    pub fn fallback(self) -> &'static str {
        match self {
            Descriptor::CpuInfo => fallback::CPUINFO,
            Descriptor::SysVendor => fallback::SYS_VENDOR,
            Descriptor::ProductName => fallback::PRODUCT_NAME,
            Descriptor::ProductUuid => fallback::PRODUCT_UUID,
        }
    }

    /// Position in `ALL`
    pub(crate) fn index(self) -> usize {
        match self {
            Descriptor::CpuInfo => 0,
            Descriptor::SysVendor => 1,
            Descriptor::ProductName => 2,
            Descriptor::ProductUuid => 3,
        }
    }

    pub fn from_endpoint_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.endpoint_path() == path)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
