//! Sizing heuristics - host attributes to instance class, machine image and
//! root volume.
//!
//! Every function here is total: partial or empty specs produce a default or
//! `None`, never an error.

use autoblueprint_workload_schema::{HostSpec, InstanceCatalogEntry, SizingCatalog};
use serde::Serialize;

pub const WINDOWS_2019_IMAGE: &str =
    "/aws/service/ami-windows-latest/Windows_Server-2019-English-Full-Base";
pub const UBUNTU_2204_IMAGE: &str =
    "/aws/service/canonical/ubuntu/server/22.04/stable/current/amd64/hvm/ebs-gp2/ami-id";
pub const UBUNTU_2004_IMAGE: &str =
    "/aws/service/canonical/ubuntu/server/20.04/stable/current/amd64/hvm/ebs-gp2/ami-id";
pub const DEFAULT_IMAGE: &str = "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2";

pub const WINDOWS_VOLUME_GIB: u32 = 60;
pub const DEFAULT_VOLUME_GIB: u32 = 20;

const GIB: f64 = (1u64 << 30) as f64;

/// Image references in match priority order. First needle found wins.
const IMAGE_RULES: &[(&str, &str)] = &[
    ("windows", WINDOWS_2019_IMAGE),
    ("ubuntu 22", UBUNTU_2204_IMAGE),
    ("ubuntu 20", UBUNTU_2004_IMAGE),
];

/// Memory in whole GiB, rounded half-to-even and floored at 1.
/// Zero or unknown memory yields `None`.
pub fn memory_gib(memory_bytes: Option<u64>) -> Option<u32> {
    match memory_bytes {
        None | Some(0) => None,
        Some(bytes) => {
            let gib = (bytes as f64 / GIB).round_ties_even();
            Some(gib.clamp(1.0, u32::MAX as f64) as u32)
        }
    }
}

/// Cheapest catalog entry that satisfies the host's vCPU and memory.
///
/// Returns `None` when neither target is known or nothing is large enough.
/// Ties on `(vcpus, memory_gib)` go to non-burstable classes, then to
/// catalog order.
pub fn recommend_instance_type<'a>(
    spec: Option<&HostSpec>,
    catalog: &'a SizingCatalog,
) -> Option<&'a InstanceCatalogEntry> {
    let spec = spec?;
    let target_vcpus = spec.cpu_logical_cores.or(spec.cpu_physical_cores);
    let target_memory = memory_gib(spec.memory_bytes);
    if target_vcpus.is_none() && target_memory.is_none() {
        return None;
    }

    catalog
        .instances
        .iter()
        .enumerate()
        .filter(|(_, entry)| target_vcpus.map_or(true, |v| u64::from(entry.vcpus) >= v))
        .filter(|(_, entry)| target_memory.map_or(true, |m| entry.memory_gib >= m))
        .min_by_key(|(index, entry)| (entry.vcpus, entry.memory_gib, entry.burstable, *index))
        .map(|(_, entry)| entry)
}

/// Lowercased strings the OS matchers look at.
fn os_haystacks(spec: &HostSpec) -> Vec<String> {
    let mut haystacks = Vec::new();
    if let Some(name) = &spec.os_name {
        haystacks.push(name.to_lowercase());
        if let Some(version) = &spec.os_version {
            haystacks.push(format!("{} {}", name, version).to_lowercase());
        }
    }
    if let Some(platform) = &spec.platform {
        haystacks.push(platform.to_lowercase());
    }
    haystacks
}

fn mentions(spec: &HostSpec, needle: &str) -> bool {
    os_haystacks(spec).iter().any(|h| h.contains(needle))
}

pub fn is_windows(spec: Option<&HostSpec>) -> bool {
    spec.map_or(false, |s| mentions(s, "windows"))
}

/// Parameter-store path of the machine image to launch.
pub fn recommend_image_parameter(spec: Option<&HostSpec>) -> &'static str {
    let Some(spec) = spec else {
        return DEFAULT_IMAGE;
    };
    IMAGE_RULES
        .iter()
        .find(|(needle, _)| mentions(spec, needle))
        .map(|(_, image)| *image)
        .unwrap_or(DEFAULT_IMAGE)
}

pub fn recommend_volume_size(spec: Option<&HostSpec>) -> u32 {
    if is_windows(spec) {
        WINDOWS_VOLUME_GIB
    } else {
        DEFAULT_VOLUME_GIB
    }
}

/// Root block device name for the selected image family.
pub fn root_device_name(image_parameter: &str) -> &'static str {
    if image_parameter == DEFAULT_IMAGE {
        "/dev/xvda"
    } else {
        "/dev/sda1"
    }
}

/// The three sizing decisions for one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizingRecommendation {
    pub instance_type: Option<String>,
    pub image_parameter: String,
    pub volume_size_gib: u32,
    pub root_device_name: String,
}

pub fn recommend(spec: Option<&HostSpec>, catalog: &SizingCatalog) -> SizingRecommendation {
    let image = recommend_image_parameter(spec);
    SizingRecommendation {
        instance_type: recommend_instance_type(spec, catalog).map(|e| e.name.clone()),
        image_parameter: image.to_string(),
        volume_size_gib: recommend_volume_size(spec),
        root_device_name: root_device_name(image).to_string(),
    }
}
