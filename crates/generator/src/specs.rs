//! Host spec extraction from discovery tables.

use crate::fields;
use autoblueprint_workload_schema::{DiscoveryDump, DiscoveryTable, HostAttribute, HostSpec, Row};

/// Reduce the OS, CPU and memory tables to flat host attributes.
///
/// Only the first row of each table is consulted; an empty table behaves
/// like a row with no columns. Unparsable integers become `None`.
pub fn extract_specs(dump: &DiscoveryDump) -> HostSpec {
    let empty = Row::new();
    let os_row = dump.first_row(DiscoveryTable::OsVersion).unwrap_or(&empty);
    let cpu_row = dump.first_row(DiscoveryTable::CpuInfo).unwrap_or(&empty);
    let mem_row = dump.first_row(DiscoveryTable::MemoryInfo).unwrap_or(&empty);

    HostSpec {
        os_name: fields::OS_NAME.first_text(os_row),
        os_version: fields::OS_VERSION.first_text(os_row),
        platform: fields::OS_PLATFORM.first_text(os_row),
        cpu_model: fields::CPU_MODEL.first_text(cpu_row),
        cpu_physical_cores: fields::CPU_PHYSICAL_CORES.first_int(cpu_row),
        cpu_logical_cores: fields::CPU_LOGICAL_CORES.first_int(cpu_row),
        memory_bytes: fields::CPU_PHYSICAL_MEMORY
            .first_int(cpu_row)
            .or_else(|| fields::MEMORY_TOTAL_BYTES.first_int(mem_row)),
    }
}

/// The discovery table an attribute was read from.
pub fn source_table(attribute: HostAttribute, dump: &DiscoveryDump) -> DiscoveryTable {
    match attribute {
        HostAttribute::OsName | HostAttribute::OsVersion | HostAttribute::Platform => {
            DiscoveryTable::OsVersion
        }
        HostAttribute::CpuModel
        | HostAttribute::CpuPhysicalCores
        | HostAttribute::CpuLogicalCores => DiscoveryTable::CpuInfo,
        HostAttribute::MemoryBytes => {
            let from_cpu = dump
                .first_row(DiscoveryTable::CpuInfo)
                .and_then(|row| fields::CPU_PHYSICAL_MEMORY.first_int(row))
                .is_some();
            if from_cpu {
                DiscoveryTable::CpuInfo
            } else {
                DiscoveryTable::MemoryInfo
            }
        }
    }
}

/// One-line summary for logs.
pub fn describe(spec: &HostSpec) -> String {
    fn show<T: ToString>(v: &Option<T>) -> String {
        v.as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string())
    }
    format!(
        "OS={} {} ({}) | CPU={} cores={}p/{}l | RAM={} bytes",
        show(&spec.os_name),
        show(&spec.os_version),
        show(&spec.platform),
        show(&spec.cpu_model),
        show(&spec.cpu_physical_cores),
        show(&spec.cpu_logical_cores),
        show(&spec.memory_bytes),
    )
}
