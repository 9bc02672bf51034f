// NUMA Topology

/*
 * ALPHA SOVEREIGN - NUMA TOPOLOGY DISCOVERY
 * =================================================================
 * Component Name: src/hardware/topology.rs
 * Core Responsibility: اكتشاف المقبس الذي تنتمي إليه كل نواة من sysfs (Performance Pillar).
 * Design Pattern: Discovery / Graceful Fallback
 * Forensic Impact: إذا كانت الخريطة خاطئة، سيعمل خيط الاستقبال على مقبس بعيد عن بطاقة الشبكة دون أن يلاحظ أحد.
 * =================================================================
 */

use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::error::{LcoreError, LcoreResult};
use crate::lcore::{LCore, NumaSocket};

#[cfg(target_os = "linux")]
const NODE_SYSFS: &str = "/sys/devices/system/node";

/// خريطة النواة -> المقبس.
#[derive(Debug, Clone, Default)]
pub struct NumaTopology {
    cpu_to_node: BTreeMap<LCore, NumaSocket>,
}

impl NumaTopology {
    /// الاكتشاف من sysfs، وإلا مقبس واحد (0) لكل الأنوية.
    pub fn detect() -> Self {
        match Self::detect_sysfs() {
            Ok(topology) => {
                info!("TOPOLOGY: Detected {} NUMA node(s) via sysfs.", topology.num_nodes());
                topology
            }
            Err(e) => {
                warn!("TOPOLOGY: {}. Assuming a single NUMA node.", e);
                Self::default()
            }
        }
    }

    #[cfg(target_os = "linux")]
    fn detect_sysfs() -> LcoreResult<Self> {
        use std::fs;
        use std::path::Path;

        let node_path = Path::new(NODE_SYSFS);
        let entries = fs::read_dir(node_path)
            .map_err(|e| LcoreError::Topology(format!("Failed to read {}: {}", NODE_SYSFS, e)))?;

        let mut topology = Self::default();
        for entry in entries {
            let entry = entry.map_err(|e| LcoreError::Topology(format!("Failed to read entry: {}", e)))?;
            let name = entry.file_name();
            let Some(node_id) = name
                .to_str()
                .and_then(|s| s.strip_prefix("node"))
                .and_then(|s| s.parse::<i32>().ok())
            else {
                continue;
            };

            if let Ok(cpulist) = fs::read_to_string(entry.path().join("cpulist")) {
                for cpu in parse_cpulist(cpulist.trim()) {
                    topology.cpu_to_node.insert(LCore(cpu), NumaSocket::new(node_id));
                }
            }
        }

        if topology.cpu_to_node.is_empty() {
            return Err(LcoreError::Topology("No NUMA nodes found".to_string()));
        }
        Ok(topology)
    }

    #[cfg(not(target_os = "linux"))]
    fn detect_sysfs() -> LcoreResult<Self> {
        Err(LcoreError::Topology("sysfs not available on this platform".to_string()))
    }

    /// بناء خريطة يدوية (للاختبارات).
    pub fn from_map<I: IntoIterator<Item = (u32, i32)>>(pairs: I) -> Self {
        Self {
            cpu_to_node: pairs
                .into_iter()
                .map(|(cpu, node)| (LCore(cpu), NumaSocket::new(node)))
                .collect(),
        }
    }

    /// المقبس الافتراضي لنواة غير معروفة هو 0.
    pub fn node_for(&self, lc: LCore) -> NumaSocket {
        self.cpu_to_node.get(&lc).copied().unwrap_or(NumaSocket::new(0))
    }

    pub fn num_nodes(&self) -> usize {
        let mut nodes: Vec<NumaSocket> = self.cpu_to_node.values().copied().collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes.len().max(1)
    }
}

/// تحليل قائمة مثل "0-7,16-23".
pub fn parse_cpulist(s: &str) -> Vec<u32> {
    let mut cpus = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((start, end)) = part.split_once('-') {
            if let (Ok(start), Ok(end)) = (start.parse::<u32>(), end.parse::<u32>()) {
                cpus.extend(start..=end);
            }
        } else if let Ok(cpu) = part.parse::<u32>() {
            cpus.push(cpu);
        }
    }
    cpus
}
