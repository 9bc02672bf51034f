// Live Inventory & Core Pinning

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{LcoreError, LcoreResult};
use crate::lcore::{LCore, LCoreProvider, LCoreState, NumaSocket};

pub mod launcher;
pub mod topology;

pub use launcher::LCoreLauncher;
pub use topology::NumaTopology;

/// تثبيت الخيط الحالي على نواة معينة (يستخدمه خيط التحكم للنواة الرئيسية).
pub fn apply_affinity(lc: LCore) -> LcoreResult<()> {
    let core_ids = core_affinity::get_core_ids()
        .ok_or_else(|| LcoreError::Topology("Failed to retrieve processor cores".to_string()))?;

    let core = core_ids
        .into_iter()
        .find(|c| c.id == lc.id() as usize)
        .ok_or(LcoreError::InvalidLCore(lc))?;

    if core_affinity::set_for_current(core) {
        Ok(())
    } else {
        Err(LcoreError::Topology(format!("OS refused to pin thread to lcore {}", lc)))
    }
}

/// مزود الجرد الحي: الأنوية من نظام التشغيل، المقابس من sysfs، الحالات من المشغل.
pub struct SystemProvider {
    workers: Vec<LCore>,
    topology: NumaTopology,
    launcher: Arc<LCoreLauncher>,
}

impl SystemProvider {
    /// كل الأنوية المرئية باستثناء `main_lcore` (نواة خيط التحكم).
    pub fn new(topology: NumaTopology, main_lcore: LCore, launcher: Arc<LCoreLauncher>) -> LcoreResult<Self> {
        let core_ids = core_affinity::get_core_ids()
            .ok_or_else(|| LcoreError::Topology("Failed to detect CPU cores topology".to_string()))?;

        let workers: Vec<LCore> = core_ids
            .into_iter()
            .map(|c| LCore(c.id as u32))
            .filter(|lc| *lc != main_lcore)
            .collect();

        info!(
            "SYSTEM_PROVIDER: {} worker lcore(s) on {} NUMA node(s), main lcore {}",
            workers.len(),
            topology.num_nodes(),
            main_lcore
        );
        if workers.is_empty() {
            warn!("PERF_WARNING: No worker lcores available. Every allocation will fail.");
        }

        Ok(Self::with_workers(workers, topology, launcher))
    }

    pub fn with_workers(workers: Vec<LCore>, topology: NumaTopology, launcher: Arc<LCoreLauncher>) -> Self {
        Self { workers, topology, launcher }
    }

    pub fn launcher(&self) -> &Arc<LCoreLauncher> {
        &self.launcher
    }
}

impl LCoreProvider for SystemProvider {
    fn list_workers(&self) -> Vec<LCore> {
        self.workers.clone()
    }

    fn state(&self, lc: LCore) -> LCoreState {
        self.launcher.state(lc)
    }

    fn numa_socket(&self, lc: LCore) -> NumaSocket {
        self.topology.node_for(lc)
    }
}
