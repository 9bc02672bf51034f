// Pinned Worker Launcher

/*
 * ALPHA SOVEREIGN - LCORE WORKER LAUNCHER
 * =================================================================
 * Component Name: src/hardware/launcher.rs
 * Core Responsibility: تشغيل عامل مثبت على نواة ممنوحة وتتبع حالة تشغيلها (Performance Pillar).
 * Design Pattern: Thread-per-Core / State Machine (Wait -> Running -> Finished -> Wait)
 * Forensic Impact: حالة النواة هنا هي ما يراه المخصص. إذا بقيت Running بعد موت العامل، ستضيع النواة إلى الأبد.
 * =================================================================
 */

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

use crate::error::{LcoreError, LcoreResult};
use crate::lcore::{LCore, LCoreState, MAX_LCORE};

const STATE_WAIT: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_FINISHED: u8 = 2;

fn decode(raw: u8) -> LCoreState {
    match raw {
        STATE_WAIT => LCoreState::Wait,
        STATE_RUNNING => LCoreState::Running,
        _ => LCoreState::Finished,
    }
}

/// ينقل الحالة إلى Finished عند خروج العامل، حتى عند panic.
struct FinishOnDrop(Arc<AtomicU8>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.store(STATE_FINISHED, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct LaunchSlot {
    state: Arc<AtomicU8>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// مشغل العمال. آمن للمشاركة بين خيط التحكم ومزود الجرد.
pub struct LCoreLauncher {
    slots: Box<[LaunchSlot]>,
}

impl Default for LCoreLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl LCoreLauncher {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_LCORE).map(|_| LaunchSlot::default()).collect(),
        }
    }

    fn slot(&self, lc: LCore) -> LcoreResult<&LaunchSlot> {
        lc.index()
            .map(|idx| &self.slots[idx])
            .ok_or(LcoreError::InvalidLCore(lc))
    }

    pub fn state(&self, lc: LCore) -> LCoreState {
        match self.slot(lc) {
            Ok(slot) => decode(slot.state.load(Ordering::SeqCst)),
            Err(_) => LCoreState::Finished,
        }
    }

    /// تشغيل `f` على النواة `lc`. النواة يجب أن تكون خاملة (Wait).
    pub fn launch<F>(&self, lc: LCore, name: &str, f: F) -> LcoreResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let slot = self.slot(lc)?;
        slot.state
            .compare_exchange(STATE_WAIT, STATE_RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|raw| LcoreError::LCoreBusy { lc, state: decode(raw) })?;

        let done = FinishOnDrop(slot.state.clone());
        let core_id = core_affinity::CoreId { id: lc.id() as usize };

        let spawned = thread::Builder::new()
            .name(format!("lcore{}-{}", lc, name))
            .spawn(move || {
                let _done = done;
                if !core_affinity::set_for_current(core_id) {
                    warn!("PINNING_FAIL: Could not pin worker to lcore {}", core_id.id);
                }
                f();
            });

        match spawned {
            Ok(handle) => {
                *slot.handle.lock() = Some(handle);
                info!("LAUNCHER: Worker '{}' started on lcore {}", name, lc);
                Ok(())
            }
            Err(e) => {
                // الإغلاق لم يُنفذ، والحارس أُسقط داخله: نعيد الحالة يدوياً
                slot.state.store(STATE_WAIT, Ordering::SeqCst);
                Err(LcoreError::LaunchFailed(format!("spawn on lcore {}: {}", lc, e)))
            }
        }
    }

    /// انتظار انتهاء العامل وإعادة النواة إلى Wait.
    pub fn wait(&self, lc: LCore) -> LcoreResult<()> {
        let slot = self.slot(lc)?;
        let handle = slot.handle.lock().take();
        let result = match handle {
            Some(handle) => handle.join().map_err(|_| {
                error!("LAUNCHER: Worker on lcore {} panicked", lc);
                LcoreError::LaunchFailed(format!("worker on lcore {} panicked", lc))
            }),
            None => Ok(()),
        };
        slot.state.store(STATE_WAIT, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    #[test]
    fn test_launch_wait_cycle() {
        let launcher = LCoreLauncher::new();
        let lc = LCore(0);
        let (release_tx, release_rx) = mpsc::channel::<()>();

        launcher.launch(lc, "test", move || {
            let _ = release_rx.recv();
        }).unwrap();
        assert_eq!(launcher.state(lc), LCoreState::Running);

        // نواة مشغولة لا تقبل عاملاً ثانياً
        let err = launcher.launch(lc, "second", || {}).unwrap_err();
        assert!(matches!(err, LcoreError::LCoreBusy { .. }));

        release_tx.send(()).unwrap();
        launcher.wait(lc).unwrap();
        assert_eq!(launcher.state(lc), LCoreState::Wait);
    }

    #[test]
    fn test_finished_until_reaped() {
        let launcher = LCoreLauncher::new();
        let lc = LCore(2);
        launcher.launch(lc, "short", || {}).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while launcher.state(lc) != LCoreState::Finished {
            assert!(Instant::now() < deadline, "worker never reached Finished");
            thread::sleep(Duration::from_millis(5));
        }

        // Finished ليست خاملة: لا عامل جديد قبل wait
        assert!(!launcher.state(lc).is_idle());
        assert!(matches!(
            launcher.launch(lc, "again", || {}),
            Err(LcoreError::LCoreBusy { state: LCoreState::Finished, .. })
        ));

        launcher.wait(lc).unwrap();
        assert_eq!(launcher.state(lc), LCoreState::Wait);
    }

    #[test]
    fn test_panicking_worker_is_reaped() {
        let launcher = LCoreLauncher::new();
        let lc = LCore(1);
        launcher.launch(lc, "boom", || panic!("worker failure")).unwrap();
        assert!(launcher.wait(lc).is_err());
        assert_eq!(launcher.state(lc), LCoreState::Wait);
    }

    #[test]
    fn test_out_of_range() {
        let launcher = LCoreLauncher::new();
        assert_eq!(launcher.state(LCore(500)), LCoreState::Finished);
        assert!(launcher.launch(LCore(500), "x", || {}).is_err());
    }
}
