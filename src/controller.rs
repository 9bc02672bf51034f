/*
 * ALPHA SOVEREIGN - LCORE ALLOCATION CONTROLLER
 * =================================================================
 * Component Name: src/controller.rs
 * Core Responsibility: حصر كل قرارات التخصيص في مهمة تحكم واحدة (Stability Pillar).
 * Design Pattern: Actor / Command Channel
 * Forensic Impact: المخصص غير متزامن داخلياً. هذه المهمة هي الضمان الوحيد بأن قرارين لا يتداخلان.
 * =================================================================
 */

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{LcoreError, LcoreResult};
use crate::lcore::{Allocation, LCore, LCoreAllocConfig, LCoreAllocator, LCoreProvider, NumaSocket};

enum Command {
    Alloc {
        role: String,
        socket: NumaSocket,
        reply: oneshot::Sender<LcoreResult<LCore>>,
    },
    Find {
        role: String,
        socket: NumaSocket,
        reply: oneshot::Sender<LcoreResult<LCore>>,
    },
    Free {
        lc: LCore,
        reply: oneshot::Sender<()>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
    Reload {
        config: LCoreAllocConfig,
        reply: oneshot::Sender<()>,
    },
    Allocations {
        reply: oneshot::Sender<Vec<Allocation>>,
    },
}

/// مقبض للتحكم. يمكن نسخه ومشاركته بين المهام.
#[derive(Clone)]
pub struct AllocController {
    tx: mpsc::Sender<Command>,
}

/// تشغيل مهمة التحكم. تنتهي المهمة عند إسقاط كل المقابض.
///
/// التحرير المزدوج يُسقط المهمة بـ panic (وفي بناء release يوقف العملية).
pub fn spawn<P>(allocator: LCoreAllocator<P>, queue_depth: usize) -> (AllocController, JoinHandle<()>)
where
    P: LCoreProvider + Send + 'static,
{
    let (tx, rx) = mpsc::channel(queue_depth.max(1));
    let handle = tokio::spawn(run(allocator, rx));
    (AllocController { tx }, handle)
}

async fn run<P: LCoreProvider>(mut allocator: LCoreAllocator<P>, mut rx: mpsc::Receiver<Command>) {
    info!("CONTROLLER: Allocation actor started ({} roles configured)", allocator.config().len());

    while let Some(cmd) = rx.recv().await {
        // المستدعي قد يتخلى عن الرد؛ نتجاهل فشل الإرسال
        match cmd {
            Command::Alloc { role, socket, reply } => {
                let _ = reply.send(allocator.alloc(&role, socket));
            }
            Command::Find { role, socket, reply } => {
                let _ = reply.send(allocator.find(&role, socket));
            }
            Command::Free { lc, reply } => {
                allocator.free(lc);
                let _ = reply.send(());
            }
            Command::Clear { reply } => {
                allocator.clear();
                let _ = reply.send(());
            }
            Command::Reload { config, reply } => {
                warn!("CONTROLLER: Policy reload. Releasing {} allocation(s).", allocator.allocations().len());
                allocator.reload(config);
                let _ = reply.send(());
            }
            Command::Allocations { reply } => {
                let _ = reply.send(allocator.allocations());
            }
        }
    }

    info!("CONTROLLER: Allocation actor stopped.");
}

impl AllocController {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> LcoreResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| LcoreError::ControllerStopped)?;
        rx.await.map_err(|_| LcoreError::ControllerStopped)
    }

    pub async fn alloc(&self, role: &str, socket: NumaSocket) -> LcoreResult<LCore> {
        let role = role.to_string();
        self.request(|reply| Command::Alloc { role, socket, reply }).await?
    }

    pub async fn find(&self, role: &str, socket: NumaSocket) -> LcoreResult<LCore> {
        let role = role.to_string();
        self.request(|reply| Command::Find { role, socket, reply }).await?
    }

    pub async fn free(&self, lc: LCore) -> LcoreResult<()> {
        self.request(|reply| Command::Free { lc, reply }).await
    }

    pub async fn clear(&self) -> LcoreResult<()> {
        self.request(|reply| Command::Clear { reply }).await
    }

    pub async fn reload(&self, config: LCoreAllocConfig) -> LcoreResult<()> {
        self.request(|reply| Command::Reload { config, reply }).await
    }

    pub async fn allocations(&self) -> LcoreResult<Vec<Allocation>> {
        self.request(|reply| Command::Allocations { reply }).await
    }
}
