/*
 * ALPHA SOVEREIGN - LCORE CONTROL DAEMON ENTRY POINT
 * =================================================================
 * Component: src/main.rs
 * Responsibility: تحميل السياسة، منح الأنوية لأدوار الإقلاع، تشغيل العمال المثبتين، وإعادة التحميل عند تغيير الملف.
 * Status: LIVE OPERATION
 * =================================================================
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use alpha_lcore::controller;
use alpha_lcore::hardware::{self, LCoreLauncher, NumaTopology, SystemProvider};
use alpha_lcore::utils::config_loader::{ConfigManager, StartupRequest};
use alpha_lcore::utils::logger::init_logger;
use alpha_lcore::{AllocController, LCore, LCoreAllocator};

/// العمال الحاليون وعلم الإيقاف المشترك بينهم.
struct RunningPlan {
    stop: Arc<AtomicBool>,
    lcores: Vec<LCore>,
}

/// حلقة عامل خامل: يحجز النواة حتى يُطلب منه التوقف.
fn park_until_stopped(stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        std::thread::park_timeout(Duration::from_millis(100));
    }
}

async fn start_plan(
    controller: &AllocController,
    launcher: &Arc<LCoreLauncher>,
    startup: &[StartupRequest],
) -> anyhow::Result<RunningPlan> {
    let stop = Arc::new(AtomicBool::new(false));
    let mut lcores = Vec::with_capacity(startup.len());

    for req in startup {
        let lc = match controller.alloc(&req.role, req.socket()).await {
            Ok(lc) => lc,
            Err(e) => {
                warn!("STARTUP: {}", e);
                continue;
            }
        };

        let flag = stop.clone();
        match launcher.launch(lc, &req.role, move || park_until_stopped(flag)) {
            Ok(()) => lcores.push(lc),
            Err(e) => {
                error!("STARTUP: Failed to launch role '{}' on lcore {}: {}", req.role, lc, e);
                controller.free(lc).await?;
            }
        }
    }

    Ok(RunningPlan { stop, lcores })
}

async fn stop_plan(plan: RunningPlan, launcher: &Arc<LCoreLauncher>) {
    plan.stop.store(true, Ordering::SeqCst);
    for lc in plan.lcores {
        let launcher = launcher.clone();
        match tokio::task::spawn_blocking(move || launcher.wait(lc)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("SHUTDOWN: {}", e),
            Err(e) => error!("SHUTDOWN: join error on lcore {}: {}", lc, e),
        }
    }
}

// خيط واحد لكل مستوى التحكم: المهمة المالكة للمخصص تعمل على الخيط المثبت نفسه.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("LCORE_CONFIG").unwrap_or_else(|_| "config/lcore.toml".to_string());

    // أ. الإعدادات أولاً (تحدد مكان السجلات)
    let (manager, mut config_rx) = ConfigManager::new(&config_path)?;
    let cfg = manager.get_current();

    let _guard = init_logger(&cfg.logging.dir, &cfg.logging.file, &cfg.logging.level);
    info!("LCORE_CTL: Boot sequence initiated (config: {})", config_path);

    // ب. تثبيت خيط التحكم (ومعه كل مهام وقت التشغيل) على النواة الرئيسية
    let main_lcore = LCore(cfg.hardware.main_lcore);
    if let Err(e) = hardware::apply_affinity(main_lcore) {
        warn!("Failed to pin control thread to lcore {}: {}. Running unpinned.", main_lcore, e);
    }

    // ج. الجرد الحي والمخصص
    let provider = SystemProvider::new(NumaTopology::detect(), main_lcore, Arc::new(LCoreLauncher::new()))?;
    let launcher = provider.launcher().clone();
    let allocator = LCoreAllocator::new(provider, cfg.lcore_alloc.clone());
    let (alloc_ctl, actor) = controller::spawn(allocator, 64);

    // د. أدوار الإقلاع
    let mut plan = start_plan(&alloc_ctl, &launcher, &cfg.startup).await?;
    println!("{}", serde_json::to_string_pretty(&alloc_ctl.allocations().await?)?);

    // هـ. مراقبة الملف
    Arc::new(manager).start_watcher().await;

    loop {
        tokio::select! {
            changed = config_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let new_cfg = config_rx.borrow_and_update().clone();
                stop_plan(plan, &launcher).await;
                alloc_ctl.reload(new_cfg.lcore_alloc).await?;
                plan = start_plan(&alloc_ctl, &launcher, &new_cfg.startup).await?;
                println!("{}", serde_json::to_string_pretty(&alloc_ctl.allocations().await?)?);
            }
            res = signal::ctrl_c() => {
                match res {
                    Ok(()) => warn!("SHUTDOWN SIGNAL RECEIVED: Releasing all lcores..."),
                    Err(err) => error!("Unable to listen for shutdown signal: {}", err),
                }
                break;
            }
        }
    }

    stop_plan(plan, &launcher).await;
    alloc_ctl.clear().await?;
    drop(alloc_ctl);
    actor.await?;

    info!("LCORE_CTL: Shutdown Complete.");
    Ok(())
}
