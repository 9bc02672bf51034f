// Hot-Reload Config

/*
 * ALPHA SOVEREIGN - HOT-RELOAD CONFIGURATION MANAGER
 * =================================================================
 * Component Name: src/utils/config_loader.rs
 * Core Responsibility: تحميل ومراقبة وتحديث سياسة تخصيص الأنوية دون توقف (Adaptability Pillar).
 * Design Pattern: Observer / Atomic Reference Swap
 * Forensic Impact: يسجل بدقة متى تم تغيير السياسة. كل إعادة تحميل تعني تحرير كل الأنوية وإعادة توزيعها.
 * =================================================================
 */

use config::{Config, Environment, File, FileFormat};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::{LcoreError, LcoreResult};
use crate::lcore::{LCore, LCoreAllocConfig, NumaSocket};

// =================================================================
// تعريفات هيكل الإعدادات (Configuration Schema)
// =================================================================

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
    /// السياسة: فارغة = وضع غير مقيد
    #[serde(default)]
    pub lcore_alloc: LCoreAllocConfig,
    /// الأدوار التي تُمنح أنويتها عند الإقلاع
    #[serde(default)]
    pub startup: Vec<StartupRequest>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub dir: String,
    pub file: String,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "./logs".to_string(),
            file: "lcore_ctl.log".to_string(),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HardwareConfig {
    /// نواة خيط التحكم (مستبعدة من التخصيص)
    #[serde(default)]
    pub main_lcore: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StartupRequest {
    pub role: String,
    #[serde(default = "any_socket")]
    pub socket: i32,
}

fn any_socket() -> i32 {
    NumaSocket::ANY.id()
}

impl StartupRequest {
    pub fn socket(&self) -> NumaSocket {
        NumaSocket::new(self.socket)
    }
}

impl EngineConfig {
    /// فحوصات لا يستطيع serde التعبير عنها.
    pub fn validate(&self) -> LcoreResult<()> {
        let mut owners: BTreeMap<LCore, &str> = BTreeMap::new();
        for (role, cfg) in &self.lcore_alloc {
            for lc in cfg.lcores() {
                if lc.index().is_none() {
                    return Err(LcoreError::ConfigMissing(format!(
                        "role '{}' reserves lcore {} beyond table capacity",
                        role, lc
                    )));
                }
                if *lc == LCore(self.hardware.main_lcore) {
                    return Err(LcoreError::ConfigMissing(format!(
                        "role '{}' reserves the main lcore {}",
                        role, lc
                    )));
                }
                if let Some(other) = owners.insert(*lc, role) {
                    return Err(LcoreError::ConfigMissing(format!(
                        "lcore {} reserved by both '{}' and '{}'",
                        lc, other, role
                    )));
                }
            }
        }
        Ok(())
    }
}

// =================================================================
// مدير الإعدادات (Configuration Manager)
// =================================================================

pub struct ConfigManager {
    file_path: PathBuf,
    /// watch channel تحتفظ دائماً بآخر نسخة
    notifier: watch::Sender<EngineConfig>,
    current_config: Arc<RwLock<EngineConfig>>,
}

impl ConfigManager {
    /// تحميل الإعدادات لأول مرة وإنشاء المدير
    pub fn new(path: &str) -> LcoreResult<(Self, watch::Receiver<EngineConfig>)> {
        let path_buf = PathBuf::from(path);

        // التحميل الأولي يجب أن ينجح وإلا يفشل الإقلاع
        let initial_config = Self::load_from_disk(&path_buf)?;

        info!("CONFIG: Initial configuration loaded ({} roles).", initial_config.lcore_alloc.len());

        let (tx, rx) = watch::channel(initial_config.clone());

        Ok((
            Self {
                file_path: path_buf,
                notifier: tx,
                current_config: Arc::new(RwLock::new(initial_config)),
            },
            rx,
        ))
    }

    /// متغيرات البيئة LCORE__* تتغلب على الملف.
    fn load_from_disk(path: &Path) -> LcoreResult<EngineConfig> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(Environment::with_prefix("LCORE").separator("__"))
            .build()
            .map_err(|e| LcoreError::ConfigMissing(format!("Build Error: {}", e)))?;

        Self::finish(settings)
    }

    /// تحميل من نص TOML مباشرة.
    pub fn load_from_str(toml: &str) -> LcoreResult<EngineConfig> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| LcoreError::ConfigMissing(format!("Build Error: {}", e)))?;

        Self::finish(settings)
    }

    fn finish(settings: Config) -> LcoreResult<EngineConfig> {
        let cfg = settings
            .try_deserialize::<EngineConfig>()
            .map_err(|e| LcoreError::ConfigMissing(format!("Parse Error: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// بدء مراقبة الملف للتغييرات (Background Watcher)
    pub async fn start_watcher(self: Arc<Self>) {
        let path = self.file_path.clone();
        let manager = self.clone();

        tokio::spawn(async move {
            let (tx, mut rx) = tokio::sync::mpsc::channel(1);

            let mut watcher = match RecommendedWatcher::new(
                move |res| {
                    let _ = tx.blocking_send(res);
                },
                NotifyConfig::default(),
            ) {
                Ok(w) => w,
                Err(e) => {
                    error!("CONFIG_WATCHER: Failed to create watcher: {}", e);
                    return;
                }
            };

            if let Err(e) = watcher.watch(&path, RecursiveMode::NonRecursive) {
                error!("CONFIG_WATCHER: Failed to watch file: {}", e);
                return;
            }

            info!("CONFIG_WATCHER: Active on {:?}", path);

            while let Some(res) = rx.recv().await {
                match res {
                    Ok(_) => {
                        // بعض المحررات تكتب الملف مرتين
                        tokio::time::sleep(Duration::from_millis(100)).await;

                        info!("CONFIG_WATCHER: Change detected. Reloading...");

                        match Self::load_from_disk(&path) {
                            Ok(new_config) => {
                                *manager.current_config.write() = new_config.clone();

                                if let Err(e) = manager.notifier.send(new_config) {
                                    error!("CONFIG_WATCHER: Failed to broadcast update: {}", e);
                                } else {
                                    info!("CONFIG_WATCHER: Hot-Reload Successful. New policy applied.");
                                }
                            }
                            Err(e) => {
                                // ملف فاسد: نحتفظ بالقديم
                                warn!("CONFIG_WATCHER: Reload Failed (Invalid Config): {}. Keeping old config.", e);
                            }
                        }
                    }
                    Err(e) => error!("CONFIG_WATCHER: Watch error: {}", e),
                }
            }
        });
    }

    /// الحصول على لقطة من الإعدادات الحالية
    pub fn get_current(&self) -> EngineConfig {
        self.current_config.read().clone()
    }
}
