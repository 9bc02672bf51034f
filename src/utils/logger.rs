// Non-blocking Logger & Audit Events

/*
 * ALPHA SOVEREIGN - NON-BLOCKING ASYNC LOGGER
 * =================================================================
 * Component Name: src/utils/logger.rs
 * Core Responsibility:
 * 1. تسجيل الأحداث محلياً دون تعطيل خيط التحكم (Performance Pillar).
 * 2. أحداث تدقيق مهيكلة لكل منح وتحرير للأنوية (Explainability Pillar).
 * Design Pattern: Async Appender / Structured Events
 * =================================================================
 */

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::lcore::{LCore, NumaSocket};

// =================================================================
// 1. نظام التسجيل غير المتزامن (Async Tracing System)
// =================================================================

/// تهيئة نظام التسجيل العالمي.
/// يجب استدعاء هذه الدالة مرة واحدة فقط في `main.rs`.
/// تعيد `WorkerGuard` الذي يجب الاحتفاظ به حياً حتى نهاية البرنامج.
pub fn init_logger(log_dir: &str, file_name: &str, level: &str) -> WorkerGuard {
    // ملف جديد كل يوم
    let file_appender = tracing_appender::rolling::daily(log_dir, file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true) // الهدف LCORE_AUDIT يميز أحداث الملكية
        .with_ansi(false)
        .compact();

    // نسخة مختصرة على الطرفية للمشغل
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!("LOGGER: Initialized non-blocking logging system at {}/{}", log_dir, file_name);

    guard
}

// =================================================================
// 2. أحداث التدقيق المهيكلة (Structured Audit Events)
// =================================================================

/// تسجيل منح نواة لدور.
pub fn log_lcore_allocated(role: &str, socket: NumaSocket, lc: LCore, lc_socket: NumaSocket) {
    tracing::info!(
        target: "LCORE_AUDIT",
        role = role,
        socket = %socket,
        lc = lc.id(),
        lc_socket = %lc_socket,
        "lcore allocated"
    );
}

/// تسجيل تحرير نواة.
pub fn log_lcore_freed(role: &str, lc: LCore, socket: NumaSocket) {
    tracing::info!(
        target: "LCORE_AUDIT",
        role = role,
        lc = lc.id(),
        socket = %socket,
        "lcore freed"
    );
}
