/*
 * ALPHA SOVEREIGN - LCORE CORE TYPES
 * =================================================================
 * Component Name: src/lcore/mod.rs
 * Core Responsibility: تعريف أنواع الأنوية المنطقية ومقابس NUMA وواجهة مزود الجرد (Performance Pillar).
 * Design Pattern: Module Facade / Type Definitions
 * Forensic Impact: كل قرار تخصيص يشير إلى LCore و NumaSocket. إذا لم يكن النوع واضحاً هنا، فلن نعرف أين عمل أي خيط.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod allocator;
pub mod config;
pub mod provider;

pub use allocator::{Allocation, LCoreAllocator};
pub use config::{LCoreAllocConfig, RoleConfig};
pub use provider::StaticProvider;

/// سعة جدول التخصيص (تطابق RTE_MAX_LCORE الافتراضي).
pub const MAX_LCORE: usize = 128;

// =================================================================
// أنواع البيانات الأساسية (Fundamental Data Types)
// =================================================================

/// نواة منطقية قابلة للتحكم. المعرف ثابت طوال عمر العملية.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LCore(pub u32);

impl LCore {
    pub fn id(self) -> u32 {
        self.0
    }

    /// موقع النواة في جدول التخصيص، إن كانت ضمن السعة.
    pub fn index(self) -> Option<usize> {
        let idx = self.0 as usize;
        (idx < MAX_LCORE).then_some(idx)
    }
}

impl From<u32> for LCore {
    fn from(id: u32) -> Self {
        LCore(id)
    }
}

impl fmt::Display for LCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// معرف مقبس NUMA. القيمة `ANY` تُستخدم كمدخل بحث فقط، وليست موقعاً فعلياً لأي نواة.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NumaSocket(i32);

impl NumaSocket {
    pub const ANY: NumaSocket = NumaSocket(-1);

    pub const fn new(id: i32) -> Self {
        NumaSocket(id)
    }

    pub fn id(self) -> i32 {
        self.0
    }

    pub fn is_any(self) -> bool {
        self.0 < 0
    }
}

impl Default for NumaSocket {
    fn default() -> Self {
        NumaSocket::ANY
    }
}

impl fmt::Display for NumaSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            f.write_str("any")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// حالة تشغيل النواة كما يبلغ عنها المزود.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LCoreState {
    /// خاملة بانتظار عمل (الحالة الوحيدة المقبولة للتخصيص)
    Wait,
    Running,
    Finished,
}

impl LCoreState {
    pub fn is_idle(self) -> bool {
        self == LCoreState::Wait
    }
}

// =================================================================
// واجهة مزود الجرد (Inventory Provider)
// =================================================================

/// مصدر معلومات الأنوية. المخصص يقرأ منه فقط ولا يغيره أبداً.
///
/// التطبيق الحي هو `hardware::SystemProvider`، والاختبارات تستخدم `StaticProvider`.
pub trait LCoreProvider {
    /// الأنوية المتاحة للتخصيص (باستثناء نواة خيط التحكم).
    fn list_workers(&self) -> Vec<LCore>;

    fn state(&self, lc: LCore) -> LCoreState;

    fn numa_socket(&self, lc: LCore) -> NumaSocket;
}

impl<P: LCoreProvider + ?Sized> LCoreProvider for Arc<P> {
    fn list_workers(&self) -> Vec<LCore> {
        (**self).list_workers()
    }

    fn state(&self, lc: LCore) -> LCoreState {
        (**self).state(lc)
    }

    fn numa_socket(&self, lc: LCore) -> NumaSocket {
        (**self).numa_socket(lc)
    }
}
