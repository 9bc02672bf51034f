// ALPHA SOVEREIGN - LCORE ALLOCATOR ROOT LIBRARY
// Status: PRODUCTION

// 1. تعريف الوحدات (Modules)
pub mod error;
pub mod utils;
pub mod lcore;
pub mod hardware;
pub mod controller;

// 2. التصدير العام (Re-exports)
pub use error::{LcoreError, LcoreResult};
pub use lcore::{
    Allocation, LCore, LCoreAllocConfig, LCoreAllocator, LCoreProvider, LCoreState, NumaSocket,
    RoleConfig, StaticProvider, MAX_LCORE,
};
pub use controller::AllocController;
pub use utils::logger::init_logger;

pub mod prelude {
    pub use crate::LcoreError;
    pub use crate::{LCore, LCoreAllocConfig, LCoreAllocator, LCoreProvider, NumaSocket, RoleConfig};
}
