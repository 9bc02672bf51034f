// In-Memory Inventory

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{LCore, LCoreProvider, LCoreState, NumaSocket};

/// مزود جرد ثابت في الذاكرة (للاختبارات وقياس الأداء).
/// الحالات قابلة للتغيير من الخارج لمحاكاة بدء/توقف العمال.
#[derive(Debug, Default)]
pub struct StaticProvider {
    sockets: BTreeMap<LCore, NumaSocket>,
    states: RwLock<BTreeMap<LCore, LCoreState>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// إضافة نواة خاملة على مقبس معين.
    pub fn with_lcore(mut self, id: u32, socket: i32) -> Self {
        self.sockets.insert(LCore(id), NumaSocket::new(socket));
        self.states.get_mut().insert(LCore(id), LCoreState::Wait);
        self
    }

    /// توزيع `per_socket` نواة على كل مقبس بالتتابع (0..n على المقبس 0، وهكذا).
    pub fn uniform(n_sockets: u32, per_socket: u32) -> Self {
        let mut provider = Self::new();
        for socket in 0..n_sockets {
            for i in 0..per_socket {
                provider = provider.with_lcore(socket * per_socket + i, socket as i32);
            }
        }
        provider
    }

    pub fn set_state(&self, lc: LCore, state: LCoreState) {
        if let Some(slot) = self.states.write().get_mut(&lc) {
            *slot = state;
        }
    }
}

impl LCoreProvider for StaticProvider {
    fn list_workers(&self) -> Vec<LCore> {
        self.sockets.keys().copied().collect()
    }

    fn state(&self, lc: LCore) -> LCoreState {
        self.states.read().get(&lc).copied().unwrap_or(LCoreState::Finished)
    }

    fn numa_socket(&self, lc: LCore) -> NumaSocket {
        self.sockets.get(&lc).copied().unwrap_or(NumaSocket::ANY)
    }
}
