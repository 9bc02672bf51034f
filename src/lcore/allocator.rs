// Role-Based LCore Allocator

/*
 * ALPHA SOVEREIGN - ROLE-BASED NUMA-AWARE LCORE ALLOCATOR
 * =================================================================
 * Component Name: src/lcore/allocator.rs
 * Core Responsibility: منح الأنوية الخاملة للأدوار حسب الحجز والحصص ومحلية NUMA (Performance Pillar).
 * Design Pattern: Resource Manager / Predicate Pipeline / Tiered Fallback
 * Forensic Impact: جدول التخصيص هو "سجل الملكية" الوحيد. نواة بمالكين اثنين تعني عاملين يتنافسان على نفس المعالج.
 * =================================================================
 */

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{LCore, LCoreAllocConfig, LCoreProvider, LCoreState, NumaSocket, RoleConfig, MAX_LCORE};
use crate::error::{LcoreError, LcoreResult};
use crate::utils::logger::{log_lcore_allocated, log_lcore_freed};

/// لقطة لنواة واحدة (تُلتقط مرة واحدة لكل قرار).
#[derive(Debug, Clone, Copy)]
struct LCoreInfo {
    lc: LCore,
    state: LCoreState,
    socket: NumaSocket,
}

/// خانة في جدول الملكية. المقبس يُسجل لحظة المنح لأن النواة قد تختفي لاحقاً من الجرد.
#[derive(Debug, Clone)]
struct Grant {
    role: String,
    socket: NumaSocket,
}

/// سطر واحد من تقرير الملكية (للعرض الإداري فقط).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub lc: LCore,
    pub role: String,
}

// =================================================================
// أدوات التصفية (Predicate Combinators)
// =================================================================

fn filter(lcores: &[LCoreInfo], predicates: &[&dyn Fn(&LCoreInfo) -> bool]) -> Vec<LCoreInfo> {
    lcores
        .iter()
        .filter(|info| predicates.iter().all(|pred| pred(*info)))
        .copied()
        .collect()
}

fn invert<'a>(pred: impl Fn(&LCoreInfo) -> bool + 'a) -> impl Fn(&LCoreInfo) -> bool + 'a {
    move |info: &LCoreInfo| !pred(info)
}

fn is_idle(info: &LCoreInfo) -> bool {
    info.state.is_idle()
}

fn on_numa(socket: NumaSocket) -> impl Fn(&LCoreInfo) -> bool {
    move |info: &LCoreInfo| socket.is_any() || info.socket == socket
}

/// `list` مرتبة مسبقاً في RoleConfig.
fn in_list(list: &[LCore]) -> impl Fn(&LCoreInfo) -> bool + '_ {
    move |info: &LCoreInfo| list.binary_search(&info.lc).is_ok()
}

/// تصنيف حسب المقبس. BTreeMap تضمن ترتيباً تصاعدياً للمقابس.
fn classify_by_numa(lcores: &[LCoreInfo]) -> BTreeMap<NumaSocket, Vec<LCoreInfo>> {
    let mut m: BTreeMap<NumaSocket, Vec<LCoreInfo>> = BTreeMap::new();
    for info in lcores {
        m.entry(info.socket).or_default().push(*info);
    }
    m
}

/// أصغر نواة من المجموعة الأكبر. عند التعادل يفوز أول مقبس (الأصغر رقماً).
fn first_of_largest<I>(groups: I) -> Option<LCoreInfo>
where
    I: IntoIterator<Item = Vec<LCoreInfo>>,
{
    let mut candidate = None;
    let mut candidate_rem = 0;
    for group in groups {
        if group.len() > candidate_rem {
            candidate = group.first().copied();
            candidate_rem = group.len();
        }
    }
    candidate
}

// =================================================================
// المخصص (The Allocator)
// =================================================================

/// مخصص الأنوية حسب الأدوار.
///
/// غير متزامن داخلياً: يجب أن يملكه خيط تحكم واحد (انظر `controller`).
pub struct LCoreAllocator<P> {
    provider: P,
    config: LCoreAllocConfig,
    /// جدول الملكية: الفهرس = معرف النواة، القيمة = الدور المالك
    allocated: Box<[Option<Grant>]>,
}

impl<P: LCoreProvider> LCoreAllocator<P> {
    pub fn new(provider: P, config: LCoreAllocConfig) -> Self {
        Self {
            provider,
            config,
            allocated: vec![None; MAX_LCORE].into_boxed_slice(),
        }
    }

    pub fn config(&self) -> &LCoreAllocConfig {
        &self.config
    }

    /// الدور المالك لنواة، إن وجد.
    pub fn owner(&self, lc: LCore) -> Option<&str> {
        lc.index().and_then(|idx| self.allocated[idx].as_ref())
            .map(|grant| grant.role.as_str())
    }

    /// تقرير الملكية الحالي مرتباً حسب النواة.
    pub fn allocations(&self) -> Vec<Allocation> {
        self.allocated
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                slot.as_ref().map(|grant| Allocation { lc: LCore(idx as u32), role: grant.role.clone() })
            })
            .collect()
    }

    fn slot_mut(&mut self, lc: LCore) -> Option<&mut Option<Grant>> {
        lc.index().map(|idx| &mut self.allocated[idx])
    }

    // ----------------------------------------------------------------
    // أدوات تعتمد على الجدول (Table-Bound Predicates)
    // ----------------------------------------------------------------

    fn is_available(&self) -> impl Fn(&LCoreInfo) -> bool + '_ {
        move |info: &LCoreInfo| self.owner(info.lc).is_none() && info.state.is_idle()
    }

    fn allocated_to<'a>(&'a self, role: &'a str) -> impl Fn(&LCoreInfo) -> bool + 'a {
        move |info: &LCoreInfo| self.owner(info.lc) == Some(role)
    }

    /// غير محجوزة لأي دور آخر.
    fn unreserved_by_others<'a>(&'a self, role: &'a str) -> impl Fn(&LCoreInfo) -> bool + 'a {
        move |info: &LCoreInfo| {
            !self
                .config
                .iter()
                .any(|(other, cfg)| other != role && cfg.is_reserved(info.lc))
        }
    }

    /// عدد أنوية الدور على المقبس من الجدول كاملاً، بغض النظر عن حالة التشغيل أو وجودها في اللقطة.
    fn count_allocated(&self, role: &str, socket: NumaSocket) -> usize {
        self.allocated
            .iter()
            .flatten()
            .filter(|grant| grant.role == role && (socket.is_any() || grant.socket == socket))
            .count()
    }

    /// لقطة واحدة من المزود لكل قرار، مرتبة تصاعدياً حسب المعرف.
    fn snapshot(&self) -> Vec<LCoreInfo> {
        let mut lcores: Vec<LCoreInfo> = self
            .provider
            .list_workers()
            .into_iter()
            .filter_map(|lc| {
                if lc.index().is_none() {
                    warn!("LCORE_ALLOC: lcore {} exceeds table capacity {}, ignored", lc, MAX_LCORE);
                    return None;
                }
                Some(LCoreInfo {
                    lc,
                    state: self.provider.state(lc),
                    socket: self.provider.numa_socket(lc),
                })
            })
            .collect();
        lcores.sort_unstable_by_key(|info| info.lc);
        lcores.dedup_by_key(|info| info.lc);
        lcores
    }

    // ----------------------------------------------------------------
    // خوارزمية الاختيار المتدرجة (Tiered Search)
    // ----------------------------------------------------------------

    fn pick(&self, role: &str, socket: NumaSocket) -> Option<LCoreInfo> {
        let lcores = self.snapshot();
        let avails = filter(&lcores, &[&self.is_available()]);
        if avails.is_empty() {
            return None;
        }
        let numa_avails = filter(&avails, &[&on_numa(socket)]);

        // 0. سياسة فارغة: نلبي كل طلب.
        if self.config.is_empty() {
            if !socket.is_any() {
                if let Some(first) = numa_avails.first() {
                    return Some(*first);
                }
            }
            return first_of_largest(classify_by_numa(&avails).into_values());
        }

        let unconfigured = RoleConfig::default();
        let role_cfg = self.config.get(role).unwrap_or(&unconfigured);
        let reserved = in_list(role_cfg.lcores());
        let unreserved = self.unreserved_by_others(role);

        // 1. الأنوية المحجوزة للدور على المقبس المطلوب.
        if let Some(first) = filter(&numa_avails, &[&reserved]).first() {
            return Some(*first);
        }

        // 2. ضمن الحصة على المقبس المطلوب، من أنوية غير محجوزة لغيره.
        let numa_unreserved = filter(&numa_avails, &[&unreserved]);
        if self.count_allocated(role, socket) < role_cfg.limit_on(socket) {
            if let Some(first) = numa_unreserved.first() {
                return Some(*first);
            }
        }

        // 3. الأنوية المحجوزة للدور على مقابس أخرى.
        let remote_avails = filter(&avails, &[&invert(on_numa(socket))]);
        if let Some(first) = filter(&remote_avails, &[&reserved]).first() {
            return Some(*first);
        }

        // 4. ضمن الحصة على مقابس أخرى: المقبس ذو أكبر عدد من الأنوية الحرة.
        let remote_unreserved = filter(&remote_avails, &[&unreserved]);
        let eligible = classify_by_numa(&remote_unreserved)
            .into_iter()
            .filter(|(remote, _)| self.count_allocated(role, *remote) < role_cfg.limit_on(*remote))
            .map(|(_, group)| group);
        first_of_largest(eligible)
    }

    // ----------------------------------------------------------------
    // العمليات العامة (Public Operations)
    // ----------------------------------------------------------------

    /// منح نواة للدور. الفشل (`NoCapacity`) نتيجة عادية لنفاد الموارد.
    pub fn alloc(&mut self, role: &str, socket: NumaSocket) -> LcoreResult<LCore> {
        let Some(picked) = self.pick(role, socket) else {
            debug!("LCORE_ALLOC: no lcore for role={} socket={}", role, socket);
            return Err(LcoreError::NoCapacity { role: role.to_string(), socket });
        };

        let slot = self.slot_mut(picked.lc).ok_or(LcoreError::InvalidLCore(picked.lc))?;
        *slot = Some(Grant { role: role.to_string(), socket: picked.socket });

        log_lcore_allocated(role, socket, picked.lc, picked.socket);
        Ok(picked.lc)
    }

    /// البحث عن نواة خاملة يملكها الدور مسبقاً. لا يغير الجدول.
    pub fn find(&self, role: &str, socket: NumaSocket) -> LcoreResult<LCore> {
        let lcores = self.snapshot();
        let allocated = filter(&lcores, &[&self.allocated_to(role), &is_idle]);
        let numa_allocated = filter(&allocated, &[&on_numa(socket)]);

        numa_allocated
            .first()
            .or_else(|| allocated.first())
            .map(|info| info.lc)
            .ok_or_else(|| LcoreError::NotFound { role: role.to_string(), socket })
    }

    /// تحرير نواة.
    ///
    /// # Panics
    /// عند تحرير نواة غير مملوكة (تحرير مزدوج). هذا خلل في حسابات المستدعي ولا يمكن تجاهله.
    pub fn free(&mut self, lc: LCore) {
        let Some(grant) = self.slot_mut(lc).and_then(Option::take) else {
            panic!("{}", LcoreError::ContractViolation(format!("lcore {} double free", lc)));
        };
        log_lcore_freed(&grant.role, lc, grant.socket);
    }

    /// تحرير كل الأنوية المملوكة.
    pub fn clear(&mut self) {
        let owned: Vec<LCore> = self.allocations().into_iter().map(|a| a.lc).collect();
        for lc in owned {
            self.free(lc);
        }
    }

    /// تحرير الكل ثم استبدال السياسة.
    pub fn reload(&mut self, config: LCoreAllocConfig) {
        self.clear();
        self.config = config;
    }
}
