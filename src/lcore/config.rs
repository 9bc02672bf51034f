// Role Policy

/*
 * ALPHA SOVEREIGN - LCORE ALLOCATION POLICY
 * =================================================================
 * Component Name: src/lcore/config.rs
 * Core Responsibility: سياسة الحجز لكل دور: قائمة أنوية محجوزة وحصص لكل مقبس NUMA (Adaptability Pillar).
 * Design Pattern: Value Object / Validated Deserialization
 * Forensic Impact: السياسة هي "العقد" بين المشغل والمخصص. أي نواة مُنحت خارج هذه القواعد تعني خللاً في المنطق.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{LCore, NumaSocket};

/// مفاتيح الحصة العامة المقبولة في ملف الإعدادات.
const WILDCARD_KEYS: [&str; 3] = ["*", "any", "-1"];

/// إعدادات دور واحد.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRoleConfig", into = "RawRoleConfig")]
pub struct RoleConfig {
    /// الأنوية المحجوزة حصرياً لهذا الدور (مرتبة)
    lcores: Vec<LCore>,
    /// الحد الأقصى لعدد الأنوية لكل مقبس. المفتاح `ANY` هو القيمة الافتراضية.
    per_numa: BTreeMap<NumaSocket, usize>,
}

impl RoleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lcores<I: IntoIterator<Item = u32>>(mut self, lcores: I) -> Self {
        self.lcores.extend(lcores.into_iter().map(LCore));
        self.lcores.sort_unstable();
        self.lcores.dedup();
        self
    }

    pub fn with_limit(mut self, socket: NumaSocket, limit: usize) -> Self {
        let key = if socket.is_any() { NumaSocket::ANY } else { socket };
        self.per_numa.insert(key, limit);
        self
    }

    /// الأنوية المحجوزة، مرتبة تصاعدياً.
    pub fn lcores(&self) -> &[LCore] {
        &self.lcores
    }

    pub fn is_reserved(&self, lc: LCore) -> bool {
        self.lcores.binary_search(&lc).is_ok()
    }

    /// الحصة على مقبس معين: المدخل الصريح، وإلا المدخل العام، وإلا صفر.
    pub fn limit_on(&self, socket: NumaSocket) -> usize {
        let key = if socket.is_any() { NumaSocket::ANY } else { socket };
        self.per_numa
            .get(&key)
            .or_else(|| self.per_numa.get(&NumaSocket::ANY))
            .copied()
            .unwrap_or(0)
    }
}

/// سياسة التخصيص الكاملة: اسم الدور -> إعداداته.
/// نستخدم BTreeMap لضمان ترتيب تكرار ثابت.
pub type LCoreAllocConfig = BTreeMap<String, RoleConfig>;

// =================================================================
// الشكل الخام في ملف TOML (Raw File Shape)
// =================================================================
// مفاتيح الجداول في TOML نصوص دائماً، لذلك نحلل أرقام المقابس يدوياً.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawRoleConfig {
    #[serde(default)]
    lcores: Vec<u32>,
    #[serde(default)]
    per_numa: BTreeMap<String, usize>,
}

impl TryFrom<RawRoleConfig> for RoleConfig {
    type Error = String;

    fn try_from(raw: RawRoleConfig) -> Result<Self, Self::Error> {
        let mut cfg = RoleConfig::new().with_lcores(raw.lcores);
        for (key, limit) in raw.per_numa {
            let key = key.trim();
            let socket = if WILDCARD_KEYS.contains(&key) {
                NumaSocket::ANY
            } else {
                let id: i32 = key
                    .parse()
                    .map_err(|_| format!("invalid NUMA socket key '{}' in per_numa", key))?;
                if id < 0 {
                    return Err(format!("negative NUMA socket key '{}' in per_numa", key));
                }
                NumaSocket::new(id)
            };
            cfg = cfg.with_limit(socket, limit);
        }
        Ok(cfg)
    }
}

impl From<RoleConfig> for RawRoleConfig {
    fn from(cfg: RoleConfig) -> Self {
        Self {
            lcores: cfg.lcores.iter().map(|lc| lc.id()).collect(),
            per_numa: cfg
                .per_numa
                .iter()
                .map(|(socket, limit)| (socket.id().to_string(), *limit))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_fallback_to_wildcard() {
        let cfg = RoleConfig::new()
            .with_limit(NumaSocket::new(0), 3)
            .with_limit(NumaSocket::ANY, 1);

        assert_eq!(cfg.limit_on(NumaSocket::new(0)), 3);
        assert_eq!(cfg.limit_on(NumaSocket::new(1)), 1);
        assert_eq!(cfg.limit_on(NumaSocket::ANY), 1);
    }

    #[test]
    fn test_missing_wildcard_means_zero() {
        let cfg = RoleConfig::new().with_limit(NumaSocket::new(1), 2);
        assert_eq!(cfg.limit_on(NumaSocket::new(0)), 0);
        assert_eq!(RoleConfig::new().limit_on(NumaSocket::new(0)), 0);
    }

    #[test]
    fn test_reserved_list_sorted() {
        let cfg = RoleConfig::new().with_lcores([9, 2, 5, 2]);
        assert_eq!(cfg.lcores(), &[LCore(2), LCore(5), LCore(9)]);
        assert!(cfg.is_reserved(LCore(5)));
        assert!(!cfg.is_reserved(LCore(4)));
    }

    #[test]
    fn test_parse_raw_keys() {
        let raw = RawRoleConfig {
            lcores: vec![4],
            per_numa: [("0".to_string(), 2), ("*".to_string(), 1)].into_iter().collect(),
        };
        let cfg = RoleConfig::try_from(raw).unwrap();
        assert_eq!(cfg.limit_on(NumaSocket::new(0)), 2);
        assert_eq!(cfg.limit_on(NumaSocket::new(7)), 1);

        let bad = RawRoleConfig {
            lcores: vec![],
            per_numa: [("node0".to_string(), 2)].into_iter().collect(),
        };
        assert!(RoleConfig::try_from(bad).is_err());
    }
}
