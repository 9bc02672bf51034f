/*
 * ALPHA SOVEREIGN - SHIPPED POLICY FILE TEST
 * =================================================================
 * Component Name: tests/config_test.rs
 * Core Responsibility: التأكد من أن ملف السياسة المرفق صالح ويعطي التوزيع المتوقع على جهاز بمقبسين.
 * =================================================================
 */

use std::sync::Arc;

use alpha_lcore::utils::config_loader::ConfigManager;
use alpha_lcore::{LCore, LCoreAllocator, NumaSocket, StaticProvider};

#[test]
fn test_shipped_policy_on_two_sockets() {
    let (manager, rx) = ConfigManager::new("config/lcore.toml").expect("shipped config must load");
    let cfg = manager.get_current();
    assert_eq!(rx.borrow().lcore_alloc.len(), 3);
    assert_eq!(cfg.hardware.main_lcore, 0);

    // النواة 0 للتحكم، 1-3 على المقبس 0، 4-7 على المقبس 1
    let provider = Arc::new(
        StaticProvider::new()
            .with_lcore(1, 0)
            .with_lcore(2, 0)
            .with_lcore(3, 0)
            .with_lcore(4, 1)
            .with_lcore(5, 1)
            .with_lcore(6, 1)
            .with_lcore(7, 1),
    );
    let mut la = LCoreAllocator::new(provider, cfg.lcore_alloc.clone());

    let granted: Vec<LCore> = cfg
        .startup
        .iter()
        .map(|req| la.alloc(&req.role, req.socket()).unwrap())
        .collect();

    // rx -> النواة المحجوزة 1، tx -> 2 (حصة المقبس 0)
    // worker بمقبس ANY يُقاس بالمدخل العام (1) على كل المقابس
    assert_eq!(granted, vec![LCore(1), LCore(2), LCore(3)]);

    // tx استنفد حصته على المقبس 0 فينتقل إلى المقبس 1
    assert_eq!(la.alloc("tx", NumaSocket::new(0)).unwrap(), LCore(4));
}

#[test]
fn test_missing_file_fails_boot() {
    assert!(ConfigManager::new("config/does_not_exist.toml").is_err());
}
