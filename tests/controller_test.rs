/*
 * ALPHA SOVEREIGN - CONTROLLER ACTOR INTEGRATION TEST
 * =================================================================
 * Component Name: tests/controller_test.rs
 * Core Responsibility: التحقق من أن مهمة التحكم تسلسل القرارات وتعيد تحميل السياسة بشكل صحيح.
 * Design Pattern: Async Integration Testing
 * =================================================================
 */

use std::sync::Arc;

use alpha_lcore::controller;
use alpha_lcore::utils::config_loader::ConfigManager;
use alpha_lcore::{
    LCore, LCoreAllocConfig, LCoreAllocator, LcoreError, NumaSocket, RoleConfig, StaticProvider,
};

fn allocator(config: LCoreAllocConfig) -> LCoreAllocator<Arc<StaticProvider>> {
    LCoreAllocator::new(Arc::new(StaticProvider::uniform(2, 2)), config)
}

#[tokio::test]
async fn test_alloc_find_free_through_actor() {
    let (ctl, actor) = controller::spawn(allocator(LCoreAllocConfig::new()), 8);

    let lc = ctl.alloc("rx", NumaSocket::new(1)).await.unwrap();
    assert_eq!(lc, LCore(2));
    assert_eq!(ctl.find("rx", NumaSocket::new(0)).await.unwrap(), lc);

    let report = ctl.allocations().await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].role, "rx");

    ctl.free(lc).await.unwrap();
    assert!(matches!(
        ctl.find("rx", NumaSocket::ANY).await,
        Err(LcoreError::NotFound { .. })
    ));

    drop(ctl);
    actor.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_callers_never_share_lcores() {
    let (ctl, actor) = controller::spawn(allocator(LCoreAllocConfig::new()), 4);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let ctl = ctl.clone();
        tasks.push(tokio::spawn(async move {
            ctl.alloc(&format!("role{}", i), NumaSocket::ANY).await
        }));
    }

    let mut granted = Vec::new();
    for task in tasks {
        if let Ok(lc) = task.await.unwrap() {
            granted.push(lc);
        }
    }
    granted.sort();
    assert_eq!(granted, vec![LCore(0), LCore(1), LCore(2), LCore(3)]);

    ctl.clear().await.unwrap();
    assert!(ctl.allocations().await.unwrap().is_empty());

    drop(ctl);
    actor.await.unwrap();
}

#[tokio::test]
async fn test_reload_applies_new_policy() {
    let (ctl, _actor) = controller::spawn(allocator(LCoreAllocConfig::new()), 8);
    ctl.alloc("rx", NumaSocket::new(0)).await.unwrap();
    ctl.alloc("tx", NumaSocket::new(0)).await.unwrap();

    let cfg = ConfigManager::load_from_str(
        r#"
        [lcore_alloc.rx]
        lcores = [3]
        "#,
    )
    .unwrap();
    ctl.reload(cfg.lcore_alloc).await.unwrap();

    assert!(ctl.allocations().await.unwrap().is_empty());
    assert_eq!(ctl.alloc("rx", NumaSocket::new(0)).await.unwrap(), LCore(3));
    // tx غير مذكور في السياسة الجديدة
    assert!(ctl.alloc("tx", NumaSocket::new(0)).await.is_err());
}

#[tokio::test]
async fn test_double_free_kills_actor() {
    let mut cfg = LCoreAllocConfig::new();
    cfg.insert("rx".to_string(), RoleConfig::new().with_limit(NumaSocket::ANY, 1));
    let (ctl, actor) = controller::spawn(allocator(cfg), 8);

    let lc = ctl.alloc("rx", NumaSocket::new(0)).await.unwrap();
    ctl.free(lc).await.unwrap();

    assert!(matches!(ctl.free(lc).await, Err(LcoreError::ControllerStopped)));
    assert!(actor.await.unwrap_err().is_panic());
    assert!(matches!(
        ctl.alloc("rx", NumaSocket::new(0)).await,
        Err(LcoreError::ControllerStopped)
    ));
}
