// ==========================================
// SettingsService 集成测试
// ==========================================
// 测试目标: 请求串行化 / 快照发布 / 错误不改变快照 / 关闭流程
// ==========================================


use image_finder::domain::types::ParamValue;
use image_finder::engine::ConfigError;
use image_finder::store::{ChannelListener, SettingsService, StoreError};
use std::sync::Arc;
use test_helpers::{builtin_registry, scenario_registry, store_for, RecordingListener};

#[tokio::test]
async fn test_requests_are_applied_in_order() {
    let (handle, service) = SettingsService::spawn(store_for(scenario_registry(), "A"), 8);
    let listener = RecordingListener::new();
    handle.add_listener(listener.clone()).await.unwrap();

    let first = handle.set_value("threshold", 0.2).await.unwrap();
    let second = handle.set_value("threshold", 0.4).await.unwrap();
    let third = handle.set_enabled("threshold", false).await.unwrap();

    assert_eq!(first.revision, 1);
    assert_eq!(second.revision, 2);
    assert_eq!(third.revision, 3);
    assert!(!third.contains("threshold"));

    let revisions: Vec<u64> = listener.snapshots().iter().map(|s| s.revision).collect();
    assert_eq!(revisions, vec![1, 2, 3]);

    handle.shutdown().await.unwrap();
    let store = service.await.unwrap();
    assert_eq!(store.current_settings().revision, 3);
}

#[tokio::test]
async fn test_concurrent_handles_are_serialized() {
    let (handle, service) = SettingsService::spawn(store_for(scenario_registry(), "A"), 4);

    let mut tasks = Vec::new();
    for i in 0..10 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            let value = if i % 2 == 0 { "BGR" } else { "BW" };
            handle.set_value("color_space", value).await
        }));
    }
    let mut revisions = Vec::new();
    for task in tasks {
        revisions.push(task.await.unwrap().unwrap().revision);
    }
    revisions.sort_unstable();
    assert_eq!(revisions, (1..=10).collect::<Vec<u64>>());
    assert_eq!(handle.current_settings().revision, 10);

    handle.shutdown().await.unwrap();
    service.await.unwrap();
}

#[tokio::test]
async fn test_snapshot_is_published_to_subscribers() {
    let (handle, service) = SettingsService::spawn(store_for(builtin_registry(), "Brute-Force"), 8);
    let mut receiver = handle.subscribe();
    assert_eq!(receiver.borrow().revision, 0);

    handle.set_value("detector", "SIFT").await.unwrap();
    receiver.changed().await.unwrap();
    let snapshot = receiver.borrow_and_update().clone();
    assert_eq!(snapshot.revision, 1);
    assert_eq!(snapshot.get("detector"), Some(&ParamValue::from("SIFT")));
    assert_eq!(handle.current_settings(), snapshot);

    handle.shutdown().await.unwrap();
    service.await.unwrap();
}

#[tokio::test]
async fn test_rejected_mutation_keeps_snapshot() {
    let (handle, service) = SettingsService::spawn(store_for(scenario_registry(), "A"), 8);
    let before = handle.current_settings();

    let err = handle.set_value("threshold", 3.0).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Config(ConfigError::ValueOutOfRange { .. })
    ));
    let err = handle.select_algorithm("Z").await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Config(ConfigError::UnknownAlgorithm { .. })
    ));

    assert_eq!(handle.current_settings(), before);

    handle.shutdown().await.unwrap();
    let store = service.await.unwrap();
    assert_eq!(store.current_settings().revision, 0);
}

#[tokio::test]
async fn test_requests_after_shutdown_fail() {
    let (handle, service) = SettingsService::spawn(store_for(scenario_registry(), "A"), 8);
    handle.select_algorithm("B").await.unwrap();
    handle.shutdown().await.unwrap();

    let store = service.await.unwrap();
    assert_eq!(store.active_algorithm(), "B");

    assert!(handle.is_closed());
    let err = handle.set_value("color_space", "BW").await.unwrap_err();
    assert!(matches!(err, StoreError::ChannelClosed));
    // 关闭后仍可读取最后的快照
    assert_eq!(handle.current_settings().algorithm, "B");
}

#[tokio::test]
async fn test_channel_listener_receives_snapshots() {
    let (handle, service) = SettingsService::spawn(store_for(scenario_registry(), "A"), 8);
    let (listener, mut receiver) = ChannelListener::new(8);
    handle.add_listener(Arc::new(listener)).await.unwrap();

    handle.select_algorithm("B").await.unwrap();
    handle.set_value("color_space", "BW").await.unwrap();

    let first = receiver.recv().await.unwrap();
    let second = receiver.recv().await.unwrap();
    assert_eq!(first.algorithm, "B");
    assert_eq!(second.get("color_space"), Some(&ParamValue::from("BW")));

    handle.shutdown().await.unwrap();
    drop(service.await.unwrap());
    // 存储 (连同监听者) 释放后通道关闭
    assert!(receiver.recv().await.is_none());
}

#[tokio::test]
async fn test_closure_listener_through_handle() {
    use std::sync::atomic::{AtomicU64, Ordering};

    let (handle, service) = SettingsService::spawn(store_for(scenario_registry(), "A"), 8);
    let last = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&last);
    handle
        .add_change_listener(move |settings: &Arc<image_finder::CurrentSettings>| {
            seen.store(settings.revision, Ordering::SeqCst);
        })
        .await
        .unwrap();

    handle.set_enabled("threshold", false).await.unwrap();
    handle.set_enabled("threshold", true).await.unwrap();
    assert_eq!(last.load(Ordering::SeqCst), 2);

    handle.shutdown().await.unwrap();
    service.await.unwrap();
}
