// ==========================================
// 图像匹配工具 - 命令行入口
// ==========================================
// 用法: image-finder [config.json]
// 流程: 日志 -> 注册表 -> 用户配置填充 -> 设置服务 -> 预览绘图 -> 关闭
// ==========================================

use anyhow::Context;
use image_finder::config::AppConfig;
use image_finder::engine::{build_registry, fill_all};
use image_finder::plugin::{builtin_plugins, Image, PreviewPlotter};
use image_finder::store::{ChannelListener, SettingsService, SettingsStore};
use image_finder::{logging, APP_NAME, VERSION};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} 版本: {}", APP_NAME, VERSION);
    tracing::info!("==================================================");

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_path(&path).with_context(|| format!("无法加载配置: {}", path))?,
        None => {
            tracing::info!("未指定配置文件, 使用默认配置");
            AppConfig::default()
        }
    };

    // 规格缺陷在启动期直接中止
    let registry = match build_registry(builtin_plugins(Arc::new(PreviewPlotter::new()))) {
        Ok(registry) => Arc::new(registry),
        Err(err) => {
            tracing::error!(kind = err.kind(), path = err.path(), "参数规格校验失败: {}", err);
            return Err(err).context("参数规格校验失败");
        }
    };

    let user = config.user_parameters()?;
    let filled = fill_all(&registry, &user).context("用户配置校验失败")?;
    let store = SettingsStore::new(Arc::clone(&registry), filled, &config.initial_algorithm())
        .context("设置存储初始化失败")?;

    let (handle, service) = SettingsService::spawn(store, config.channel_capacity);

    let (listener, mut snapshots) = ChannelListener::new(config.channel_capacity);
    handle.add_listener(Arc::new(listener)).await?;
    let printer = tokio::spawn(async move {
        while let Some(snapshot) = snapshots.recv().await {
            tracing::info!(
                algorithm = %snapshot.algorithm,
                revision = snapshot.revision,
                "当前设置: {}",
                serde_json::to_string(&snapshot.parameters).unwrap_or_default()
            );
        }
    });

    let initial = handle.current_settings();
    tracing::info!(
        algorithm = %initial.algorithm,
        "初始设置: {}",
        serde_json::to_string(&initial.parameters)?
    );

    // 预览绘图在阻塞线程池中执行, 不占用设置任务
    let base = Image::filled(64, 48, [40, 120, 200]);
    let query = Image::filled(16, 16, [200, 40, 40]);
    let plot_registry = Arc::clone(&registry);
    let output = tokio::task::spawn_blocking(move || {
        plot_registry.plot(&initial.algorithm, &base, &query, &initial.flat_parameters())
    })
    .await??;
    for (stage, elapsed) in &output.duration {
        tracing::info!(stage = %stage, elapsed_us = elapsed.as_micros() as u64, "预览绘图");
    }
    tracing::info!(
        width = output.image.width,
        height = output.image.height,
        total_us = output.total_duration().as_micros() as u64,
        "预览绘图完成"
    );

    handle.shutdown().await?;
    drop(handle);
    let store = service.await?;
    drop(store);
    printer.await?;

    tracing::info!("已退出");
    Ok(())
}
