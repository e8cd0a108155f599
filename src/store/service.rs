// ==========================================
// 图像匹配工具 - 设置服务 (并发访问面)
// ==========================================
// 职责: 将 SettingsStore 移入独立的 tokio 任务, 串行处理变更请求
// 写入: 有界 mpsc 通道按提交顺序送达, oneshot 回传结果
// 读取: watch 通道发布不可变快照, 读取方无锁且不会看到中间状态
// ==========================================

use crate::domain::settings::CurrentSettings;
use crate::domain::types::ParamValue;
use crate::engine::error::ConfigError;
use crate::store::error::{StoreError, StoreResult};
use crate::store::listener::SettingsChangeListener;
use crate::store::settings_store::SettingsStore;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

type Reply<T> = oneshot::Sender<T>;
type MutationReply = Reply<Result<Arc<CurrentSettings>, ConfigError>>;

/// 发往设置任务的请求
enum SettingsRequest {
    SelectAlgorithm {
        algorithm: String,
        reply: MutationReply,
    },
    SetValue {
        name: String,
        value: ParamValue,
        reply: MutationReply,
    },
    SetEnabled {
        name: String,
        enabled: bool,
        reply: MutationReply,
    },
    AddListener {
        listener: Arc<dyn SettingsChangeListener>,
        reply: Reply<()>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

// ==========================================
// SettingsService - 设置任务
// ==========================================
pub struct SettingsService;

impl SettingsService {
    /// 启动设置任务
    ///
    /// 全部句柄被丢弃或调用 shutdown 后任务结束, JoinHandle 交回存储本身
    pub fn spawn(store: SettingsStore, capacity: usize) -> (SettingsHandle, JoinHandle<SettingsStore>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(store.current_settings());

        let task = tokio::spawn(run(store, receiver, snapshot_tx));
        let handle = SettingsHandle {
            sender,
            snapshots: snapshot_rx,
        };
        (handle, task)
    }
}

async fn run(
    mut store: SettingsStore,
    mut receiver: mpsc::Receiver<SettingsRequest>,
    snapshots: watch::Sender<Arc<CurrentSettings>>,
) -> SettingsStore {
    tracing::info!(algorithm = store.active_algorithm(), "设置服务启动");

    while let Some(request) = receiver.recv().await {
        match request {
            SettingsRequest::SelectAlgorithm { algorithm, reply } => {
                let result = store.select_algorithm(&algorithm);
                publish(&snapshots, &result);
                let _ = reply.send(result);
            }
            SettingsRequest::SetValue { name, value, reply } => {
                let result = store.set_value(&name, value);
                publish(&snapshots, &result);
                let _ = reply.send(result);
            }
            SettingsRequest::SetEnabled {
                name,
                enabled,
                reply,
            } => {
                let result = store.set_enabled(&name, enabled);
                publish(&snapshots, &result);
                let _ = reply.send(result);
            }
            SettingsRequest::AddListener { listener, reply } => {
                store.add_listener(listener);
                let _ = reply.send(());
            }
            SettingsRequest::Shutdown { reply } => {
                let _ = reply.send(());
                break;
            }
        }
    }

    tracing::info!(
        revision = store.current_settings().revision,
        "设置服务停止"
    );
    store
}

fn publish(
    snapshots: &watch::Sender<Arc<CurrentSettings>>,
    result: &Result<Arc<CurrentSettings>, ConfigError>,
) {
    match result {
        Ok(snapshot) => {
            snapshots.send_replace(Arc::clone(snapshot));
        }
        Err(err) => {
            tracing::warn!(path = %err.path(), error = %err, "设置变更被拒绝");
        }
    }
}

// ==========================================
// SettingsHandle - 设置服务句柄
// ==========================================
#[derive(Clone)]
pub struct SettingsHandle {
    sender: mpsc::Sender<SettingsRequest>,
    snapshots: watch::Receiver<Arc<CurrentSettings>>,
}

impl SettingsHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> SettingsRequest) -> StoreResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| StoreError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StoreError::ChannelClosed)
    }

    pub async fn select_algorithm(&self, algorithm: &str) -> StoreResult<Arc<CurrentSettings>> {
        let algorithm = algorithm.to_string();
        let result = self
            .request(|reply| SettingsRequest::SelectAlgorithm { algorithm, reply })
            .await?;
        Ok(result?)
    }

    pub async fn set_value(
        &self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> StoreResult<Arc<CurrentSettings>> {
        let name = name.to_string();
        let value = value.into();
        let result = self
            .request(|reply| SettingsRequest::SetValue { name, value, reply })
            .await?;
        Ok(result?)
    }

    pub async fn set_enabled(&self, name: &str, enabled: bool) -> StoreResult<Arc<CurrentSettings>> {
        let name = name.to_string();
        let result = self
            .request(|reply| SettingsRequest::SetEnabled {
                name,
                enabled,
                reply,
            })
            .await?;
        Ok(result?)
    }

    pub async fn add_change_listener<F>(&self, listener: F) -> StoreResult<()>
    where
        F: Fn(&Arc<CurrentSettings>) + Send + Sync + 'static,
    {
        self.add_listener(Arc::new(listener)).await
    }

    pub async fn add_listener(&self, listener: Arc<dyn SettingsChangeListener>) -> StoreResult<()> {
        self.request(|reply| SettingsRequest::AddListener { listener, reply })
            .await
    }

    /// 结束设置任务 (已排队的请求先于关闭处理)
    pub async fn shutdown(&self) -> StoreResult<()> {
        self.request(|reply| SettingsRequest::Shutdown { reply }).await
    }

    /// 最近一次提交的快照 (非阻塞)
    pub fn current_settings(&self) -> Arc<CurrentSettings> {
        self.snapshots.borrow().clone()
    }

    /// 快照订阅 (渲染循环轮询或等待 changed)
    pub fn subscribe(&self) -> watch::Receiver<Arc<CurrentSettings>> {
        self.snapshots.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
