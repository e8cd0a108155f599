// ==========================================
// 图像匹配工具 - 设置变更监听
// ==========================================
// 红线: 回调必须非阻塞且不可重入设置存储; 耗时工作转交到其他执行上下文
// ==========================================

use crate::domain::settings::CurrentSettings;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 设置变更监听者
///
/// 每次提交的变更恰好回调一次, 携带完整的 current 快照
pub trait SettingsChangeListener: Send + Sync {
    fn on_change(&self, settings: &Arc<CurrentSettings>);
}

impl<F> SettingsChangeListener for F
where
    F: Fn(&Arc<CurrentSettings>) + Send + Sync,
{
    fn on_change(&self, settings: &Arc<CurrentSettings>) {
        self(settings)
    }
}

/// 转发到有界通道的监听者
///
/// 通道满时丢弃本次快照 (接收方下一次总能拿到更新的完整快照)
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::Sender<Arc<CurrentSettings>>,
}

impl ChannelListener {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Arc<CurrentSettings>>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl SettingsChangeListener for ChannelListener {
    fn on_change(&self, settings: &Arc<CurrentSettings>) {
        match self.sender.try_send(Arc::clone(settings)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(revision = settings.revision, "监听通道已满, 丢弃本次快照");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(revision = settings.revision, "监听通道已关闭");
            }
        }
    }
}
