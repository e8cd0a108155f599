// ==========================================
// 图像匹配工具 - 设置存储层
// ==========================================
// 职责: 可变设置状态的唯一持有者, 对外提供快照读取与串行变更
// ==========================================

pub mod error;
pub mod listener;
pub mod service;
pub mod settings_store;

pub use error::{StoreError, StoreResult};
pub use listener::{ChannelListener, SettingsChangeListener};
pub use service::{SettingsHandle, SettingsService};
pub use settings_store::SettingsStore;
