// ==========================================
// 图像匹配工具 - 存储层错误类型
// ==========================================

use crate::engine::error::ConfigError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("设置服务已关闭")]
    ChannelClosed,
}

pub type StoreResult<T> = Result<T, StoreError>;
