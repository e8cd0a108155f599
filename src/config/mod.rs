// ==========================================
// 图像匹配工具 - 配置层
// ==========================================
// 职责: 用户配置文件的读取与结构解析
// 来源: JSON 文件 (serde_json)
// ==========================================

pub mod app_config;

pub use app_config::{
    AppConfig, ConfigLoadError, DEFAULT_CHANNEL_CAPACITY, DEFAULT_INITIAL_ALGORITHM,
};
