// ==========================================
// 图像匹配工具 - 核心库
// ==========================================
// 职责: 插件参数规格校验 / 用户配置填充 / 响应式设置存储
// 不含: 匹配计算本身、界面渲染、配置持久化
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 参数值、规格与设置模型
pub mod domain;

// 引擎层 - 校验 / 汇总 / 填充 / 解析
pub mod engine;

// 插件层 - 插件契约与内置插件
pub mod plugin;

// 存储层 - 设置状态与并发访问面
pub mod store;

// 配置层 - 用户配置文件
pub mod config;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    CurrentSettings, ParamType, ParamValue, ParameterMap, ParameterSpec, RawSettings,
};

pub use engine::{
    build_registry, fill_all, ConditionalResolver, ConfigError, DefaultFiller, ParameterRegistry,
    SpecValidator, ValidationError,
};

pub use plugin::{builtin_plugins, Algorithm, AlgorithmPlotter, Image, PluginSpec, PlotOutput};

pub use store::{SettingsHandle, SettingsService, SettingsStore, StoreError};

pub use config::AppConfig;

// ==========================================
// 常量定义
// ==========================================

// 版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 名称
pub const APP_NAME: &str = "图像匹配工具";
