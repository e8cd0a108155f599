// ==========================================
// 图像匹配工具 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ValidationError: 插件规格缺陷 (致命, 中止注册表构建)
// ConfigError: 用户配置缺陷 (可恢复, 仅拒绝本次加载/变更)
// 红线: 所有错误必须携带完整路径, 便于定位
// ==========================================

use crate::domain::types::ParamType;
use thiserror::Error;

/// 规格校验错误 (启动期致命)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    // ===== 单个参数规格 =====
    #[error("规格 {path} 含有非法键: \"{key}\"")]
    UnknownSpecKey { path: String, key: String },

    #[error("规格 {path} 缺少合法的 \"type\" (实际: {found})")]
    MissingType { path: String, found: String },

    #[error("规格 {path} 缺少默认值 \"default\"")]
    MissingDefault { path: String },

    #[error("规格 {path} 的 \"{key}\" 格式错误: {reason}")]
    MalformedSpecValue {
        path: String,
        key: String,
        reason: String,
    },

    #[error("规格 {path} 的默认值类型与声明不符: 期望 {expected}, 实际 {found}")]
    InvalidDefaultType {
        path: String,
        expected: ParamType,
        found: String,
    },

    #[error("不可空的 {path} 不能使用 null")]
    NonNullableNullDefault { path: String },

    #[error("含 options 的规格 {path} 不允许出现键 \"{key}\"")]
    OptionsKeyConflict { path: String, key: String },

    #[error("规格 {path} 的默认值 {default} 不在 options 中")]
    DefaultNotInOptions { path: String, default: String },

    #[error("数值规格 {path} 不完整: {reason}")]
    IncompleteRange { path: String, reason: String },

    #[error("数值规格 {path} 的 \"{key}\" 类型与声明不符")]
    RangeTypeMismatch { path: String, key: String },

    #[error("规格 {path} 的默认值 {default} 超出范围")]
    DefaultOutOfRange { path: String, default: String },

    // ===== 条件块 =====
    #[error("条件块 {path} 引用了未声明的参数 \"{variable}\"")]
    UndeclaredConditionVariable { path: String, variable: String },

    #[error("条件块 {path} 的条件值 {value} 类型与声明不符 (期望 {expected})")]
    ConditionValueTypeMismatch {
        path: String,
        value: String,
        expected: ParamType,
    },

    #[error("条件块 {path} 的条件值 {value} 超出声明范围")]
    ConditionValueOutOfRange { path: String, value: String },

    #[error("参数 {path} 与先前声明 {earlier} 重叠")]
    OverlappingDeclaration { path: String, earlier: String },

    #[error("无条件块 {path} 必须恰好有一个分支 (实际 {count} 个)")]
    BranchCountMismatch { path: String, count: usize },

    // ===== 插件 =====
    #[error("{path} 声明的算法与绘图函数不一致: algorithms={declared:?}, plot_functions={plotted:?}")]
    AlgorithmPlotMismatch {
        path: String,
        declared: Vec<String>,
        plotted: Vec<String>,
    },
}

impl ValidationError {
    /// 错误种类名 (日志与测试使用)
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::UnknownSpecKey { .. } => "UnknownSpecKey",
            ValidationError::MissingType { .. } => "MissingType",
            ValidationError::MissingDefault { .. } => "MissingDefault",
            ValidationError::MalformedSpecValue { .. } => "MalformedSpecValue",
            ValidationError::InvalidDefaultType { .. } => "InvalidDefaultType",
            ValidationError::NonNullableNullDefault { .. } => "NonNullableNullDefault",
            ValidationError::OptionsKeyConflict { .. } => "OptionsKeyConflict",
            ValidationError::DefaultNotInOptions { .. } => "DefaultNotInOptions",
            ValidationError::IncompleteRange { .. } => "IncompleteRange",
            ValidationError::RangeTypeMismatch { .. } => "RangeTypeMismatch",
            ValidationError::DefaultOutOfRange { .. } => "DefaultOutOfRange",
            ValidationError::UndeclaredConditionVariable { .. } => "UndeclaredConditionVariable",
            ValidationError::ConditionValueTypeMismatch { .. } => "ConditionValueTypeMismatch",
            ValidationError::ConditionValueOutOfRange { .. } => "ConditionValueOutOfRange",
            ValidationError::OverlappingDeclaration { .. } => "OverlappingDeclaration",
            ValidationError::BranchCountMismatch { .. } => "BranchCountMismatch",
            ValidationError::AlgorithmPlotMismatch { .. } => "AlgorithmPlotMismatch",
        }
    }

    /// 完整诊断路径
    pub fn path(&self) -> &str {
        match self {
            ValidationError::UnknownSpecKey { path, .. }
            | ValidationError::MissingType { path, .. }
            | ValidationError::MissingDefault { path }
            | ValidationError::MalformedSpecValue { path, .. }
            | ValidationError::InvalidDefaultType { path, .. }
            | ValidationError::NonNullableNullDefault { path }
            | ValidationError::OptionsKeyConflict { path, .. }
            | ValidationError::DefaultNotInOptions { path, .. }
            | ValidationError::IncompleteRange { path, .. }
            | ValidationError::RangeTypeMismatch { path, .. }
            | ValidationError::DefaultOutOfRange { path, .. }
            | ValidationError::UndeclaredConditionVariable { path, .. }
            | ValidationError::ConditionValueTypeMismatch { path, .. }
            | ValidationError::ConditionValueOutOfRange { path, .. }
            | ValidationError::OverlappingDeclaration { path, .. }
            | ValidationError::BranchCountMismatch { path, .. }
            | ValidationError::AlgorithmPlotMismatch { path, .. } => path,
        }
    }
}

/// 用户配置错误 (可恢复)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("配置值 \"{algorithm}\".\"{name}\" 不能为 null")]
    NullNotAllowed { algorithm: String, name: String },

    #[error("配置值 \"{algorithm}\".\"{name}\" 类型错误: 期望 {expected}, 实际 {found}")]
    TypeMismatch {
        algorithm: String,
        name: String,
        expected: ParamType,
        found: String,
    },

    #[error("配置值 \"{algorithm}\".\"{name}\" = {value} 不在可选项中")]
    OptionNotAllowed {
        algorithm: String,
        name: String,
        value: String,
    },

    #[error("配置值 \"{algorithm}\".\"{name}\" = {value} 超出范围")]
    ValueOutOfRange {
        algorithm: String,
        name: String,
        value: String,
    },

    #[error("配置值 \"{algorithm}\".\"algorithm\" = {found} 与所属算法不一致")]
    AlgorithmIdentityMismatch { algorithm: String, found: String },

    #[error("未知算法: \"{algorithm}\"")]
    UnknownAlgorithm { algorithm: String },

    #[error("算法 \"{algorithm}\" 未声明参数 \"{name}\"")]
    UnknownParameter { algorithm: String, name: String },
}

impl ConfigError {
    /// 诊断路径: "算法"."参数"
    pub fn path(&self) -> String {
        match self {
            ConfigError::NullNotAllowed { algorithm, name }
            | ConfigError::TypeMismatch { algorithm, name, .. }
            | ConfigError::OptionNotAllowed { algorithm, name, .. }
            | ConfigError::ValueOutOfRange { algorithm, name, .. }
            | ConfigError::UnknownParameter { algorithm, name } => {
                format!("\"{}\".\"{}\"", algorithm, name)
            }
            ConfigError::AlgorithmIdentityMismatch { algorithm, .. } => {
                format!("\"{}\".\"algorithm\"", algorithm)
            }
            ConfigError::UnknownAlgorithm { algorithm } => format!("\"{}\"", algorithm),
        }
    }
}
