// ==========================================
// 图像匹配工具 - 领域模型层
// ==========================================
// 职责: 参数类型、规格树、设置快照
// 红线: 不含校验逻辑, 不含状态变更逻辑
// ==========================================

pub mod settings;
pub mod spec;
pub mod types;

// 重导出核心类型
pub use settings::{CurrentSettings, RawSettings};
pub use spec::{
    Branch, CanonicalEntry, CanonicalSpecMap, ConditionalBlock, DeclarationPath, NumericRange,
    ParameterSpec, SpecBlock, SpecBranch, ALGORITHM_KEY, UNCONDITIONAL,
};
pub use types::{ParamType, ParamValue, ParameterMap};
