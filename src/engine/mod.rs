// ==========================================
// 图像匹配工具 - 引擎层
// ==========================================
// 职责: 规格校验 / 注册表汇总 / 默认值填充 / 条件分支解析
// 红线: 引擎均为纯计算, 不持有可变全局状态
// ==========================================

pub mod default_filler;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod spec_validator;

// 重导出核心引擎
pub use default_filler::{check_value, fill_all, DefaultFiller};
pub use error::{ConfigError, ValidationError};
pub use registry::{build_registry, ParameterRegistry, RegistryEntry, SpecAccumulator};
pub use resolver::{ActiveParameter, ActiveParameters, ConditionalResolver};
pub use spec_validator::{check_spec, SpecValidator, ValidationResult};
