// ==========================================
// 图像匹配工具 - 内置插件
// ==========================================

pub mod color_space;
pub mod feature_matching;
pub mod template_matching;

pub use color_space::ColorSpace;
pub use feature_matching::{Detector, MatchFilter, MatchingMethod, NormType};
pub use template_matching::{FilterBy, TemplateMethod};
