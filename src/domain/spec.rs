// ==========================================
// 图像匹配工具 - 参数规格模型
// ==========================================
// 职责: 插件提交的原始规格树 (ConditionalBlock/Branch)
//       与校验后的规范化规格 (ParameterSpec/CanonicalSpecMap)
// 说明: 原始规格为 JSON 对象, 由 SpecValidator 转换为强类型
// ==========================================

use crate::domain::types::{ParamType, ParamValue};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// 无条件块的条件变量 (空串)
pub const UNCONDITIONAL: &str = "";

/// 隐式算法选择器
pub const ALGORITHM_KEY: &str = "algorithm";

// ==========================================
// 原始规格树 (插件侧输入)
// ==========================================

/// 条件块的一个分支: 条件值 -> 参数规格列表 (保持声明顺序)
#[derive(Debug, Clone)]
pub struct Branch {
    pub value: ParamValue,
    pub parameters: Vec<(String, Value)>,
}

impl Branch {
    pub fn new(value: impl Into<ParamValue>) -> Self {
        Self {
            value: value.into(),
            parameters: Vec::new(),
        }
    }

    /// 空值分支 (条件变量可空时使用)
    pub fn null() -> Self {
        Self::new(ParamValue::Null)
    }

    /// 追加一个参数规格 (JSON 对象)
    pub fn param(mut self, name: &str, spec: Value) -> Self {
        self.parameters.push((name.to_string(), spec));
        self
    }
}

/// 条件块: 由一个已声明参数的取值选择分支
#[derive(Debug, Clone)]
pub struct ConditionalBlock {
    pub condition_variable: String,
    pub branches: Vec<Branch>,
}

impl ConditionalBlock {
    /// 无条件块, 分支键约定为 "all"
    pub fn unconditional(branch: Branch) -> Self {
        Self {
            condition_variable: UNCONDITIONAL.to_string(),
            branches: vec![branch],
        }
    }

    pub fn conditional(condition_variable: &str, branches: Vec<Branch>) -> Self {
        Self {
            condition_variable: condition_variable.to_string(),
            branches,
        }
    }

    pub fn is_unconditional(&self) -> bool {
        self.condition_variable == UNCONDITIONAL
    }
}

// ==========================================
// 规范化参数规格
// ==========================================

/// 数值范围 (min/max 必须同时出现, step 可选)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericRange {
    pub min: ParamValue,
    pub max: ParamValue,
    pub step: Option<ParamValue>,
}

impl NumericRange {
    /// 闭区间 [min, max] 判定; 类型不一致视为不包含
    pub fn contains(&self, value: &ParamValue) -> bool {
        matches!(
            self.min.numeric_cmp(value),
            Some(Ordering::Less | Ordering::Equal)
        ) && matches!(
            value.numeric_cmp(&self.max),
            Some(Ordering::Less | Ordering::Equal)
        )
    }
}

/// 单个参数的规范化规格
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub param_type: ParamType,
    pub default: ParamValue,
    pub nullable: bool,
    pub options: Option<Vec<ParamValue>>,
    pub range: Option<NumericRange>,
}

impl ParameterSpec {
    /// 开启无值参数时使用的取值: 默认值 > 范围下限 > 第一个选项 > 类型零值
    pub fn fallback_value(&self) -> ParamValue {
        if !self.default.is_null() {
            return self.default.clone();
        }
        if let Some(range) = &self.range {
            return range.min.clone();
        }
        if let Some(first) = self.options.as_ref().and_then(|o| o.first()) {
            return first.clone();
        }
        self.param_type.zero_value()
    }
}

// ==========================================
// 声明路径 (重叠判定依据)
// ==========================================

/// 参数所在的条件块; 同一块的兄弟分支互斥, 因此同块内允许重复声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclarationPath {
    /// 块下标; 隐式选择器为 None
    pub block_index: Option<usize>,
    pub condition_variable: String,
}

impl DeclarationPath {
    pub fn block(block_index: usize, condition_variable: &str) -> Self {
        Self {
            block_index: Some(block_index),
            condition_variable: condition_variable.to_string(),
        }
    }

    /// 隐式算法选择器的路径
    pub fn selector() -> Self {
        Self {
            block_index: None,
            condition_variable: ALGORITHM_KEY.to_string(),
        }
    }
}

impl fmt::Display for DeclarationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block_index {
            Some(index) => write!(f, "[{}][\"{}\"]", index, self.condition_variable),
            None => write!(f, "<{}>", self.condition_variable),
        }
    }
}

// ==========================================
// 校验后的规格树
// ==========================================

#[derive(Debug, Clone, Serialize)]
pub struct SpecBranch {
    pub value: ParamValue,
    pub parameters: Vec<(String, ParameterSpec)>,
}

impl SpecBranch {
    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|(n, _)| n.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecBlock {
    pub condition_variable: String,
    pub branches: Vec<SpecBranch>,
}

impl SpecBlock {
    pub fn is_unconditional(&self) -> bool {
        self.condition_variable == UNCONDITIONAL
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CanonicalEntry {
    pub spec: ParameterSpec,
    pub path: DeclarationPath,
}

/// 规范化规格表
///
/// - blocks: 强类型规格树 (顺序与插件声明一致)
/// - entries: 参数名 -> 最后一次声明的规格与声明路径
#[derive(Debug, Clone, Default, Serialize)]
pub struct CanonicalSpecMap {
    blocks: Vec<SpecBlock>,
    entries: BTreeMap<String, CanonicalEntry>,
}

impl CanonicalSpecMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[SpecBlock] {
        &self.blocks
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.entries.get(name).map(|e| &e.spec)
    }

    pub fn path(&self, name: &str) -> Option<&DeclarationPath> {
        self.entries.get(name).map(|e| &e.path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 是否有后续块以该参数为条件变量
    pub fn is_condition_variable(&self, name: &str) -> bool {
        self.blocks.iter().any(|b| b.condition_variable == name)
    }

    pub(crate) fn insert(&mut self, name: &str, spec: ParameterSpec, path: DeclarationPath) {
        self.entries
            .insert(name.to_string(), CanonicalEntry { spec, path });
    }

    pub(crate) fn push_block(&mut self, block: SpecBlock) {
        self.blocks.push(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_range(min: i64, max: i64) -> NumericRange {
        NumericRange {
            min: ParamValue::Int(min),
            max: ParamValue::Int(max),
            step: Some(ParamValue::Int(1)),
        }
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = int_range(1, 100);
        assert!(range.contains(&ParamValue::Int(1)));
        assert!(range.contains(&ParamValue::Int(100)));
        assert!(!range.contains(&ParamValue::Int(0)));
        assert!(!range.contains(&ParamValue::Float(50.0)));
    }

    #[test]
    fn test_fallback_value_order() {
        let mut spec = ParameterSpec {
            param_type: ParamType::Int,
            default: ParamValue::Null,
            nullable: true,
            options: None,
            range: Some(int_range(5, 10)),
        };
        assert_eq!(spec.fallback_value(), ParamValue::Int(5));

        spec.default = ParamValue::Int(7);
        assert_eq!(spec.fallback_value(), ParamValue::Int(7));

        spec.default = ParamValue::Null;
        spec.range = None;
        assert_eq!(spec.fallback_value(), ParamValue::Int(0));
    }

    #[test]
    fn test_declaration_path_display() {
        assert_eq!(
            DeclarationPath::block(2, "detector").to_string(),
            "[2][\"detector\"]"
        );
        assert_eq!(DeclarationPath::selector().to_string(), "<algorithm>");
    }
}
