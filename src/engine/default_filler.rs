// ==========================================
// 图像匹配工具 - 默认值填充引擎
// ==========================================
// 职责: 按规格树校验用户配置, 并为缺失参数填充默认值
// 输入: 规范化规格表 + 用户提供的部分参数
// 输出: 完整参数表 (覆盖所有分支)
// 红线: 快速失败, 不输出部分结果; 输出必然通过再次校验
// ==========================================

use crate::domain::spec::{CanonicalSpecMap, ParameterSpec, SpecBlock, ALGORITHM_KEY};
use crate::domain::types::{ParamValue, ParameterMap};
use crate::engine::error::ConfigError;
use crate::engine::registry::ParameterRegistry;
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// DefaultFiller - 默认值填充引擎
// ==========================================
pub struct DefaultFiller<'a> {
    algorithm: &'a str,
    specs: &'a CanonicalSpecMap,
}

impl<'a> DefaultFiller<'a> {
    /// # 参数
    /// - algorithm: 规格树所属算法
    /// - specs: 该算法的规范化规格表
    pub fn new(algorithm: &'a str, specs: &'a CanonicalSpecMap) -> Self {
        Self { algorithm, specs }
    }

    /// 填充并校验用户配置
    ///
    /// # 规则
    /// - 无条件块: 唯一分支参与
    /// - algorithm 条件块: 仅与本算法一致的分支参与
    /// - 其他条件块: 全部分支参与 (raw 覆盖未激活分支), 当前激活分支优先
    /// - 同一块内同名参数只处理第一次出现
    /// - 可空参数显式给出 null 时保留 null (表示关闭)
    pub fn fill(&self, raw: &ParameterMap) -> Result<ParameterMap, ConfigError> {
        let mut result = raw.clone();

        for block in self.specs.blocks() {
            let mut seen: BTreeSet<&str> = BTreeSet::new();
            for branch_index in self.contributing_branches(block, &result) {
                let branch = &block.branches[branch_index];
                for (name, spec) in &branch.parameters {
                    if !seen.insert(name.as_str()) {
                        continue;
                    }
                    match result.get(name) {
                        Some(value) => check_value(self.algorithm, name, spec, value)?,
                        None => {
                            if !spec.default.is_null() {
                                result.insert(name.clone(), spec.default.clone());
                            }
                        }
                    }
                }
            }
        }

        match result.get(ALGORITHM_KEY) {
            Some(ParamValue::Str(found)) if found == self.algorithm => {}
            Some(other) => {
                return Err(ConfigError::AlgorithmIdentityMismatch {
                    algorithm: self.algorithm.to_string(),
                    found: other.to_string(),
                })
            }
            None => {}
        }
        result.insert(
            ALGORITHM_KEY.to_string(),
            ParamValue::Str(self.algorithm.to_string()),
        );

        for name in result.keys().filter(|k| !self.specs.contains(k)) {
            tracing::debug!(algorithm = self.algorithm, name = %name, "配置中存在未声明的参数, 原样保留");
        }

        Ok(result)
    }

    /// 参与填充的分支下标: 激活分支在前, 其余按声明顺序
    fn contributing_branches(&self, block: &SpecBlock, result: &ParameterMap) -> Vec<usize> {
        if block.is_unconditional() {
            return (0..block.branches.len()).collect();
        }

        if block.condition_variable == ALGORITHM_KEY {
            let selector = ParamValue::Str(self.algorithm.to_string());
            return block
                .branches
                .iter()
                .position(|b| b.value == selector)
                .into_iter()
                .collect();
        }

        let current = result
            .get(&block.condition_variable)
            .cloned()
            .unwrap_or(ParamValue::Null);
        let active = block.branches.iter().position(|b| b.value == current);

        let mut order: Vec<usize> = active.into_iter().collect();
        order.extend((0..block.branches.len()).filter(|i| Some(*i) != active));
        order
    }
}

// ==========================================
// 单参数校验 (SettingsStore 复用)
// ==========================================

/// 按规格校验单个取值
///
/// # 校验顺序
/// 1. null 仅允许可空参数
/// 2. 类型严格一致
/// 3. 可选项成员
/// 4. 数值范围
pub fn check_value(
    algorithm: &str,
    name: &str,
    spec: &ParameterSpec,
    value: &ParamValue,
) -> Result<(), ConfigError> {
    if value.is_null() {
        if !spec.nullable {
            return Err(ConfigError::NullNotAllowed {
                algorithm: algorithm.to_string(),
                name: name.to_string(),
            });
        }
        return Ok(());
    }

    if value.param_type() != Some(spec.param_type) {
        return Err(ConfigError::TypeMismatch {
            algorithm: algorithm.to_string(),
            name: name.to_string(),
            expected: spec.param_type,
            found: value
                .param_type()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "null".to_string()),
        });
    }

    if let Some(options) = &spec.options {
        if !options.contains(value) {
            return Err(ConfigError::OptionNotAllowed {
                algorithm: algorithm.to_string(),
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    if let Some(range) = &spec.range {
        if !range.contains(value) {
            return Err(ConfigError::ValueOutOfRange {
                algorithm: algorithm.to_string(),
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    Ok(())
}

/// 为注册表中的全部算法填充用户配置
///
/// 用户配置中未出现的算法按空配置填充; 出现未知算法时报错
pub fn fill_all(
    registry: &ParameterRegistry,
    user: &BTreeMap<String, ParameterMap>,
) -> Result<BTreeMap<String, ParameterMap>, ConfigError> {
    if let Some(unknown) = user.keys().find(|a| registry.entry(a).is_none()) {
        return Err(ConfigError::UnknownAlgorithm {
            algorithm: unknown.clone(),
        });
    }

    let empty = ParameterMap::new();
    let mut filled = BTreeMap::new();
    for entry in registry.entries() {
        let raw = user.get(&entry.algorithm).unwrap_or(&empty);
        let values = DefaultFiller::new(&entry.algorithm, &entry.specs).fill(raw)?;
        filled.insert(entry.algorithm.clone(), values);
    }

    tracing::info!(algorithms = filled.len(), "用户配置填充完成");
    Ok(filled)
}
