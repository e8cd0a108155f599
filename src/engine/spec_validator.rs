// ==========================================
// 图像匹配工具 - 规格校验引擎
// ==========================================
// 职责: 校验单个插件的条件规格树是否自洽
// 输入: 原始规格树 (JSON 规格)
// 输出: CanonicalSpecMap (强类型规格树 + 参数名索引)
// 红线: 按 块/分支/键 顺序报告第一个违规, 结果可复现
// ==========================================

use crate::domain::spec::{
    CanonicalSpecMap, ConditionalBlock, DeclarationPath, NumericRange, ParameterSpec, SpecBlock,
    SpecBranch, ALGORITHM_KEY,
};
use crate::domain::types::{ParamType, ParamValue};
use crate::engine::error::ValidationError;
use serde_json::{Map, Value};

/// 参数规格允许的全部键
pub const ALL_VALID_SPEC_KEYS: [&str; 7] =
    ["default", "max", "min", "nullable", "options", "step", "type"];

/// 含 options 时允许的键
pub const OPTIONS_VALID_SPEC_KEYS: [&str; 4] = ["default", "nullable", "options", "type"];

pub type ValidationResult<T> = Result<T, ValidationError>;

// ==========================================
// SpecValidator - 规格校验引擎
// ==========================================
pub struct SpecValidator<'a> {
    plugin: &'a str,
    algorithms: &'a [String],
}

impl<'a> SpecValidator<'a> {
    /// # 参数
    /// - plugin: 插件名 (诊断路径前缀)
    /// - algorithms: 插件声明的算法, 作为隐式选择器的可选项
    pub fn new(plugin: &'a str, algorithms: &'a [String]) -> Self {
        Self { plugin, algorithms }
    }

    /// 校验规格树
    ///
    /// 纯函数, 无副作用; 遇到第一个违规即返回
    pub fn validate(&self, blocks: &[ConditionalBlock]) -> ValidationResult<CanonicalSpecMap> {
        let mut collector = CanonicalSpecMap::new();
        collector.insert(
            ALGORITHM_KEY,
            self.selector_spec(),
            DeclarationPath::selector(),
        );

        let root = format!("{}.PARAMETER_SPECS[\"parameters\"]", self.plugin);
        for (index, block) in blocks.iter().enumerate() {
            let block_path = format!("{}[{}]", root, index);
            let spec_block = self.check_block(&block_path, index, block, &mut collector)?;
            collector.push_block(spec_block);
        }

        tracing::debug!(
            plugin = self.plugin,
            blocks = blocks.len(),
            parameters = collector.len(),
            "规格树校验通过"
        );
        Ok(collector)
    }

    /// 隐式算法选择器: str 类型, 可选项为插件声明的算法
    fn selector_spec(&self) -> ParameterSpec {
        let options: Vec<ParamValue> = self
            .algorithms
            .iter()
            .map(|a| ParamValue::Str(a.clone()))
            .collect();
        ParameterSpec {
            param_type: ParamType::Str,
            default: options.first().cloned().unwrap_or(ParamValue::Null),
            nullable: false,
            options: Some(options),
            range: None,
        }
    }

    fn check_block(
        &self,
        block_path: &str,
        index: usize,
        block: &ConditionalBlock,
        collector: &mut CanonicalSpecMap,
    ) -> ValidationResult<SpecBlock> {
        let variable = block.condition_variable.as_str();

        let condition_spec = if block.is_unconditional() {
            if block.branches.len() != 1 {
                return Err(ValidationError::BranchCountMismatch {
                    path: block_path.to_string(),
                    count: block.branches.len(),
                });
            }
            None
        } else {
            match collector.get(variable) {
                Some(spec) => Some(spec.clone()),
                None => {
                    return Err(ValidationError::UndeclaredConditionVariable {
                        path: block_path.to_string(),
                        variable: variable.to_string(),
                    })
                }
            }
        };

        let declaration = DeclarationPath::block(index, variable);
        let variable_path = format!("{}[\"{}\"]", block_path, variable);
        let mut branches = Vec::with_capacity(block.branches.len());

        for branch in &block.branches {
            if let Some(condition_spec) = &condition_spec {
                check_condition_value(&variable_path, &branch.value, condition_spec)?;
            }

            let branch_path = format!("{}[{}]", variable_path, branch.value.path_key());
            let mut parameters: Vec<(String, ParameterSpec)> = Vec::new();

            for (name, raw) in &branch.parameters {
                let param_path = format!("{}[\"{}\"]", branch_path, name);

                if let Some(earlier) = collector.path(name) {
                    if earlier != &declaration {
                        return Err(ValidationError::OverlappingDeclaration {
                            path: param_path,
                            earlier: format!(
                                "{}.PARAMETER_SPECS[\"parameters\"]{}",
                                self.plugin, earlier
                            ),
                        });
                    }
                }

                let spec = check_spec(&param_path, raw)?;
                collector.insert(name, spec.clone(), declaration.clone());

                // 同一分支内重复声明: 后者覆盖前者, 位置不变
                match parameters.iter_mut().find(|(n, _)| n == name) {
                    Some(slot) => slot.1 = spec,
                    None => parameters.push((name.clone(), spec)),
                }
            }

            branches.push(SpecBranch {
                value: branch.value.clone(),
                parameters,
            });
        }

        Ok(SpecBlock {
            condition_variable: variable.to_string(),
            branches,
        })
    }
}

// ==========================================
// 条件值校验
// ==========================================
fn check_condition_value(
    path: &str,
    value: &ParamValue,
    condition_spec: &ParameterSpec,
) -> ValidationResult<()> {
    if value.is_null() {
        if !condition_spec.nullable {
            return Err(ValidationError::NonNullableNullDefault {
                path: path.to_string(),
            });
        }
        return Ok(());
    }

    if value.param_type() != Some(condition_spec.param_type) {
        return Err(ValidationError::ConditionValueTypeMismatch {
            path: path.to_string(),
            value: value.to_string(),
            expected: condition_spec.param_type,
        });
    }

    if let Some(range) = &condition_spec.range {
        if !range.contains(value) {
            return Err(ValidationError::ConditionValueOutOfRange {
                path: path.to_string(),
                value: value.to_string(),
            });
        }
    }

    Ok(())
}

// ==========================================
// 单个参数规格校验
// ==========================================

/// 校验单个原始规格并转换为 ParameterSpec
pub fn check_spec(path: &str, raw: &Value) -> ValidationResult<ParameterSpec> {
    let raw = raw
        .as_object()
        .ok_or_else(|| ValidationError::MalformedSpecValue {
            path: path.to_string(),
            key: String::new(),
            reason: "参数规格必须是 JSON 对象".to_string(),
        })?;

    if let Some(key) = raw
        .keys()
        .find(|k| !ALL_VALID_SPEC_KEYS.contains(&k.as_str()))
    {
        return Err(ValidationError::UnknownSpecKey {
            path: path.to_string(),
            key: key.clone(),
        });
    }

    let param_type = match raw.get("type") {
        Some(Value::String(name)) => {
            ParamType::from_name(name).ok_or_else(|| ValidationError::MissingType {
                path: path.to_string(),
                found: name.clone(),
            })?
        }
        Some(other) => {
            return Err(ValidationError::MissingType {
                path: path.to_string(),
                found: other.to_string(),
            })
        }
        None => {
            return Err(ValidationError::MissingType {
                path: path.to_string(),
                found: "<缺失>".to_string(),
            })
        }
    };

    let raw_default = raw
        .get("default")
        .ok_or_else(|| ValidationError::MissingDefault {
            path: path.to_string(),
        })?;

    let nullable = match raw.get("nullable") {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(ValidationError::MalformedSpecValue {
                path: path.to_string(),
                key: "nullable".to_string(),
                reason: format!("必须是布尔值, 实际 {}", other),
            })
        }
    };

    let default = ParamValue::from_json(raw_default).ok_or_else(|| {
        ValidationError::InvalidDefaultType {
            path: path.to_string(),
            expected: param_type,
            found: raw_default.to_string(),
        }
    })?;

    if default.is_null() && !nullable {
        return Err(ValidationError::NonNullableNullDefault {
            path: path.to_string(),
        });
    }
    if !default.is_null() && default.param_type() != Some(param_type) {
        return Err(ValidationError::InvalidDefaultType {
            path: path.to_string(),
            expected: param_type,
            found: default.to_string(),
        });
    }

    let options = check_options(path, raw, param_type, &default)?;
    let range = check_range(path, raw, param_type, &default)?;

    Ok(ParameterSpec {
        param_type,
        default,
        nullable,
        options,
        range,
    })
}

fn check_options(
    path: &str,
    raw: &Map<String, Value>,
    param_type: ParamType,
    default: &ParamValue,
) -> ValidationResult<Option<Vec<ParamValue>>> {
    let items = match raw.get("options") {
        None => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ValidationError::MalformedSpecValue {
                path: path.to_string(),
                key: "options".to_string(),
                reason: format!("必须是数组, 实际 {}", other),
            })
        }
    };

    if let Some(key) = raw
        .keys()
        .find(|k| !OPTIONS_VALID_SPEC_KEYS.contains(&k.as_str()))
    {
        return Err(ValidationError::OptionsKeyConflict {
            path: path.to_string(),
            key: key.clone(),
        });
    }

    let mut options = Vec::with_capacity(items.len());
    for item in items {
        match ParamValue::from_json(item) {
            Some(value) if value.param_type() == Some(param_type) => options.push(value),
            _ => {
                return Err(ValidationError::MalformedSpecValue {
                    path: path.to_string(),
                    key: "options".to_string(),
                    reason: format!("选项 {} 不是 {} 类型", item, param_type),
                })
            }
        }
    }

    if !default.is_null() && !options.contains(default) {
        return Err(ValidationError::DefaultNotInOptions {
            path: path.to_string(),
            default: default.to_string(),
        });
    }

    Ok(Some(options))
}

fn check_range(
    path: &str,
    raw: &Map<String, Value>,
    param_type: ParamType,
    default: &ParamValue,
) -> ValidationResult<Option<NumericRange>> {
    let (min, max, step) = (raw.get("min"), raw.get("max"), raw.get("step"));

    let incomplete = |reason: &str| ValidationError::IncompleteRange {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    match (min, max) {
        (None, None) if step.is_some() => return Err(incomplete("step 需要同时声明 min 与 max")),
        (None, None) => return Ok(None),
        (Some(_), None) => return Err(incomplete("声明了 min 但缺少 max")),
        (None, Some(_)) => return Err(incomplete("声明了 max 但缺少 min")),
        (Some(_), Some(_)) if !param_type.is_numeric() => {
            return Err(incomplete("非数值类型不允许声明范围"))
        }
        (Some(_), Some(_)) => {}
    }

    let typed = |key: &str, value: &Value| -> ValidationResult<ParamValue> {
        match ParamValue::from_json(value) {
            Some(v) if v.param_type() == Some(param_type) => Ok(v),
            _ => Err(ValidationError::RangeTypeMismatch {
                path: path.to_string(),
                key: key.to_string(),
            }),
        }
    };

    let range = NumericRange {
        min: typed("min", min.unwrap_or(&Value::Null))?,
        max: typed("max", max.unwrap_or(&Value::Null))?,
        step: step.map(|s| typed("step", s)).transpose()?,
    };

    if range.min.numeric_cmp(&range.max) == Some(std::cmp::Ordering::Greater) {
        return Err(incomplete("min 大于 max"));
    }

    if !default.is_null() && !range.contains(default) {
        return Err(ValidationError::DefaultOutOfRange {
            path: path.to_string(),
            default: default.to_string(),
        });
    }

    Ok(Some(range))
}
