// ==========================================
// 图像匹配工具 - 条件分支解析引擎
// ==========================================
// 职责: 根据当前取值判定规格树中哪些分支处于激活状态
// 输入: 强类型规格树 + 单个算法的原始设置
// 输出: 有序的激活参数列表 (含开关状态)
// 说明: 支持增量重解析, 仅重算受变更影响的后续块
// ==========================================

use crate::domain::settings::RawSettings;
use crate::domain::spec::{ParameterSpec, SpecBlock, ALGORITHM_KEY};
use crate::domain::types::{ParamValue, ParameterMap};
use crate::engine::default_filler::check_value;
use std::collections::{BTreeMap, BTreeSet};

/// 单个激活参数
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveParameter {
    pub name: String,
    pub spec: ParameterSpec,
    pub value: ParamValue,
    /// 是否开启 (可空参数可被关闭, 关闭后不出现在 current 中)
    pub enabled: bool,
    /// 所属块下标
    pub block: usize,
}

/// 解析结果: 每个块的激活分支 + 有序激活参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveParameters {
    branches: Vec<Option<usize>>,
    entries: Vec<ActiveParameter>,
}

impl ActiveParameters {
    /// 每个块当前激活的分支下标
    pub fn branches(&self) -> &[Option<usize>] {
        &self.branches
    }

    pub fn entries(&self) -> &[ActiveParameter] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&ActiveParameter> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 生成 current 视图: algorithm + 全部开启的激活参数
    pub fn current(&self, algorithm: &str) -> ParameterMap {
        let mut current = ParameterMap::new();
        current.insert(
            ALGORITHM_KEY.to_string(),
            ParamValue::Str(algorithm.to_string()),
        );
        for entry in self.entries.iter().filter(|e| e.enabled) {
            current.insert(entry.name.clone(), entry.value.clone());
        }
        current
    }
}

// ==========================================
// ConditionalResolver - 条件分支解析引擎
// ==========================================
pub struct ConditionalResolver<'a> {
    blocks: &'a [SpecBlock],
}

impl<'a> ConditionalResolver<'a> {
    pub fn new(blocks: &'a [SpecBlock]) -> Self {
        Self { blocks }
    }

    /// 全量解析: 按声明顺序逐块判定激活分支
    pub fn resolve(&self, raw: &RawSettings) -> ActiveParameters {
        let all: BTreeSet<String> = self
            .blocks
            .iter()
            .map(|b| b.condition_variable.clone())
            .collect();
        self.walk(raw, None, all)
    }

    /// 增量解析
    ///
    /// 仅重算条件变量位于 changed 中的块; 分支切换时, 被卸载与新激活分支中的
    /// 参数名并入 changed, 从而递归影响更后面的块。结果与全量解析一致。
    pub fn reresolve(
        &self,
        previous: &ActiveParameters,
        raw: &RawSettings,
        changed: &BTreeSet<String>,
    ) -> ActiveParameters {
        if previous.branches.len() != self.blocks.len() {
            return self.resolve(raw);
        }
        self.walk(raw, Some(&previous.branches), changed.clone())
    }

    fn walk(
        &self,
        raw: &RawSettings,
        previous: Option<&[Option<usize>]>,
        mut changed: BTreeSet<String>,
    ) -> ActiveParameters {
        // 当前激活参数的有效取值 (用于条件判定)
        let mut effective: BTreeMap<&str, ParamValue> = BTreeMap::new();
        effective.insert(
            ALGORITHM_KEY,
            raw.values
                .get(ALGORITHM_KEY)
                .cloned()
                .unwrap_or(ParamValue::Null),
        );

        let mut branches = Vec::with_capacity(self.blocks.len());
        let mut entries: Vec<ActiveParameter> = Vec::new();

        for (index, block) in self.blocks.iter().enumerate() {
            let kept = previous.map(|p| p[index]);
            let selected = match kept {
                Some(kept) if !changed.contains(&block.condition_variable) => kept,
                _ => {
                    let selected = select_branch(block, &effective);
                    if let Some(kept) = kept {
                        if kept != selected {
                            tracing::debug!(
                                block = index,
                                variable = %block.condition_variable,
                                from = ?kept,
                                to = ?selected,
                                "条件分支切换"
                            );
                            for branch in [kept, selected].into_iter().flatten() {
                                changed.extend(
                                    block.branches[branch].names().map(str::to_string),
                                );
                            }
                        }
                    }
                    selected
                }
            };

            if let Some(branch_index) = selected {
                for (name, spec) in &block.branches[branch_index].parameters {
                    let value = branch_value(raw, name, spec);
                    let enabled = !raw.is_disabled(name) && !value.is_null();
                    effective.insert(
                        name.as_str(),
                        if enabled { value.clone() } else { ParamValue::Null },
                    );
                    let entry = ActiveParameter {
                        name: name.clone(),
                        spec: spec.clone(),
                        value,
                        enabled,
                        block: index,
                    };
                    match entries.iter_mut().find(|e| e.name == *name) {
                        Some(slot) => *slot = entry,
                        None => entries.push(entry),
                    }
                }
            }
            branches.push(selected);
        }

        ActiveParameters { branches, entries }
    }
}

/// 参数在激活分支下的取值
///
/// 同一块的兄弟分支可以同名声明不同规格, 但共用一份 raw 取值;
/// 该取值不满足当前分支的规格时改用当前分支的默认值, raw 保持不变
fn branch_value(raw: &RawSettings, name: &str, spec: &ParameterSpec) -> ParamValue {
    let stored = raw.values.get(name).cloned().unwrap_or(ParamValue::Null);
    let algorithm = raw
        .values
        .get(ALGORITHM_KEY)
        .and_then(ParamValue::as_str)
        .unwrap_or_default();
    match check_value(algorithm, name, spec, &stored) {
        Ok(()) => stored,
        Err(err) => {
            tracing::debug!(
                name = %name,
                fallback = %spec.default,
                reason = %err,
                "共享取值不满足激活分支规格, 使用分支默认值"
            );
            spec.default.clone()
        }
    }
}

/// 判定块的激活分支
///
/// - 无条件块: 唯一分支
/// - 条件块: 分支值等于条件变量有效取值者 (null 可匹配 null 分支);
///   条件变量未激活时有效取值为 null
fn select_branch(block: &SpecBlock, effective: &BTreeMap<&str, ParamValue>) -> Option<usize> {
    if block.is_unconditional() {
        return if block.branches.is_empty() { None } else { Some(0) };
    }
    let value = effective
        .get(block.condition_variable.as_str())
        .cloned()
        .unwrap_or(ParamValue::Null);
    block.branches.iter().position(|b| b.value == value)
}
