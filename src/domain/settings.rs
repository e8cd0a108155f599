// ==========================================
// 图像匹配工具 - 设置状态模型
// ==========================================
// 职责: raw (全部分支) 与 current (当前激活分支) 两种视图
// 红线: current 只能由 ConditionalResolver 推导, 不可直接修改
// ==========================================

use crate::domain::types::{ParamValue, ParameterMap};
use serde::Serialize;
use std::collections::BTreeSet;

// ==========================================
// RawSettings - 单个算法的原始设置
// ==========================================

/// 单个算法的原始设置 (覆盖所有分支, 无论是否激活)
///
/// 可空参数的开关与取值相互独立: 关闭时取值仍被缓存, 便于重新开启
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawSettings {
    pub values: ParameterMap,
    pub disabled: BTreeSet<String>,
}

impl RawSettings {
    /// 由 DefaultFiller 的输出构造
    pub fn from_filled(values: ParameterMap) -> Self {
        Self {
            values,
            disabled: BTreeSet::new(),
        }
    }

    /// 参数是否被手动关闭 (取值仍被缓存)
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(name)
    }
}

// ==========================================
// CurrentSettings - 当前激活设置快照
// ==========================================

/// 当前激活设置的不可变快照
///
/// revision 在每次提交的变更后递增, 轮询方据此判断是否需要重算
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentSettings {
    pub algorithm: String,
    pub parameters: ParameterMap,
    pub revision: u64,
}

impl CurrentSettings {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// 交给绘图函数的扁平参数表
    pub fn flat_parameters(&self) -> ParameterMap {
        self.parameters.clone()
    }
}
