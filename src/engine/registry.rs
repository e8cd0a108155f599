// ==========================================
// 图像匹配工具 - 参数注册表
// ==========================================
// 职责: 汇总多个插件的规格树与绘图函数, 构建全局注册表
// 生命周期: 启动时构建一次, 之后不可变, 显式传递给各使用方
// 红线: 任一规格校验失败即中止构建, 不产生部分注册表
// ==========================================

use crate::domain::spec::{CanonicalSpecMap, ConditionalBlock, SpecBlock};
use crate::domain::types::ParameterMap;
use crate::engine::error::ValidationError;
use crate::engine::spec_validator::SpecValidator;
use crate::plugin::{Image, PlotFn, PlotOutput, PluginSpec};
use std::fmt;
use std::sync::Arc;

// ==========================================
// RegistryEntry - 单个算法的注册信息
// ==========================================
pub struct RegistryEntry {
    /// 算法标识
    pub algorithm: String,
    /// 提供该算法的插件名
    pub plugin: String,
    /// 规范化规格表 (含强类型规格树)
    pub specs: CanonicalSpecMap,
    /// 绘图/计算函数
    pub plot: PlotFn,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("algorithm", &self.algorithm)
            .field("plugin", &self.plugin)
            .field("parameters", &self.specs.len())
            .finish_non_exhaustive()
    }
}

// ==========================================
// ParameterRegistry - 参数注册表
// ==========================================
#[derive(Debug, Default)]
pub struct ParameterRegistry {
    /// 按首次注册顺序排列
    entries: Vec<RegistryEntry>,
}

impl ParameterRegistry {
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn entry(&self, algorithm: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.algorithm == algorithm)
    }

    pub fn specs(&self, algorithm: &str) -> Option<&CanonicalSpecMap> {
        self.entry(algorithm).map(|e| &e.specs)
    }

    /// 算法的强类型规格树
    pub fn tree(&self, algorithm: &str) -> Option<&[SpecBlock]> {
        self.entry(algorithm).map(|e| e.specs.blocks())
    }

    /// 全部算法标识 (注册顺序)
    pub fn algorithms(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.algorithm.as_str()).collect()
    }

    pub fn contains(&self, algorithm: &str) -> bool {
        self.entry(algorithm).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 调用算法的绘图函数
    pub fn plot(
        &self,
        algorithm: &str,
        base: &Image,
        query: &Image,
        params: &ParameterMap,
    ) -> anyhow::Result<PlotOutput> {
        let entry = self
            .entry(algorithm)
            .ok_or_else(|| anyhow::anyhow!("未注册的算法: {}", algorithm))?;
        (entry.plot)(base, query, params)
    }
}

// ==========================================
// SpecAccumulator - 跨插件汇总
// ==========================================

/// 同一插件的全部算法共享的规格树
struct SharedTree {
    plugin: String,
    algorithms: Vec<String>,
    blocks: Vec<ConditionalBlock>,
}

struct PendingEntry {
    algorithm: String,
    tree: Arc<SharedTree>,
    plot: PlotFn,
}

/// 跨插件规格汇总器
///
/// 同名算法采用后写覆盖 (last-write-wins), 不做合并
#[derive(Default)]
pub struct SpecAccumulator {
    pending: Vec<PendingEntry>,
}

impl SpecAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入一个插件
    ///
    /// # 错误
    /// - AlgorithmPlotMismatch: 声明的算法集合与绘图函数键集合不一致
    pub fn add(&mut self, plugin: PluginSpec) -> Result<(), ValidationError> {
        let mut declared = plugin.algorithms.clone();
        declared.sort();
        let plotted: Vec<String> = plugin.plot_functions.keys().cloned().collect();
        if declared != plotted {
            return Err(ValidationError::AlgorithmPlotMismatch {
                path: format!("{}.PARAMETER_SPECS[\"plot_functions\"]", plugin.name),
                declared,
                plotted,
            });
        }

        let PluginSpec {
            name,
            algorithms,
            parameter_blocks,
            mut plot_functions,
        } = plugin;

        let tree = Arc::new(SharedTree {
            plugin: name,
            algorithms: algorithms.clone(),
            blocks: parameter_blocks,
        });

        for algorithm in algorithms {
            let Some(plot) = plot_functions.remove(&algorithm) else {
                continue;
            };
            let entry = PendingEntry {
                algorithm: algorithm.clone(),
                tree: Arc::clone(&tree),
                plot,
            };
            match self.pending.iter_mut().find(|p| p.algorithm == algorithm) {
                Some(slot) => {
                    tracing::warn!(
                        algorithm = %algorithm,
                        previous = %slot.tree.plugin,
                        replacement = %tree.plugin,
                        "算法被后加载的插件覆盖"
                    );
                    *slot = entry;
                }
                None => self.pending.push(entry),
            }
        }

        Ok(())
    }

    /// 逐个算法校验规格树并生成注册表
    pub fn build(self) -> Result<ParameterRegistry, ValidationError> {
        let mut entries = Vec::with_capacity(self.pending.len());
        for pending in self.pending {
            let specs = SpecValidator::new(&pending.tree.plugin, &pending.tree.algorithms)
                .validate(&pending.tree.blocks)?;
            entries.push(RegistryEntry {
                algorithm: pending.algorithm,
                plugin: pending.tree.plugin.clone(),
                specs,
                plot: pending.plot,
            });
        }
        Ok(ParameterRegistry { entries })
    }
}

impl SpecAccumulator {
    /// 按加载顺序汇总全部插件并校验
    pub fn accumulate(plugins: Vec<PluginSpec>) -> Result<ParameterRegistry, ValidationError> {
        let mut accumulator = Self::new();
        for plugin in plugins {
            accumulator.add(plugin)?;
        }
        accumulator.build()
    }
}

/// 构建注册表: 汇总全部插件后统一校验
pub fn build_registry(plugins: Vec<PluginSpec>) -> Result<ParameterRegistry, ValidationError> {
    let registry = SpecAccumulator::accumulate(plugins)?;
    tracing::info!(algorithms = ?registry.algorithms(), "参数注册表构建完成");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spec::Branch;
    use crate::plugin::PluginSpec;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn noop_plot() -> PlotFn {
        Arc::new(
            |base: &Image, _query: &Image, _params: &ParameterMap| -> anyhow::Result<PlotOutput> {
                Ok(PlotOutput {
                    duration: Vec::new(),
                    image: base.clone(),
                })
            },
        )
    }

    fn plugin(name: &str, algorithms: &[&str], default: i64) -> PluginSpec {
        let mut plot_functions = BTreeMap::new();
        for a in algorithms {
            plot_functions.insert(a.to_string(), noop_plot());
        }
        PluginSpec {
            name: name.to_string(),
            algorithms: algorithms.iter().map(|a| a.to_string()).collect(),
            parameter_blocks: vec![ConditionalBlock::unconditional(
                Branch::new("all").param("n", json!({"type": "int", "default": default})),
            )],
            plot_functions,
        }
    }

    #[test]
    fn test_plot_mismatch() {
        let mut p = plugin("p", &["A", "B"], 1);
        p.plot_functions.remove("B");
        let err = build_registry(vec![p]).unwrap_err();
        assert_eq!(err.kind(), "AlgorithmPlotMismatch");
    }

    #[test]
    fn test_later_plugin_replaces_earlier() {
        let registry =
            build_registry(vec![plugin("first", &["A", "B"], 1), plugin("second", &["A"], 2)])
                .unwrap();
        assert_eq!(registry.algorithms(), vec!["A", "B"]);
        let a = registry.entry("A").unwrap();
        assert_eq!(a.plugin, "second");
        assert_eq!(
            a.specs.get("n").unwrap().default,
            crate::domain::types::ParamValue::Int(2)
        );
        assert_eq!(registry.entry("B").unwrap().plugin, "first");
    }

    #[test]
    fn test_no_partial_registry() {
        let mut bad = plugin("bad", &["C"], 1);
        bad.parameter_blocks.push(ConditionalBlock::conditional("missing", vec![]));
        let result = build_registry(vec![plugin("good", &["A"], 1), bad]);
        assert!(result.is_err());
    }
}
