// ==========================================
// 图像匹配工具 - 插件层
// ==========================================
// 职责: 定义插件契约 (算法列表 + 共享规格树 + 绘图函数表)
// 分发: Algorithm 枚举穷尽匹配, 新增算法时编译期即可发现遗漏
// 说明: 实际匹配计算由 AlgorithmPlotter 实现方提供
// ==========================================

pub mod builtin;
pub mod image;
pub mod preview;

pub use image::{Image, PlotOutput, Timer};
pub use preview::PreviewPlotter;

use crate::domain::spec::ConditionalBlock;
use crate::domain::types::ParameterMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 绘图/计算函数: (基准图, 查询图, 扁平参数) -> 耗时 + 结果图
pub type PlotFn =
    Arc<dyn Fn(&Image, &Image, &ParameterMap) -> anyhow::Result<PlotOutput> + Send + Sync>;

/// 插件提交的规格
///
/// 同一插件的全部算法共享 parameter_blocks
pub struct PluginSpec {
    pub name: String,
    pub algorithms: Vec<String>,
    pub parameter_blocks: Vec<ConditionalBlock>,
    pub plot_functions: BTreeMap<String, PlotFn>,
}

impl fmt::Debug for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSpec")
            .field("name", &self.name)
            .field("algorithms", &self.algorithms)
            .field("blocks", &self.parameter_blocks.len())
            .field(
                "plot_functions",
                &self.plot_functions.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ==========================================
// Algorithm - 内置算法
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    BruteForce,
    Flann,
    MatchTemplate,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::BruteForce,
        Algorithm::Flann,
        Algorithm::MatchTemplate,
    ];

    /// 算法标识 (即 algorithm 参数的取值)
    pub fn id(&self) -> &'static str {
        match self {
            Algorithm::BruteForce => "Brute-Force",
            Algorithm::Flann => "FLANN",
            Algorithm::MatchTemplate => "Match Template",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.id() == id)
    }

    /// 所属插件
    pub fn plugin(&self) -> &'static str {
        match self {
            Algorithm::BruteForce | Algorithm::Flann => builtin::feature_matching::PLUGIN_NAME,
            Algorithm::MatchTemplate => builtin::template_matching::PLUGIN_NAME,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// 算法绘图实现方
pub trait AlgorithmPlotter: Send + Sync {
    fn plot(
        &self,
        algorithm: Algorithm,
        base: &Image,
        query: &Image,
        params: &ParameterMap,
    ) -> anyhow::Result<PlotOutput>;
}

fn plot_fn(algorithm: Algorithm, plotter: &Arc<dyn AlgorithmPlotter>) -> PlotFn {
    let plotter = Arc::clone(plotter);
    Arc::new(move |base: &Image, query: &Image, params: &ParameterMap| {
        plotter.plot(algorithm, base, query, params)
    })
}

fn plugin_spec(
    name: &str,
    algorithms: Vec<Algorithm>,
    parameter_blocks: Vec<ConditionalBlock>,
    plotter: &Arc<dyn AlgorithmPlotter>,
) -> PluginSpec {
    PluginSpec {
        name: name.to_string(),
        algorithms: algorithms.iter().map(|a| a.id().to_string()).collect(),
        parameter_blocks,
        plot_functions: algorithms
            .iter()
            .map(|a| (a.id().to_string(), plot_fn(*a, plotter)))
            .collect(),
    }
}

/// 内置插件 (加载顺序: 特征点匹配, 模板匹配)
pub fn builtin_plugins(plotter: Arc<dyn AlgorithmPlotter>) -> Vec<PluginSpec> {
    vec![
        plugin_spec(
            builtin::feature_matching::PLUGIN_NAME,
            builtin::feature_matching::algorithms(),
            builtin::feature_matching::parameter_blocks(),
            &plotter,
        ),
        plugin_spec(
            builtin::template_matching::PLUGIN_NAME,
            builtin::template_matching::algorithms(),
            builtin::template_matching::parameter_blocks(),
            &plotter,
        ),
    ]
}
