// ==========================================
// 图像匹配工具 - 特征点匹配插件
// ==========================================
// 算法: Brute-Force / FLANN (共享同一条件规格树)
// 规格树顺序:
//   [0] 色彩空间
//   [1] algorithm -> detector / matching_method (默认值因算法而异)
//   [2] detector -> 检测器参数 (BRIEF / ORB / SIFT)
//   [3] algorithm -> 匹配器参数
//   [4] matching_method -> 匹配方式参数
//   [5] 匹配筛选方式
//   [6] match_filters_by -> 筛选参数
// ==========================================

use super::color_space::color_space_block;
use crate::domain::spec::{Branch, ConditionalBlock, ALGORITHM_KEY};
use crate::domain::types::{ParamValue, ParameterMap};
use crate::plugin::Algorithm;
use serde_json::{json, Value};

pub const PLUGIN_NAME: &str = "feature_matching";

// ==========================================
// 检测器
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detector {
    Brief,
    Orb,
    Sift,
}

impl Detector {
    pub const ALL: [Detector; 3] = [Detector::Brief, Detector::Orb, Detector::Sift];

    pub fn as_str(&self) -> &'static str {
        match self {
            Detector::Brief => "BRIEF",
            Detector::Orb => "ORB",
            Detector::Sift => "SIFT",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }

    /// 检测器自身的参数规格 (全部可空, 空值表示使用库默认值)
    fn parameters(&self) -> Vec<(&'static str, Value)> {
        let int = |min: i64, max: i64| {
            json!({"type": "int", "nullable": true, "min": min, "max": max, "step": 1, "default": null})
        };
        let float = || {
            json!({"type": "float", "nullable": true, "min": 0.0, "max": 100.0, "step": 1.0, "default": null})
        };
        match self {
            Detector::Brief => vec![
                ("maxSize", int(0, 100)),
                ("responseThreshold", int(0, 100)),
                ("lineThresholdProjected", int(0, 100)),
                ("lineThresholdBinarized", int(0, 100)),
                ("suppressNonmaxSize", int(0, 100)),
                ("bytes", int(0, 100)),
                (
                    "use_orientation",
                    json!({"type": "bool", "nullable": true, "default": null}),
                ),
            ],
            Detector::Orb => vec![
                ("nfeatures", int(0, 1000)),
                ("scaleFactor", float()),
                ("nlevels", int(0, 100)),
                ("edgeThreshold", float()),
                ("firstLevel", float()),
                ("WTA_K", float()),
                ("scoreType", float()),
                ("patchSize", float()),
                ("fastThreshold", float()),
            ],
            Detector::Sift => vec![
                ("nfeatures", int(0, 1000)),
                ("nOctaveLayers", int(1, 100)),
                ("contrastThreshold", float()),
                ("edgeThreshold", float()),
                ("sigma", float()),
            ],
        }
    }

    /// 检测器参数名
    pub fn parameter_names(&self) -> Vec<&'static str> {
        self.parameters().into_iter().map(|(name, _)| name).collect()
    }
}

// ==========================================
// 匹配方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingMethod {
    Best,
    Knn,
    Radius,
}

impl MatchingMethod {
    pub const ALL: [MatchingMethod; 3] = [
        MatchingMethod::Best,
        MatchingMethod::Knn,
        MatchingMethod::Radius,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchingMethod::Best => "best",
            MatchingMethod::Knn => "KNN",
            MatchingMethod::Radius => "radius-based",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    fn parameters(&self) -> Vec<(&'static str, Value)> {
        match self {
            MatchingMethod::Best => Vec::new(),
            MatchingMethod::Knn => vec![(
                "k",
                json!({"type": "int", "min": 1, "max": 10, "step": 1, "default": 1}),
            )],
            MatchingMethod::Radius => vec![(
                "maxDistance",
                json!({"type": "float", "min": 0.0, "max": 1.0, "step": 0.01, "default": 0.5}),
            )],
        }
    }
}

// ==========================================
// 匹配筛选
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFilter {
    RatioThreshold,
    TopN,
}

impl MatchFilter {
    pub const ALL: [MatchFilter; 2] = [MatchFilter::RatioThreshold, MatchFilter::TopN];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchFilter::RatioThreshold => "ratio threshold",
            MatchFilter::TopN => "top N",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    fn parameters(&self) -> Vec<(&'static str, Value)> {
        match self {
            MatchFilter::RatioThreshold => vec![(
                "match_ratio_threshold",
                json!({"type": "float", "min": 0.01, "max": 1.0, "step": 0.01, "default": 0.5}),
            )],
            MatchFilter::TopN => vec![(
                "n_matches",
                json!({"type": "int", "min": 1, "max": 100, "step": 1, "default": 10}),
            )],
        }
    }
}

// ==========================================
// 暴力匹配的距离范数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormType {
    L1,
    L2,
    Hamming,
    Hamming2,
}

impl NormType {
    pub const ALL: [NormType; 4] = [
        NormType::L1,
        NormType::L2,
        NormType::Hamming,
        NormType::Hamming2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NormType::L1 => "NORM_L1",
            NormType::L2 => "NORM_L2",
            NormType::Hamming => "NORM_HAMMING",
            NormType::Hamming2 => "NORM_HAMMING2",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.as_str() == name)
    }
}

// ==========================================
// 规格树
// ==========================================

fn branch(value: &str, parameters: Vec<(&'static str, Value)>) -> Branch {
    parameters
        .into_iter()
        .fold(Branch::new(value), |b, (name, spec)| b.param(name, spec))
}

fn str_options<T: Copy>(all: &[T], name: fn(&T) -> &'static str) -> Vec<&'static str> {
    all.iter().map(name).collect()
}

fn bruteforce_matcher_parameters() -> Vec<(&'static str, Value)> {
    vec![
        (
            "norm_type",
            json!({
                "type": "str",
                "options": str_options(&NormType::ALL, NormType::as_str),
                "default": NormType::Hamming.as_str(),
            }),
        ),
        (
            "cross_check",
            json!({"type": "bool", "nullable": true, "default": null}),
        ),
    ]
}

fn flann_matcher_parameters() -> Vec<(&'static str, Value)> {
    vec![
        (
            "trees",
            json!({"type": "int", "min": 1, "max": 1000, "step": 1, "default": 100}),
        ),
        (
            "checks",
            json!({"type": "int", "min": 1, "max": 1000, "step": 1, "default": 500}),
        ),
    ]
}

/// 算法变体: 默认检测器 / 默认匹配方式 / 匹配器参数
struct Variant {
    algorithm: Algorithm,
    detector: Detector,
    method: MatchingMethod,
    matcher: fn() -> Vec<(&'static str, Value)>,
}

const VARIANTS: [Variant; 2] = [
    Variant {
        algorithm: Algorithm::BruteForce,
        detector: Detector::Orb,
        method: MatchingMethod::Best,
        matcher: bruteforce_matcher_parameters,
    },
    Variant {
        algorithm: Algorithm::Flann,
        detector: Detector::Sift,
        method: MatchingMethod::Knn,
        matcher: flann_matcher_parameters,
    },
];

/// 本插件提供的算法
pub fn algorithms() -> Vec<Algorithm> {
    VARIANTS.iter().map(|v| v.algorithm).collect()
}

/// 完整条件规格树
pub fn parameter_blocks() -> Vec<ConditionalBlock> {
    let algorithm_block = ConditionalBlock::conditional(
        ALGORITHM_KEY,
        VARIANTS
            .iter()
            .map(|variant| {
                Branch::new(variant.algorithm.id())
                    .param(
                        "detector",
                        json!({
                            "type": "str",
                            "options": str_options(&Detector::ALL, Detector::as_str),
                            "default": variant.detector.as_str(),
                        }),
                    )
                    .param(
                        "matching_method",
                        json!({
                            "type": "str",
                            "options": str_options(&MatchingMethod::ALL, MatchingMethod::as_str),
                            "default": variant.method.as_str(),
                        }),
                    )
            })
            .collect(),
    );

    let detector_block = ConditionalBlock::conditional(
        "detector",
        Detector::ALL
            .iter()
            .map(|d| branch(d.as_str(), d.parameters()))
            .collect(),
    );

    let matcher_block = ConditionalBlock::conditional(
        ALGORITHM_KEY,
        VARIANTS
            .iter()
            .map(|v| branch(v.algorithm.id(), (v.matcher)()))
            .collect(),
    );

    let method_block = ConditionalBlock::conditional(
        "matching_method",
        MatchingMethod::ALL
            .iter()
            .map(|m| branch(m.as_str(), m.parameters()))
            .collect(),
    );

    let filter_selector = ConditionalBlock::unconditional(Branch::new("all").param(
        "match_filters_by",
        json!({
            "type": "str",
            "options": [MatchFilter::RatioThreshold.as_str(), MatchFilter::TopN.as_str()],
            "default": MatchFilter::TopN.as_str(),
        }),
    ));

    let filter_block = ConditionalBlock::conditional(
        "match_filters_by",
        MatchFilter::ALL
            .iter()
            .map(|f| branch(f.as_str(), f.parameters()))
            .collect(),
    );

    vec![
        color_space_block(),
        algorithm_block,
        detector_block,
        matcher_block,
        method_block,
        filter_selector,
        filter_block,
    ]
}

/// 仅保留当前检测器声明过的参数 (其余检测器的缓存值不传给检测器)
pub fn detector_parameters(detector: Detector, params: &ParameterMap) -> ParameterMap {
    detector
        .parameter_names()
        .into_iter()
        .filter_map(|name| {
            params
                .get(name)
                .filter(|v| !matches!(v, ParamValue::Null))
                .map(|v| (name.to_string(), v.clone()))
        })
        .collect()
}
