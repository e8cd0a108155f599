// ==========================================
// 图像匹配工具 - 模板卷积匹配插件
// ==========================================
// 算法: Match Template
// 规格树: 色彩空间 / 匹配方法与筛选方式 / filter_by -> 筛选参数
// ==========================================

use super::color_space::color_space_block;
use crate::domain::spec::{Branch, ConditionalBlock};
use crate::plugin::Algorithm;
use serde_json::json;

pub const PLUGIN_NAME: &str = "simple_convolution_matching";

/// 模板匹配方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateMethod {
    CCoeff,
    CCoeffNormed,
    CCorr,
    CCorrNormed,
    SqDiff,
    SqDiffNormed,
}

impl TemplateMethod {
    pub const ALL: [TemplateMethod; 6] = [
        TemplateMethod::CCoeff,
        TemplateMethod::CCoeffNormed,
        TemplateMethod::CCorr,
        TemplateMethod::CCorrNormed,
        TemplateMethod::SqDiff,
        TemplateMethod::SqDiffNormed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateMethod::CCoeff => "TM_CCOEFF",
            TemplateMethod::CCoeffNormed => "TM_CCOEFF_NORMED",
            TemplateMethod::CCorr => "TM_CCORR",
            TemplateMethod::CCorrNormed => "TM_CCORR_NORMED",
            TemplateMethod::SqDiff => "TM_SQDIFF",
            TemplateMethod::SqDiffNormed => "TM_SQDIFF_NORMED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// 差值类方法越小越好, 相关类方法越大越好
    pub fn lower_is_better(&self) -> bool {
        matches!(self, TemplateMethod::SqDiff | TemplateMethod::SqDiffNormed)
    }
}

/// 匹配结果的筛选方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterBy {
    Number,
    Ratio,
}

impl FilterBy {
    pub const ALL: [FilterBy; 2] = [FilterBy::Number, FilterBy::Ratio];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterBy::Number => "number",
            FilterBy::Ratio => "ratio",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

pub fn algorithms() -> Vec<Algorithm> {
    vec![Algorithm::MatchTemplate]
}

pub fn parameter_blocks() -> Vec<ConditionalBlock> {
    let methods: Vec<&str> = TemplateMethod::ALL.iter().map(|m| m.as_str()).collect();
    let filters: Vec<&str> = FilterBy::ALL.iter().map(|f| f.as_str()).collect();

    vec![
        color_space_block(),
        ConditionalBlock::unconditional(
            Branch::new("all")
                .param(
                    "method",
                    json!({
                        "type": "str",
                        "options": methods,
                        "default": TemplateMethod::SqDiffNormed.as_str(),
                    }),
                )
                .param(
                    "filter_by",
                    json!({"type": "str", "options": filters, "default": FilterBy::Number.as_str()}),
                ),
        ),
        ConditionalBlock::conditional(
            "filter_by",
            vec![
                Branch::new(FilterBy::Number.as_str()).param(
                    "n_matches",
                    json!({"type": "int", "min": 1, "max": 100, "step": 1, "default": 1}),
                ),
                Branch::new(FilterBy::Ratio.as_str()).param(
                    "match_ratio_threshold",
                    json!({"type": "float", "min": 0.01, "max": 1.0, "step": 0.01, "default": 0.5}),
                ),
            ],
        ),
    ]
}
