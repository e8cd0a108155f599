// ==========================================
// 图像匹配工具 - 预览绘图
// ==========================================
// 职责: 不执行匹配计算, 仅按参数转换色彩空间并左右拼接两幅图
// 用途: 启动自检与无匹配结果时的占位图
// ==========================================

use super::builtin::color_space::{gray_to_bgr, ColorSpace};
use super::builtin::feature_matching::{detector_parameters, Detector, MatchingMethod};
use super::builtin::template_matching::TemplateMethod;
use super::image::{Image, PlotOutput, Timer};
use super::{Algorithm, AlgorithmPlotter};
use crate::domain::types::{ParamValue, ParameterMap};

/// 预览绘图实现
#[derive(Debug, Clone, Default)]
pub struct PreviewPlotter;

impl PreviewPlotter {
    pub fn new() -> Self {
        Self
    }
}

fn str_param<'a>(params: &'a ParameterMap, name: &str) -> anyhow::Result<&'a str> {
    match params.get(name) {
        Some(ParamValue::Str(value)) => Ok(value),
        Some(other) => anyhow::bail!("参数 {} 类型错误: {}", name, other),
        None => anyhow::bail!("缺少参数 {}", name),
    }
}

/// 左右拼接 (高度取两者较大值, 空白处填黑)
pub fn side_by_side(base: &Image, query: &Image) -> anyhow::Result<Image> {
    let mut canvas = Image::zeros(
        base.width + query.width,
        base.height.max(query.height),
        base.channels,
    );
    canvas.blit(base, 0, 0)?;
    canvas.blit(query, base.width, 0)?;
    Ok(canvas)
}

/// 无匹配结果时的占位图: 原图左右拼接
pub fn plot_empty_match(base: &Image, query: &Image) -> anyhow::Result<Image> {
    side_by_side(base, query)
}

impl AlgorithmPlotter for PreviewPlotter {
    fn plot(
        &self,
        algorithm: Algorithm,
        base: &Image,
        query: &Image,
        params: &ParameterMap,
    ) -> anyhow::Result<PlotOutput> {
        let mut timer = Timer::start();

        let color_space = ColorSpace::from_params(params)?;
        let working_base = color_space.convert_from_bgr(base);
        let working_query = color_space.convert_from_bgr(query);
        timer.mark(format!("Color space change ({})", color_space));

        match algorithm {
            Algorithm::BruteForce | Algorithm::Flann => {
                let detector_name = str_param(params, "detector")?;
                let detector = Detector::from_name(detector_name)
                    .ok_or_else(|| anyhow::anyhow!("未知检测器: {}", detector_name))?;
                let method_name = str_param(params, "matching_method")?;
                let method = MatchingMethod::from_name(method_name)
                    .ok_or_else(|| anyhow::anyhow!("未知匹配方式: {}", method_name))?;
                let detector_params = detector_parameters(detector, params);
                tracing::debug!(
                    algorithm = %algorithm,
                    detector = detector.as_str(),
                    method = method.as_str(),
                    overrides = detector_params.len(),
                    "特征点匹配预览"
                );
                timer.mark(format!("Detector {} creation", detector.as_str()));
            }
            Algorithm::MatchTemplate => {
                let method_name = str_param(params, "method")?;
                let method = TemplateMethod::from_name(method_name)
                    .ok_or_else(|| anyhow::anyhow!("未知模板匹配方法: {}", method_name))?;
                tracing::debug!(method = method.as_str(), "模板匹配预览");
                timer.mark(format!("Method {}", method.as_str()));
            }
        }

        let mut image = side_by_side(&working_base, &working_query)?;
        if color_space == ColorSpace::Bw {
            image = gray_to_bgr(&image);
        }
        timer.mark("Plotting");

        Ok(PlotOutput {
            duration: timer.stop(),
            image,
        })
    }
}
