// ==========================================
// 图像匹配工具 - 色彩空间参数
// ==========================================
// 各插件共享的 color_space 无条件块
// ==========================================

use crate::domain::spec::{Branch, ConditionalBlock};
use crate::domain::types::{ParamValue, ParameterMap};
use crate::plugin::image::Image;
use serde_json::json;
use std::fmt;

pub const COLOR_SPACE_KEY: &str = "color_space";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Bgr,
    Bw,
}

impl ColorSpace {
    pub const ALL: [ColorSpace; 2] = [ColorSpace::Bgr, ColorSpace::Bw];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorSpace::Bgr => "BGR",
            ColorSpace::Bw => "BW",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// 从扁平参数表读取, 缺失时为 BGR
    pub fn from_params(params: &ParameterMap) -> anyhow::Result<Self> {
        match params.get(COLOR_SPACE_KEY) {
            None | Some(ParamValue::Null) => Ok(ColorSpace::Bgr),
            Some(ParamValue::Str(name)) => Self::from_name(name)
                .ok_or_else(|| anyhow::anyhow!("未知色彩空间: {}", name)),
            Some(other) => anyhow::bail!("color_space 类型错误: {}", other),
        }
    }

    /// 由 BGR 转换到本色彩空间
    pub fn convert_from_bgr(&self, image: &Image) -> Image {
        match self {
            ColorSpace::Bgr => image.clone(),
            ColorSpace::Bw => to_gray(image),
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// color_space 无条件块
pub fn color_space_block() -> ConditionalBlock {
    ConditionalBlock::unconditional(Branch::new("all").param(
        COLOR_SPACE_KEY,
        json!({
            "type": "str",
            "options": [ColorSpace::Bgr.as_str(), ColorSpace::Bw.as_str()],
            "default": ColorSpace::Bgr.as_str(),
        }),
    ))
}

/// BGR -> 灰度 (ITU-R BT.601 加权); 非三通道图像原样返回
pub fn to_gray(image: &Image) -> Image {
    if image.channels != 3 {
        return image.clone();
    }
    let data = image
        .data
        .chunks_exact(3)
        .map(|px| {
            let (b, g, r) = (px[0] as u32, px[1] as u32, px[2] as u32);
            ((114 * b + 587 * g + 299 * r + 500) / 1000) as u8
        })
        .collect();
    Image {
        width: image.width,
        height: image.height,
        channels: 1,
        data,
    }
}

/// 灰度 -> BGR (三通道复制)
pub fn gray_to_bgr(image: &Image) -> Image {
    if image.channels != 1 {
        return image.clone();
    }
    let data = image.data.iter().flat_map(|v| [*v, *v, *v]).collect();
    Image {
        width: image.width,
        height: image.height,
        channels: 3,
        data,
    }
}
