// ==========================================
// 图像匹配工具 - 图像缓冲与绘图输出
// ==========================================
// 职责: 插件绘图函数的输入 (基准图/查询图) 与输出 (耗时 + 结果图)
// 说明: 像素按行优先交错存储, 通道顺序为 BGR 或单通道灰度
// ==========================================

use std::time::{Duration, Instant};

/// 8 位交错像素图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl Image {
    /// 全零图像
    pub fn zeros(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0; width * height * channels],
        }
    }

    /// 单色填充的 BGR 图像
    pub fn filled(width: usize, height: usize, bgr: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&bgr);
        }
        Self {
            width,
            height,
            channels: 3,
            data,
        }
    }

    /// 校验缓冲区长度与尺寸一致
    pub fn from_raw(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> anyhow::Result<Self> {
        let expected = width * height * channels;
        if data.len() != expected {
            anyhow::bail!(
                "图像缓冲区长度不符: 期望 {} ({}x{}x{}), 实际 {}",
                expected,
                width,
                height,
                channels,
                data.len()
            );
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// 像素切片 (越界返回 None)
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * self.channels;
        self.data.get(start..start + self.channels)
    }

    fn row(&self, y: usize) -> &[u8] {
        let stride = self.width * self.channels;
        &self.data[y * stride..(y + 1) * stride]
    }

    /// 将 source 拷贝到 (left, top) 处; 通道数须一致, 超出部分裁剪
    pub fn blit(&mut self, source: &Image, left: usize, top: usize) -> anyhow::Result<()> {
        if source.channels != self.channels {
            anyhow::bail!(
                "通道数不一致: 目标 {}, 来源 {}",
                self.channels,
                source.channels
            );
        }
        if left >= self.width || top >= self.height {
            return Ok(());
        }
        let columns = source.width.min(self.width - left);
        let rows = source.height.min(self.height - top);
        let stride = self.width * self.channels;
        for y in 0..rows {
            let src = &source.row(y)[..columns * self.channels];
            let start = (top + y) * stride + left * self.channels;
            self.data[start..start + src.len()].copy_from_slice(src);
        }
        Ok(())
    }
}

/// 绘图函数的输出
#[derive(Debug, Clone)]
pub struct PlotOutput {
    /// 各阶段耗时 (按执行顺序)
    pub duration: Vec<(String, Duration)>,
    pub image: Image,
}

impl PlotOutput {
    pub fn total_duration(&self) -> Duration {
        self.duration.iter().map(|(_, d)| *d).sum()
    }
}

// ==========================================
// Timer - 分阶段计时
// ==========================================
pub struct Timer {
    last: Instant,
    marks: Vec<(String, Duration)>,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            last: Instant::now(),
            marks: Vec::new(),
        }
    }

    /// 记录自上一个标记以来的耗时
    pub fn mark(&mut self, label: impl Into<String>) {
        let now = Instant::now();
        self.marks.push((label.into(), now - self.last));
        self.last = now;
    }

    pub fn stop(self) -> Vec<(String, Duration)> {
        self.marks
    }
}
