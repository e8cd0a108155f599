// ==========================================
// 图像匹配工具 - 应用配置
// ==========================================
// 职责: 从 JSON 文件读取用户参数覆写与服务配置
// 格式:
// {
//   "parameters": { "<算法>": { "<参数>": <取值> } },
//   "initial_algorithm": "<算法>",
//   "channel_capacity": 64
// }
// 说明: 仅做结构解析, 参数合法性由 DefaultFiller 校验
// 说明: 其余顶层键 (如 base/query/dimensions/center/scale) 忽略并记录 debug 日志
// ==========================================

use crate::domain::types::{ParamValue, ParameterMap};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 未指定时的初始算法
pub const DEFAULT_INITIAL_ALGORITHM: &str = "Match Template";

/// 变更请求通道默认容量
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("读取配置文件失败: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件格式错误: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("配置项 parameters.\"{algorithm}\" 必须是 JSON 对象")]
    InvalidSection { algorithm: String },

    #[error("配置项 parameters.\"{algorithm}\".\"{name}\" 不是标量值: {value}")]
    InvalidValue {
        algorithm: String,
        name: String,
        value: String,
    },
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

// ==========================================
// AppConfig - 应用配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 算法 -> 参数覆写 (保持文件中的顺序)
    #[serde(default)]
    pub parameters: Map<String, Value>,

    #[serde(default)]
    pub initial_algorithm: Option<String>,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// 本工具不使用的顶层键
    #[serde(flatten)]
    pub ignored: Map<String, Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            parameters: Map::new(),
            initial_algorithm: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            ignored: Map::new(),
        }
    }
}

impl AppConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = serde_json::from_str(text)?;
        for key in config.ignored.keys() {
            tracing::debug!(key = %key, "忽略未使用的配置项");
        }
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.display(),
            algorithms = config.parameters.len(),
            "配置文件已加载"
        );
        Ok(config)
    }

    /// 转换为 DefaultFiller 的输入: 算法 -> 扁平参数表
    pub fn user_parameters(&self) -> Result<BTreeMap<String, ParameterMap>, ConfigLoadError> {
        let mut result = BTreeMap::new();
        for (algorithm, section) in &self.parameters {
            let section = section
                .as_object()
                .ok_or_else(|| ConfigLoadError::InvalidSection {
                    algorithm: algorithm.clone(),
                })?;

            let mut values = ParameterMap::new();
            for (name, raw) in section {
                let value =
                    ParamValue::from_json(raw).ok_or_else(|| ConfigLoadError::InvalidValue {
                        algorithm: algorithm.clone(),
                        name: name.clone(),
                        value: raw.to_string(),
                    })?;
                values.insert(name.clone(), value);
            }
            result.insert(algorithm.clone(), values);
        }
        Ok(result)
    }

    /// 初始算法: 显式配置 > parameters 中的第一个算法 > Match Template
    pub fn initial_algorithm(&self) -> String {
        self.initial_algorithm
            .clone()
            .or_else(|| self.parameters.keys().next().cloned())
            .unwrap_or_else(|| DEFAULT_INITIAL_ALGORITHM.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.initial_algorithm(), DEFAULT_INITIAL_ALGORITHM);
        assert!(config.user_parameters().unwrap().is_empty());
    }

    #[test]
    fn test_initial_algorithm_follows_file_order() {
        let config = AppConfig::from_json_str(
            r#"{"parameters": {"FLANN": {}, "Brute-Force": {"k": 2}}}"#,
        )
        .unwrap();
        assert_eq!(config.initial_algorithm(), "FLANN");

        let user = config.user_parameters().unwrap();
        assert_eq!(user["Brute-Force"]["k"], ParamValue::Int(2));
    }

    #[test]
    fn test_rejects_structured_values() {
        let config =
            AppConfig::from_json_str(r#"{"parameters": {"FLANN": {"trees": [1, 2]}}}"#).unwrap();
        assert!(matches!(
            config.user_parameters(),
            Err(ConfigLoadError::InvalidValue { .. })
        ));

        let config = AppConfig::from_json_str(r#"{"parameters": {"FLANN": 3}}"#).unwrap();
        assert!(matches!(
            config.user_parameters(),
            Err(ConfigLoadError::InvalidSection { .. })
        ));
    }

    #[test]
    fn test_unknown_top_level_keys_are_ignored() {
        let config = AppConfig::from_json_str(
            r#"{"base": "base.png", "scale": 1.5, "parameters": {"FLANN": {"k": 2}}}"#,
        )
        .unwrap();
        assert_eq!(config.ignored.len(), 2);
        assert_eq!(config.initial_algorithm(), "FLANN");
        assert_eq!(config.user_parameters().unwrap()["FLANN"]["k"], ParamValue::Int(2));
    }
}
