// ==========================================
// 图像匹配工具 - 参数值类型定义
// ==========================================
// 职责: 参数类型 (bool/float/int/str) 与参数取值
// 序列化格式: 与 JSON 配置一致 (untagged)
// ==========================================

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// 扁平参数表: 参数名 -> 取值, 保持插入顺序 (current 按块顺序输出)
pub type ParameterMap = IndexMap<String, ParamValue>;

// ==========================================
// 参数类型 (Parameter Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Bool,
    Float,
    Int,
    Str,
}

impl ParamType {
    /// 规格中允许出现的全部类型名
    pub const ALL: [ParamType; 4] = [
        ParamType::Bool,
        ParamType::Float,
        ParamType::Int,
        ParamType::Str,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Bool => "bool",
            ParamType::Float => "float",
            ParamType::Int => "int",
            ParamType::Str => "str",
        }
    }

    /// 从规格中的类型名解析
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// 是否为数值类型 (允许 min/max/step)
    pub fn is_numeric(&self) -> bool {
        matches!(self, ParamType::Float | ParamType::Int)
    }

    /// 类型零值 (开启无值参数时的最后兜底)
    pub fn zero_value(&self) -> ParamValue {
        match self {
            ParamType::Bool => ParamValue::Bool(false),
            ParamType::Float => ParamValue::Float(0.0),
            ParamType::Int => ParamValue::Int(0),
            ParamType::Str => ParamValue::Str(String::new()),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 参数取值 (Parameter Value)
// ==========================================
// 红线: 类型严格匹配, Int 不能充当 Float
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// 取值对应的类型 (Null 无类型)
    pub fn param_type(&self) -> Option<ParamType> {
        match self {
            ParamValue::Null => None,
            ParamValue::Bool(_) => Some(ParamType::Bool),
            ParamValue::Int(_) => Some(ParamType::Int),
            ParamValue::Float(_) => Some(ParamType::Float),
            ParamValue::Str(_) => Some(ParamType::Str),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// 从 JSON 标量转换; 对象/数组返回 None
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(ParamValue::Null),
            Value::Bool(b) => Some(ParamValue::Bool(*b)),
            Value::Number(n) => {
                if n.is_f64() {
                    n.as_f64().map(ParamValue::Float)
                } else if let Some(i) = n.as_i64() {
                    Some(ParamValue::Int(i))
                } else {
                    n.as_f64().map(ParamValue::Float)
                }
            }
            Value::String(s) => Some(ParamValue::Str(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// 同类型数值比较; 类型不同或非数值返回 None
    pub fn numeric_cmp(&self, other: &ParamValue) -> Option<Ordering> {
        match (self, other) {
            (ParamValue::Int(a), ParamValue::Int(b)) => Some(a.cmp(b)),
            (ParamValue::Float(a), ParamValue::Float(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// 诊断路径中的下标写法, 例如 ["ORB"] 或 [1]
    pub fn path_key(&self) -> String {
        match self {
            ParamValue::Str(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => write!(f, "null"),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{:?}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ParamValue::Null)
    }
}
