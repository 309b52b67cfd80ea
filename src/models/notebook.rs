//! Notebook 文档结构（只保留统计和批阅需要的字段）

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// 代码单元格类型
pub const CODE_CELL: &str = "code";
/// 报错输出类型
pub const OUTPUT_ERROR: &str = "error";
/// 携带 data 的输出类型
pub const DATA_OUTPUT_TYPES: [&str; 2] = ["display_data", "execute_result"];
/// 图片媒体类型前缀
pub const IMAGE_MEDIA_PREFIX: &str = "image/";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Notebook {
    #[serde(default)]
    pub cells: Option<Vec<Cell>>,
}

impl Notebook {
    /// 所有代码单元格（保持原有顺序）
    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.is_code())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub cell_type: String,
    #[serde(default, deserialize_with = "deserialize_multiline")]
    pub source: String,
    #[serde(default)]
    pub outputs: Option<Vec<Output>>,
}

impl Cell {
    pub fn is_code(&self) -> bool {
        self.cell_type == CODE_CELL
    }

    /// 输出列表（缺失或为 null 时为空）
    pub fn outputs(&self) -> &[Output] {
        self.outputs.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub output_type: String,
    #[serde(default)]
    pub data: Option<BTreeMap<String, JsonValue>>,
    #[serde(default, deserialize_with = "deserialize_multiline")]
    pub text: String,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub traceback: Option<Vec<String>>,
}

impl Output {
    pub fn is_error(&self) -> bool {
        self.output_type == OUTPUT_ERROR
    }

    pub fn is_data_output(&self) -> bool {
        DATA_OUTPUT_TYPES.contains(&self.output_type.as_str())
    }

    /// data 中是否包含 image/* 键
    pub fn has_image(&self) -> bool {
        self.is_data_output()
            && self
                .data
                .as_ref()
                .is_some_and(|data| data.keys().any(|key| key.starts_with(IMAGE_MEDIA_PREFIX)))
    }

    /// text/plain 文本（字符串或字符串数组）
    pub fn plain_text(&self) -> Option<String> {
        match self.data.as_ref()?.get("text/plain")? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Array(lines) => Some(
                lines
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .collect::<String>(),
            ),
            _ => None,
        }
    }
}

// source / text 既可能是字符串，也可能是字符串数组
fn deserialize_multiline<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{SeqAccess, Visitor};
    use std::fmt;

    struct MultilineVisitor;

    impl<'de> Visitor<'de> for MultilineVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(String::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(String::new())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut joined = String::new();
            while let Some(item) = seq.next_element::<JsonValue>()? {
                if let JsonValue::String(line) = item {
                    joined.push_str(&line);
                }
            }
            Ok(joined)
        }
    }

    deserializer.deserialize_any(MultilineVisitor)
}

// traceback：字符串数组中的非字符串元素直接忽略，单个字符串视为一行
fn deserialize_lines<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    JsonValue::String(line) => Some(line),
                    _ => None,
                })
                .collect(),
        ),
        JsonValue::String(line) => Some(vec![line]),
        _ => None,
    })
}
