//! Script Tag (onMetaData 等).

use flvkit_core::{ByteWriter, FlvResult};

use crate::script::{self, ScriptProperties, ScriptValue};

/// Script Tag
///
/// 属性值保留 AMF 类型, 重新编码时 Number 仍写成 Number.
/// 需要字符串形式时用 [`property_string`](Self::property_string).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataTag {
    /// 名称, 如 "onMetaData"
    pub name: String,
    /// 属性表
    pub properties: ScriptProperties,
}

impl MetadataTag {
    /// 创建空属性表的 Script Tag
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: ScriptProperties::new(),
        }
    }

    /// 设置属性, 已存在则覆盖
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<ScriptValue>) {
        self.properties.insert(name.into(), value.into());
    }

    /// 获取属性
    pub fn property(&self, name: &str) -> Option<&ScriptValue> {
        self.properties.get(name)
    }

    /// 获取属性的字符串形式 (Number 按十进制, Boolean 为 "1"/"0")
    pub fn property_string(&self, name: &str) -> Option<String> {
        self.property(name).map(ToString::to_string)
    }

    /// 获取属性的字符串形式, 不存在时返回默认值
    pub fn property_or(&self, name: &str, default: &str) -> String {
        self.property_string(name).unwrap_or_else(|| default.to_string())
    }

    /// 按数值解析属性
    pub fn property_f64(&self, name: &str) -> Option<f64> {
        self.property(name)?.as_f64()
    }

    /// onMetaData 中的时长 (秒)
    pub fn duration_secs(&self) -> Option<f64> {
        self.property_f64("duration").filter(|dur| *dur > 0.0 && dur.is_finite())
    }

    /// 数据区编码长度
    pub fn encoded_len(&self) -> usize {
        script::encoded_len(&self.name, &self.properties)
    }

    /// 写入数据区
    pub fn write_to(&self, bw: &mut ByteWriter) -> FlvResult<()> {
        let properties = self
            .properties
            .iter()
            .map(|(key, value)| (key.as_str(), value.clone()));
        script::encode_script_data(bw, &self.name, properties)
    }

    /// 解码数据区
    pub fn decode(body: &[u8]) -> FlvResult<Self> {
        let (name, properties) = script::decode_script_values(body)?;
        Ok(Self { name, properties })
    }
}
