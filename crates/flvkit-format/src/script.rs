//! Script Data (AMF0 子集) 编解码.
//!
//! onMetaData 等 Script Tag 的数据区结构:
//! ```text
//! Name  := 0x02 u16-BE 长度 + 字节            ; 必须是字符串
//! Value := 0x00 f64-BE                        ; Number
//!        | 0x01 u8                            ; Boolean, 非 0 为真
//!        | 0x02 u16-BE 长度 + 字节            ; String
//!        | 0x08 u32-BE 数量 (Key Value)*数量  ; ECMA Array
//! Key   := u16-BE 长度 + 字节                 ; 属性名不带类型标记
//! ```
//!
//! 只处理一层扁平的 ECMA Array, 数组成员只能是 Number / Boolean / String.
//! [`decode_script_values`] 保留值的原始类型, [`decode_script_data`] 把值统一转成字符串.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};

use flvkit_core::{ByteReader, ByteWriter, FlvError, FlvResult};

/// AMF0 类型标记
pub const AMF_NUMBER: u8 = 0x00;
pub const AMF_BOOLEAN: u8 = 0x01;
pub const AMF_STRING: u8 = 0x02;
pub const AMF_ECMA_ARRAY: u8 = 0x08;
pub const AMF_OBJECT_END: u8 = 0x09;

/// Script 值
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// 双精度浮点
    Number(f64),
    /// 布尔
    Boolean(bool),
    /// 字符串
    String(String),
}

impl ScriptValue {
    /// 带类型标记的编码长度
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Number(_) => 1 + 8,
            Self::Boolean(_) => 1 + 1,
            Self::String(v) => 1 + 2 + v.len(),
        }
    }

    /// 按数值解释, String 会尝试解析
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Boolean(_) => None,
            Self::String(v) => v.trim().parse().ok(),
        }
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ScriptValue {
                fn from(v: $ty) -> Self {
                    Self::Number(v as f64)
                }
            }
        )*
    };
}

impl_from_number!(f32, i32, u32, i64, u64);

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl fmt::Display for ScriptValue {
    /// Number 按十进制输出 (10.0 → "10"), Boolean 输出 "1"/"0"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{}", u8::from(*v)),
            Self::String(v) => f.write_str(v),
        }
    }
}

/// 解码出的 Script 数据 (值已转为字符串)
pub type ScriptData = (String, BTreeMap<String, String>);

/// 保留原始类型的属性表
pub type ScriptProperties = BTreeMap<String, ScriptValue>;

/// 带边界检查的 Script 游标
///
/// 底层读取不足时统一转换为 `MalformedScriptData`.
struct ScriptCursor<'a> {
    inner: ByteReader<'a>,
}

impl<'a> ScriptCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            inner: ByteReader::new(data),
        }
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn take(&mut self, count: usize, what: &str) -> FlvResult<&'a [u8]> {
        let remaining = self.inner.remaining();
        self.inner.read_bytes(count).map_err(|_| {
            FlvError::MalformedScriptData(format!(
                "{what} 需要 {count} 字节, 剩余 {remaining} 字节"
            ))
        })
    }

    fn read_u8(&mut self, what: &str) -> FlvResult<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn read_u16(&mut self, what: &str) -> FlvResult<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self, what: &str) -> FlvResult<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f64(&mut self) -> FlvResult<f64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8, "Number")?);
        Ok(f64::from_be_bytes(raw))
    }

    /// 读取不带类型标记的字符串 (u16 长度 + 字节)
    fn read_string(&mut self) -> FlvResult<String> {
        let len = self.read_u16("字符串长度")? as usize;
        let bytes = self.take(len, "字符串内容")?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_owned()),
            Err(e) => {
                warn!("Script: 字符串不是合法 UTF-8 ({e}), 非法字节已替换为 U+FFFD");
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }

    /// 按类型标记读取一个标量值
    fn read_scalar(&mut self, marker: u8) -> FlvResult<ScriptValue> {
        match marker {
            AMF_NUMBER => Ok(ScriptValue::Number(self.read_f64()?)),
            AMF_BOOLEAN => Ok(ScriptValue::Boolean(self.read_u8("Boolean")? != 0)),
            AMF_STRING => Ok(ScriptValue::String(self.read_string()?)),
            other => Err(FlvError::MalformedScriptData(format!(
                "未知值类型 0x{other:02X}"
            ))),
        }
    }
}

/// 解码 Script Tag 数据区, 值转为字符串
///
/// Number 按十进制输出, Boolean 输出 "1"/"0". 其余规则见 [`decode_script_values`].
pub fn decode_script_data(body: &[u8]) -> FlvResult<ScriptData> {
    let (name, values) = decode_script_values(body)?;
    let properties = values
        .into_iter()
        .map(|(key, value)| (key, value.to_string()))
        .collect();
    Ok((name, properties))
}

/// 解码 Script Tag 数据区, 保留值的原始类型
///
/// 名称之后的值必须是 ECMA Array 才会收集属性, 其他类型直接返回空表.
/// 数组按声明的数量读取, 数量之后的多余字节 (如 `00 00 09` 结束标记) 被忽略.
/// 重复的属性名以最后一次为准.
pub fn decode_script_values(body: &[u8]) -> FlvResult<(String, ScriptProperties)> {
    let mut cursor = ScriptCursor::new(body);

    let marker = cursor.read_u8("名称类型")?;
    if marker != AMF_STRING {
        return Err(FlvError::MalformedScriptData(format!(
            "名称类型应为 String, 实际为 0x{marker:02X}"
        )));
    }
    let name = cursor.read_string()?;

    let mut properties = BTreeMap::new();
    if cursor.is_empty() {
        return Ok((name, properties));
    }

    let marker = cursor.read_u8("值类型")?;
    if marker != AMF_ECMA_ARRAY {
        debug!("Script: {name} 的值类型为 0x{marker:02X}, 不收集属性");
        return Ok((name, properties));
    }

    let count = cursor.read_u32("数组长度")?;
    for _ in 0..count {
        let key = cursor.read_string()?;
        let marker = cursor.read_u8("属性值类型")?;
        let value = cursor.read_scalar(marker)?;
        properties.insert(key, value);
    }

    debug!("Script: {name}, {} 个属性", properties.len());
    Ok((name, properties))
}

/// 写入不带类型标记的字符串
fn write_string(bw: &mut ByteWriter, s: &str) -> FlvResult<()> {
    let len = u16::try_from(s.len()).map_err(|_| {
        FlvError::InvalidArgument(format!("字符串长度 {} 超出 65535", s.len()))
    })?;
    bw.write_u16_be(len);
    bw.write_bytes(s.as_bytes());
    Ok(())
}

/// 写入带类型标记的标量值
pub fn write_value(bw: &mut ByteWriter, value: &ScriptValue) -> FlvResult<()> {
    match value {
        ScriptValue::Number(v) => {
            bw.write_u8(AMF_NUMBER);
            bw.write_f64_be(*v);
        }
        ScriptValue::Boolean(v) => {
            bw.write_u8(AMF_BOOLEAN);
            bw.write_u8(u8::from(*v));
        }
        ScriptValue::String(v) => {
            bw.write_u8(AMF_STRING);
            write_string(bw, v)?;
        }
    }
    Ok(())
}

/// 写入 Script Tag 数据区
///
/// 名称写成 String, 属性写成 ECMA Array, 值按各自类型写出, 末尾附 `00 00 09`.
pub fn encode_script_data<'a, I>(bw: &mut ByteWriter, name: &str, properties: I) -> FlvResult<()>
where
    I: ExactSizeIterator<Item = (&'a str, ScriptValue)>,
{
    bw.write_u8(AMF_STRING);
    write_string(bw, name)?;

    let count = u32::try_from(properties.len())
        .map_err(|_| FlvError::InvalidArgument("属性数量超出 u32".into()))?;
    bw.write_u8(AMF_ECMA_ARRAY);
    bw.write_u32_be(count);
    for (key, value) in properties {
        write_string(bw, key)?;
        write_value(bw, &value)?;
    }

    bw.write_u16_be(0);
    bw.write_u8(AMF_OBJECT_END);
    Ok(())
}

/// 属性表编码后的长度
pub fn encoded_len(name: &str, properties: &ScriptProperties) -> usize {
    let entries: usize = properties
        .iter()
        .map(|(key, value)| 2 + key.len() + value.encoded_len())
        .sum();
    1 + 2 + name.len() + 1 + 4 + entries + 3
}
