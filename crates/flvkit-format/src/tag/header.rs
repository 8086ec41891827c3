//! FLV Tag 头部 (11 bytes).
//!
//! ```text
//! TagType (1 byte): 8=Audio, 9=Video, 18=Script
//! DataSize (3 bytes, BE)
//! Timestamp (3 bytes, BE) + TimestampExtended (1 byte, 高8位)
//! StreamID (3 bytes, BE): always 0
//! ```

use std::fmt;

use flvkit_core::{ByteReader, ByteWriter, FlvError, FlvResult};

/// Tag 头部长度
pub const TAG_HEADER_SIZE: usize = 11;

/// PreviousTagSize 字段长度
pub const PREV_TAG_SIZE_LEN: usize = 4;

/// FLV Tag 类型
const TAG_AUDIO: u8 = 8;
const TAG_VIDEO: u8 = 9;
const TAG_SCRIPT: u8 = 18;

/// Tag 类型
///
/// 未识别的类型码保存在 `Other` 中, 按透传 Tag 处理.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// 音频
    Audio,
    /// 视频
    Video,
    /// Script Data (onMetaData 等)
    Script,
    /// 其他类型码
    Other(u8),
}

impl TagKind {
    /// 类型码
    pub fn code(self) -> u8 {
        match self {
            Self::Audio => TAG_AUDIO,
            Self::Video => TAG_VIDEO,
            Self::Script => TAG_SCRIPT,
            Self::Other(code) => code,
        }
    }
}

impl From<u8> for TagKind {
    fn from(code: u8) -> Self {
        match code {
            TAG_AUDIO => Self::Audio,
            TAG_VIDEO => Self::Video,
            TAG_SCRIPT => Self::Script,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::Script => write!(f, "script"),
            Self::Other(code) => write!(f, "other({code})"),
        }
    }
}

/// Tag 头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    /// Tag 类型
    pub kind: TagKind,
    /// Tag 数据区长度 (24 位)
    pub data_size: u32,
    /// 时间戳 (毫秒)
    pub timestamp: u32,
}

impl TagHeader {
    /// 写入 11 字节头部, StreamID 恒为 0
    pub fn write_to(&self, bw: &mut ByteWriter) -> FlvResult<()> {
        bw.write_u8(self.kind.code());
        bw.write_u24_be(self.data_size)?;
        // 低 24 位在前, 扩展的高 8 位在后
        bw.write_u24_be(self.timestamp & 0x00FF_FFFF)?;
        bw.write_u8((self.timestamp >> 24) as u8);
        bw.write_u24_be(0)?;
        Ok(())
    }

    /// 编码为 11 字节
    pub fn encode(&self) -> FlvResult<Vec<u8>> {
        let mut bw = ByteWriter::with_capacity(TAG_HEADER_SIZE);
        self.write_to(&mut bw)?;
        Ok(bw.finish())
    }

    /// 解码头部, 不足 11 字节返回 `NeedMoreData`
    pub fn decode(data: &[u8]) -> FlvResult<Self> {
        let mut br = ByteReader::new(data);
        let kind = TagKind::from(br.read_u8()?);
        let data_size = br.read_u24_be()?;
        let timestamp_low = br.read_u24_be()?;
        let timestamp_ext = br.read_u8()?;
        let _stream_id = br.read_u24_be()?;

        Ok(Self {
            kind,
            data_size,
            timestamp: (u32::from(timestamp_ext) << 24) | timestamp_low,
        })
    }

    /// 头部 + 数据区 (+ PreviousTagSize) 的总长度
    pub fn tag_size(&self, trailing_size: bool) -> usize {
        tag_size(self.data_size, trailing_size)
    }
}

/// 由数据区长度计算整个 Tag 占用的字节数
pub fn tag_size(data_size: u32, trailing_size: bool) -> usize {
    TAG_HEADER_SIZE + data_size as usize + if trailing_size { PREV_TAG_SIZE_LEN } else { 0 }
}

/// 缓冲区中是否已有一个完整的 Tag
///
/// 只读取 DataSize 字段, 不解码 Tag 内容.
pub fn can_decode(data: &[u8], trailing_size: bool) -> bool {
    if data.len() < TAG_HEADER_SIZE {
        return false;
    }
    let data_size = (u32::from(data[1]) << 16) | (u32::from(data[2]) << 8) | u32::from(data[3]);
    data.len() >= tag_size(data_size, trailing_size)
}

/// 确认缓冲区中的 Tag 完整, 否则返回 `NeedMoreData`
pub(crate) fn ensure_complete(data: &[u8], trailing_size: bool) -> FlvResult<()> {
    if can_decode(data, trailing_size) {
        Ok(())
    } else {
        Err(FlvError::NeedMoreData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_头部布局() {
        let header = TagHeader {
            kind: TagKind::Video,
            data_size: 0x01_0203,
            timestamp: 0xAB12_3456,
        };
        let data = header.encode().unwrap();
        assert_eq!(
            data,
            vec![9, 0x01, 0x02, 0x03, 0x12, 0x34, 0x56, 0xAB, 0, 0, 0]
        );
        assert_eq!(TagHeader::decode(&data).unwrap(), header);
    }

    #[test]
    fn test_保留字段解码时忽略() {
        let data = [8, 0, 0, 1, 0, 0, 10, 0, 0xFF, 0xFF, 0xFF];
        let header = TagHeader::decode(&data).unwrap();
        assert_eq!(header.kind, TagKind::Audio);
        assert_eq!(header.data_size, 1);
        assert_eq!(header.timestamp, 10);
    }

    #[test]
    fn test_数据区过长() {
        let header = TagHeader {
            kind: TagKind::Audio,
            data_size: 0x0100_0000,
            timestamp: 0,
        };
        assert!(matches!(header.encode(), Err(FlvError::InvalidArgument(_))));
    }

    #[test]
    fn test_头部不足() {
        assert!(TagHeader::decode(&[9, 0, 0]).unwrap_err().is_need_more_data());
    }

    #[test]
    fn test_can_decode_边界() {
        let mut data = TagHeader {
            kind: TagKind::Other(99),
            data_size: 3,
            timestamp: 0,
        }
        .encode()
        .unwrap();
        data.extend_from_slice(&[1, 2, 3]);
        data.extend_from_slice(&14u32.to_be_bytes());

        for len in 0..data.len() {
            assert!(!can_decode(&data[..len], true), "len={len}");
        }
        assert!(can_decode(&data, true));
        assert!(can_decode(&data[..14], false));
        assert!(!can_decode(&data[..13], false));

        data.push(0xFF);
        assert!(can_decode(&data, true));
    }

    #[test]
    fn test_tag_kind_转换() {
        for code in 0..=u8::MAX {
            assert_eq!(TagKind::from(code).code(), code);
        }
        assert_eq!(TagKind::from(18), TagKind::Script);
        assert_eq!(TagKind::from(99).to_string(), "other(99)");
    }
}
