//! FLV Tag 编解码.
//!
//! 每个 Tag 由 11 字节头部、数据区和可选的 4 字节 PreviousTagSize 组成.
//! 数据区按 Tag 类型分派:
//! - 视频 (AVC) → [`VideoTag`]
//! - 音频 → [`AudioTag`]
//! - Script → [`MetadataTag`]
//! - 其他类型, 以及无法识别的音视频数据区 → [`PassthroughTag`], 原样保留字节

pub mod audio;
pub mod header;
pub mod metadata;
pub mod video;

use bytes::Bytes;
use log::{trace, warn};

use flvkit_core::{ByteWriter, FlvError, FlvResult};

pub use audio::{AacPacketType, AudioTag, SampleRate, SampleSize, SoundFormat, SoundType};
pub use header::{PREV_TAG_SIZE_LEN, TAG_HEADER_SIZE, TagHeader, TagKind, can_decode, tag_size};
pub use metadata::MetadataTag;
pub use video::{AvcPacketType, VideoTag};

/// 透传 Tag, 数据区不做解析
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughTag {
    /// 原始 Tag 类型
    pub kind: TagKind,
    /// 数据区原始字节
    pub data: Bytes,
}

/// Tag 数据区
#[derive(Debug, Clone, PartialEq)]
pub enum TagBody {
    /// 未解析的数据区
    Passthrough(PassthroughTag),
    /// 视频
    Video(VideoTag),
    /// 音频
    Audio(AudioTag),
    /// Script Data
    Metadata(MetadataTag),
}

/// FLV Tag
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// 时间戳 (毫秒)
    pub timestamp: u32,
    /// 数据区
    pub body: TagBody,
}

impl Tag {
    /// 创建视频 Tag
    pub fn video(timestamp: u32, video: VideoTag) -> Self {
        Self {
            timestamp,
            body: TagBody::Video(video),
        }
    }

    /// 创建音频 Tag
    pub fn audio(timestamp: u32, audio: AudioTag) -> Self {
        Self {
            timestamp,
            body: TagBody::Audio(audio),
        }
    }

    /// 创建 Script Tag
    pub fn metadata(timestamp: u32, metadata: MetadataTag) -> Self {
        Self {
            timestamp,
            body: TagBody::Metadata(metadata),
        }
    }

    /// 创建透传 Tag
    ///
    /// 用于 [`TagKind::Other`] 或解码器无法识别的视频/音频/Script 数据区.
    /// 编码结果与 `data` 逐字节一致, 但若 `kind` 为 Video/Audio/Script 且数据区
    /// 可以识别, 再次解码得到的是对应的专用变体而不是 Passthrough.
    pub fn passthrough(kind: TagKind, timestamp: u32, data: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            body: TagBody::Passthrough(PassthroughTag {
                kind,
                data: data.into(),
            }),
        }
    }

    /// Tag 类型
    pub fn kind(&self) -> TagKind {
        match &self.body {
            TagBody::Passthrough(p) => p.kind,
            TagBody::Video(_) => TagKind::Video,
            TagBody::Audio(_) => TagKind::Audio,
            TagBody::Metadata(_) => TagKind::Script,
        }
    }

    /// 数据区编码长度
    pub fn body_size(&self) -> usize {
        match &self.body {
            TagBody::Passthrough(p) => p.data.len(),
            TagBody::Video(v) => v.encoded_len(),
            TagBody::Audio(a) => a.encoded_len(),
            TagBody::Metadata(m) => m.encoded_len(),
        }
    }

    /// 编码后的总长度
    pub fn total_size(&self, trailing_size: bool) -> usize {
        TAG_HEADER_SIZE + self.body_size() + if trailing_size { PREV_TAG_SIZE_LEN } else { 0 }
    }

    /// 写入头部 + 数据区 (+ PreviousTagSize)
    ///
    /// PreviousTagSize = 11 + DataSize, 不含自身的 4 字节.
    pub fn write_to(&self, bw: &mut ByteWriter, trailing_size: bool) -> FlvResult<()> {
        let body_size = u32::try_from(self.body_size())
            .map_err(|_| FlvError::InvalidArgument("Tag 数据区过长".into()))?;
        let header = TagHeader {
            kind: self.kind(),
            data_size: body_size,
            timestamp: self.timestamp,
        };
        let start = bw.len();
        header.write_to(bw)?;

        match &self.body {
            TagBody::Passthrough(p) => bw.write_bytes(&p.data),
            TagBody::Video(v) => v.write_to(bw)?,
            TagBody::Audio(a) => a.write_to(bw)?,
            TagBody::Metadata(m) => m.write_to(bw)?,
        }
        debug_assert_eq!(bw.len() - start, TAG_HEADER_SIZE + body_size as usize);

        if trailing_size {
            bw.write_u32_be(TAG_HEADER_SIZE as u32 + body_size);
        }
        Ok(())
    }

    /// 编码为字节
    pub fn encode(&self, trailing_size: bool) -> FlvResult<Vec<u8>> {
        let mut bw = ByteWriter::with_capacity(self.total_size(trailing_size));
        self.write_to(&mut bw, trailing_size)?;
        Ok(bw.finish())
    }

    /// 从缓冲区开头解码一个 Tag
    ///
    /// 返回 Tag 与消耗的字节数 (11 + DataSize [+ 4]). 缓冲区中的 Tag
    /// 不完整时返回 `NeedMoreData`. Script 数据区损坏时返回
    /// `MalformedScriptData`, 此时 DataSize 仍然可信, 调用方可以跳过该 Tag.
    pub fn decode(data: &[u8], trailing_size: bool) -> FlvResult<(Self, usize)> {
        header::ensure_complete(data, trailing_size)?;
        let header = TagHeader::decode(data)?;
        let body_end = TAG_HEADER_SIZE + header.data_size as usize;
        let body = &data[TAG_HEADER_SIZE..body_end];

        let decoded = match header.kind {
            TagKind::Video => VideoTag::decode(body).map(TagBody::Video),
            TagKind::Audio => AudioTag::decode(body).map(TagBody::Audio),
            TagKind::Script => Some(TagBody::Metadata(MetadataTag::decode(body)?)),
            TagKind::Other(_) => None,
        };
        let body = decoded.unwrap_or_else(|| {
            if !matches!(header.kind, TagKind::Other(_)) {
                warn!(
                    "FLV: 无法识别的 {} Tag 数据区 ({} 字节), 按透传处理",
                    header.kind, header.data_size
                );
            }
            TagBody::Passthrough(PassthroughTag {
                kind: header.kind,
                data: Bytes::copy_from_slice(body),
            })
        });

        trace!(
            "FLV: tag kind={} size={} ts={}",
            header.kind, header.data_size, header.timestamp
        );

        let tag = Self {
            timestamp: header.timestamp,
            body,
        };
        Ok((tag, header.tag_size(trailing_size)))
    }
}
