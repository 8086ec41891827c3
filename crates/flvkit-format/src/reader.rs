//! FLV 流式重组器.
//!
//! 调用方以任意切分方式追加字节, 重组器在缓冲区中攒够一个完整 Tag 后
//! 才解码并前移读取位置. 不完整的 Tag 原样留在缓冲区中, 等待下一次 `feed`,
//! 因此无论字节如何切分, 输出的 Tag 序列都相同.
//!
//! 缓冲区是一段可增长的 `Vec<u8>` 加一个已消费游标, 已消费前缀超过阈值后
//! 才整体前移, 避免每解出一个 Tag 就搬移一次数据.

use log::{debug, warn};

use flvkit_core::{FlvError, FlvResult};

use crate::preamble::Preamble;
use crate::tag::{Tag, TagHeader, can_decode};

/// 默认的缓冲区整理阈值 (64 KB)
const DEFAULT_COMPACT_THRESHOLD: usize = 64 * 1024;

/// Script Tag 损坏时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataPolicy {
    /// 返回 `MalformedScriptData`, 损坏的 Tag 留在缓冲区头部
    #[default]
    Fail,
    /// 按 DataSize 跳过该 Tag 并记录警告
    Skip,
}

/// 重组器配置
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Tag 之后 (以及文件头之后) 是否带 4 字节 PreviousTagSize
    pub trailing_size: bool,
    /// Script Tag 损坏时的处理策略
    pub metadata_policy: MetadataPolicy,
    /// 已消费前缀达到该字节数时整理缓冲区
    pub compact_threshold: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            trailing_size: true,
            metadata_policy: MetadataPolicy::Fail,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }
}

impl ReaderConfig {
    /// 设置是否带 PreviousTagSize
    pub fn with_trailing_size(mut self, trailing_size: bool) -> Self {
        self.trailing_size = trailing_size;
        self
    }

    /// 设置 Script Tag 损坏时的处理策略
    pub fn with_metadata_policy(mut self, policy: MetadataPolicy) -> Self {
        self.metadata_policy = policy;
        self
    }

    /// 设置缓冲区整理阈值
    pub fn with_compact_threshold(mut self, threshold: usize) -> Self {
        self.compact_threshold = threshold;
        self
    }
}

/// 重组器状态
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReaderState {
    /// 等待文件头
    AwaitingPreamble,
    /// 逐个读取 Tag
    Tags,
    /// 文件头无效, 不可恢复
    Failed(String),
}

/// FLV 流式重组器
#[derive(Debug)]
pub struct StreamReader {
    /// 配置
    config: ReaderConfig,
    /// 累积缓冲区
    buffer: Vec<u8>,
    /// 缓冲区中已消费的前缀长度
    consumed: usize,
    /// 当前状态
    state: ReaderState,
    /// 已解析的文件头
    preamble: Option<Preamble>,
}

impl Default for StreamReader {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamReader {
    /// 使用默认配置创建重组器
    pub fn new() -> Self {
        Self::with_config(ReaderConfig::default())
    }

    /// 使用指定配置创建重组器
    pub fn with_config(config: ReaderConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            consumed: 0,
            state: ReaderState::AwaitingPreamble,
            preamble: None,
        }
    }

    /// 配置
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// 已解析的文件头
    pub fn preamble(&self) -> Option<Preamble> {
        self.preamble
    }

    /// 缓冲区中尚未消费的字节数
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() - self.consumed
    }

    /// 是否已因文件头无效而失效
    pub fn is_failed(&self) -> bool {
        matches!(self.state, ReaderState::Failed(_))
    }

    /// 尚未消费的数据
    fn pending(&self) -> &[u8] {
        &self.buffer[self.consumed..]
    }

    /// 追加字节并返回当前所有完整的 Tag
    ///
    /// 数据不足不是错误, 返回空列表即可. 文件头无效时返回
    /// `InvalidPreamble`, 此后每次调用都返回同样的错误.
    ///
    /// Script Tag 损坏且策略为 [`MetadataPolicy::Fail`] 时: 如果本次已解出
    /// 其他 Tag, 先返回这些 Tag; 否则返回 `MalformedScriptData`. 损坏的 Tag
    /// 保留在缓冲区头部, 调用方可以用 [`skip_pending_tag`](Self::skip_pending_tag)
    /// 跳过它后继续.
    pub fn feed(&mut self, data: &[u8]) -> FlvResult<Vec<Tag>> {
        if let ReaderState::Failed(reason) = &self.state {
            return Err(FlvError::InvalidPreamble(reason.clone()));
        }

        self.buffer.extend_from_slice(data);

        if self.state == ReaderState::AwaitingPreamble && !self.read_preamble()? {
            return Ok(Vec::new());
        }

        let trailing_size = self.config.trailing_size;
        let mut tags = Vec::new();
        while can_decode(self.pending(), trailing_size) {
            match Tag::decode(self.pending(), trailing_size) {
                Ok((tag, size)) => {
                    self.consumed += size;
                    tags.push(tag);
                }
                Err(err @ FlvError::MalformedScriptData(_)) => match self.config.metadata_policy {
                    MetadataPolicy::Skip => {
                        warn!("FLV: 跳过损坏的 Script Tag: {err}");
                        self.skip_pending_tag();
                    }
                    MetadataPolicy::Fail if tags.is_empty() => {
                        self.compact();
                        return Err(err);
                    }
                    MetadataPolicy::Fail => break,
                },
                Err(err) => return Err(err),
            }
        }

        self.compact();
        Ok(tags)
    }

    /// 跳过缓冲区头部的完整 Tag (不解码数据区)
    ///
    /// 返回 false 表示头部还没有完整的 Tag.
    pub fn skip_pending_tag(&mut self) -> bool {
        let trailing_size = self.config.trailing_size;
        if self.state != ReaderState::Tags || !can_decode(self.pending(), trailing_size) {
            return false;
        }
        match TagHeader::decode(self.pending()) {
            Ok(header) => {
                self.consumed += header.tag_size(trailing_size);
                true
            }
            Err(_) => false,
        }
    }

    /// 尝试解析文件头, 返回是否已解析
    fn read_preamble(&mut self) -> FlvResult<bool> {
        match Preamble::decode(self.pending(), self.config.trailing_size) {
            Ok((preamble, size)) => {
                debug!(
                    "FLV: has_audio={} has_video={}",
                    preamble.has_audio(),
                    preamble.has_video()
                );
                self.preamble = Some(preamble);
                self.consumed += size;
                self.state = ReaderState::Tags;
                Ok(true)
            }
            Err(FlvError::NeedMoreData) => Ok(false),
            Err(FlvError::InvalidPreamble(reason)) => {
                self.state = ReaderState::Failed(reason.clone());
                self.buffer.clear();
                self.consumed = 0;
                Err(FlvError::InvalidPreamble(reason))
            }
            Err(err) => Err(err),
        }
    }

    /// 整理缓冲区, 丢弃已消费前缀
    fn compact(&mut self) {
        if self.consumed == self.buffer.len() {
            self.buffer.clear();
            self.consumed = 0;
        } else if self.consumed >= self.config.compact_threshold {
            self.buffer.drain(..self.consumed);
            self.consumed = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{ScriptValue, encode_script_data};
    use crate::tag::{
        AacPacketType, AudioTag, AvcPacketType, MetadataTag, TagBody, TagKind, VideoTag,
    };
    use flvkit_core::ByteWriter;

    /// 构造带若干 Tag 的 FLV 字节流
    fn build_stream(tags: &[Tag]) -> Vec<u8> {
        let mut data = Preamble::new(true, true).encode(true);
        for tag in tags {
            data.extend_from_slice(&tag.encode(true).unwrap());
        }
        data
    }

    fn sample_tags() -> Vec<Tag> {
        let mut meta = MetadataTag::new("onMetaData");
        meta.set_property("duration", 2);
        vec![
            Tag::metadata(0, meta),
            Tag::video(0, VideoTag::sequence_header(vec![1, 0x42, 0, 0x1E])),
            Tag::audio(0, AudioTag::aac(AacPacketType::SequenceHeader, vec![0x12, 0x10])),
            Tag::video(0, VideoTag::nalu(true, 66, vec![0xDE, 0xAD])),
            Tag::audio(23, AudioTag::aac(AacPacketType::Raw, vec![0xBE, 0xEF])),
            Tag::video(33, VideoTag::nalu(false, -33, vec![0xCA, 0xFE])),
            Tag::passthrough(TagKind::Other(99), 40, vec![1, 2, 3]),
        ]
    }

    /// 构造名称正确但数组内含未知值类型的 Script Tag
    fn malformed_script_tag() -> Tag {
        let mut bw = ByteWriter::new();
        encode_script_data(
            &mut bw,
            "onMetaData",
            [("duration", ScriptValue::Number(1.0))].into_iter(),
        )
        .unwrap();
        let mut body = bw.finish();
        // 把 Number 标记改成未知类型 0x05
        let marker_pos = 1 + 2 + 10 + 1 + 4 + 2 + 8;
        body[marker_pos] = 0x05;
        Tag::passthrough(TagKind::Script, 0, body)
    }

    #[test]
    fn test_一次性输入() {
        let tags = sample_tags();
        let mut reader = StreamReader::new();
        let out = reader.feed(&build_stream(&tags)).unwrap();
        assert_eq!(out, tags);
        assert_eq!(reader.buffered_len(), 0);
        let preamble = reader.preamble().unwrap();
        assert!(preamble.has_audio() && preamble.has_video());
    }

    #[test]
    fn test_逐字节输入() {
        let tags = sample_tags();
        let data = build_stream(&tags);
        let mut reader = StreamReader::new();
        let mut out = Vec::new();
        for byte in &data {
            out.extend(reader.feed(std::slice::from_ref(byte)).unwrap());
        }
        assert_eq!(out, tags);
    }

    #[test]
    fn test_任意切分点() {
        let tags = sample_tags();
        let data = build_stream(&tags);
        for split in 0..=data.len() {
            let mut reader = StreamReader::new();
            let mut out = reader.feed(&data[..split]).unwrap();
            out.extend(reader.feed(&data[split..]).unwrap());
            assert_eq!(out, tags, "split={split}");
        }
    }

    #[test]
    fn test_不输出不完整的_tag() {
        let tags = sample_tags();
        let data = build_stream(&tags);
        let mut reader = StreamReader::new();
        // 去掉最后一个字节
        let out = reader.feed(&data[..data.len() - 1]).unwrap();
        assert_eq!(out.len(), tags.len() - 1);
        assert_eq!(reader.buffered_len(), tags.last().unwrap().total_size(true) - 1);
        let out = reader.feed(&data[data.len() - 1..]).unwrap();
        assert_eq!(out, vec![tags.last().unwrap().clone()]);
    }

    #[test]
    fn test_只有文件头() {
        let preamble = Preamble::new(false, true).encode(false);
        let mut reader = StreamReader::new();
        assert!(reader.feed(&preamble).unwrap().is_empty());
        assert!(reader.preamble().is_none());

        // 补上 PreviousTagSize0 后文件头解析完成, 但仍没有 Tag
        assert!(reader.feed(&[0, 0, 0, 0]).unwrap().is_empty());
        assert!(reader.preamble().unwrap().has_video());
        assert_eq!(reader.buffered_len(), 0);
    }

    #[test]
    fn test_文件头无效不可恢复() {
        let mut reader = StreamReader::new();
        let err = reader.feed(b"RIFF\x00\x00\x00\x00WAVE").unwrap_err();
        assert!(matches!(err, FlvError::InvalidPreamble(_)));
        assert!(reader.is_failed());

        let valid = build_stream(&sample_tags());
        assert!(matches!(
            reader.feed(&valid),
            Err(FlvError::InvalidPreamble(_))
        ));
    }

    #[test]
    fn test_数据偏移过大不再缓冲() {
        let mut preamble = Preamble::default().encode(true);
        preamble[5..9].copy_from_slice(&0x7FFF_FFFFu32.to_be_bytes());

        let mut reader = StreamReader::new();
        assert!(matches!(
            reader.feed(&preamble),
            Err(FlvError::InvalidPreamble(_))
        ));
        assert!(reader.is_failed());
        assert_eq!(reader.buffered_len(), 0);
    }

    #[test]
    fn test_视频场景() {
        let tag = Tag::video(1000, VideoTag::nalu(true, 0, vec![0xAA, 0xBB]));
        let mut data = Preamble::new(false, true).encode(true);
        data.extend_from_slice(&tag.encode(true).unwrap());

        for split in [5, 20] {
            let mut reader = StreamReader::new();
            let mut out = reader.feed(&data[..split]).unwrap();
            out.extend(reader.feed(&data[split..]).unwrap());
            assert_eq!(out.len(), 1);
            assert_eq!(out[0].timestamp, 1000);
            match &out[0].body {
                TagBody::Video(v) => {
                    assert!(v.is_keyframe);
                    assert_eq!(v.packet_type, AvcPacketType::Nalu);
                    assert_eq!(v.composition_time, 0);
                    assert_eq!(v.data.as_ref(), &[0xAA, 0xBB]);
                }
                other => panic!("应为视频 Tag: {other:?}"),
            }
            let preamble = reader.preamble().unwrap();
            assert!(preamble.has_video() && !preamble.has_audio());
        }
    }

    #[test]
    fn test_script_损坏_fail_策略() {
        let good = Tag::video(0, VideoTag::nalu(true, 0, vec![1]));
        let after = Tag::video(40, VideoTag::nalu(false, 0, vec![2]));
        let data = build_stream(&[good.clone(), malformed_script_tag(), after.clone()]);

        let mut reader = StreamReader::new();
        // 先返回损坏 Tag 之前的 Tag
        assert_eq!(reader.feed(&data).unwrap(), vec![good]);
        // 再次调用时报告错误, 损坏的 Tag 仍在缓冲区中
        assert!(matches!(
            reader.feed(&[]),
            Err(FlvError::MalformedScriptData(_))
        ));
        assert!(matches!(
            reader.feed(&[]),
            Err(FlvError::MalformedScriptData(_))
        ));
        // 跳过后继续
        assert!(reader.skip_pending_tag());
        assert_eq!(reader.feed(&[]).unwrap(), vec![after]);
    }

    #[test]
    fn test_script_损坏_skip_策略() {
        let good = Tag::video(0, VideoTag::nalu(true, 0, vec![1]));
        let after = Tag::video(40, VideoTag::nalu(false, 0, vec![2]));
        let data = build_stream(&[good.clone(), malformed_script_tag(), after.clone()]);

        let config = ReaderConfig::default().with_metadata_policy(MetadataPolicy::Skip);
        let mut reader = StreamReader::with_config(config);
        assert_eq!(reader.feed(&data).unwrap(), vec![good, after]);
    }

    #[test]
    fn test_无_previous_tag_size() {
        let tags = sample_tags();
        let mut data = Preamble::default().encode(false);
        for tag in &tags {
            data.extend_from_slice(&tag.encode(false).unwrap());
        }
        let config = ReaderConfig::default().with_trailing_size(false);
        let mut reader = StreamReader::with_config(config);
        let mut out = reader.feed(&data[..30]).unwrap();
        out.extend(reader.feed(&data[30..]).unwrap());
        assert_eq!(out, tags);
    }

    #[test]
    fn test_缓冲区整理() {
        let tags = sample_tags();
        let data = build_stream(&tags);
        let config = ReaderConfig::default().with_compact_threshold(16);
        let mut reader = StreamReader::with_config(config);
        let mut out = Vec::new();
        for chunk in data.chunks(7) {
            out.extend(reader.feed(chunk).unwrap());
            // 已消费前缀不会超过阈值
            assert!(reader.consumed < 16, "consumed={}", reader.consumed);
        }
        assert_eq!(out, tags);
        assert!(reader.buffer.is_empty());
    }

    #[test]
    fn test_skip_pending_tag_不完整时无效() {
        let data = build_stream(&sample_tags());
        let mut reader = StreamReader::new();
        assert!(!reader.skip_pending_tag());
        reader.feed(&data[..20]).unwrap();
        assert!(!reader.skip_pending_tag());
        assert_eq!(reader.buffered_len(), 7);
    }
}
