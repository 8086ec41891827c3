//! 视频 Tag 数据 (AVC).
//!
//! ```text
//! FrameType (4 bits): 1=keyframe, 2=inter
//! CodecID (4 bits): 7=AVC(H.264)
//! AVCPacketType (1 byte): 0=SeqHeader, 1=NALU, 2=EndOfSeq
//! CompositionTimeOffset (3 bytes, BE, signed)
//! Data
//! ```

use bytes::Bytes;

use flvkit_core::{ByteReader, ByteWriter, FlvResult};

/// FLV 视频编解码器 ID: AVC
pub const FLV_CODEC_AVC: u8 = 7;

/// 视频子头部长度
pub const VIDEO_HEADER_SIZE: usize = 5;

const FRAME_TYPE_KEY: u8 = 1;
const FRAME_TYPE_INTER: u8 = 2;

/// AVCPacketType
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvcPacketType {
    /// AVCDecoderConfigurationRecord
    SequenceHeader,
    /// 一个或多个 NALU
    Nalu,
    /// 序列结束
    EndOfSequence,
}

impl AvcPacketType {
    /// 类型码
    pub fn code(self) -> u8 {
        match self {
            Self::SequenceHeader => 0,
            Self::Nalu => 1,
            Self::EndOfSequence => 2,
        }
    }

    /// 由类型码解析
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::SequenceHeader),
            1 => Some(Self::Nalu),
            2 => Some(Self::EndOfSequence),
            _ => None,
        }
    }
}

/// 视频 Tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTag {
    /// 是否为关键帧
    pub is_keyframe: bool,
    /// 子包类型
    pub packet_type: AvcPacketType,
    /// CompositionTimeOffset (毫秒, 有符号 24 位), pts = dts + cts
    pub composition_time: i32,
    /// 子头部之后的数据
    pub data: Bytes,
}

impl VideoTag {
    /// 创建 NALU 视频 Tag
    pub fn nalu(is_keyframe: bool, composition_time: i32, data: impl Into<Bytes>) -> Self {
        Self {
            is_keyframe,
            packet_type: AvcPacketType::Nalu,
            composition_time,
            data: data.into(),
        }
    }

    /// 创建 sequence header 视频 Tag
    pub fn sequence_header(config: impl Into<Bytes>) -> Self {
        Self {
            is_keyframe: true,
            packet_type: AvcPacketType::SequenceHeader,
            composition_time: 0,
            data: config.into(),
        }
    }

    /// 数据区编码长度
    pub fn encoded_len(&self) -> usize {
        VIDEO_HEADER_SIZE + self.data.len()
    }

    /// 写入数据区
    pub fn write_to(&self, bw: &mut ByteWriter) -> FlvResult<()> {
        let frame_type = if self.is_keyframe {
            FRAME_TYPE_KEY
        } else {
            FRAME_TYPE_INTER
        };
        bw.write_u8((frame_type << 4) | FLV_CODEC_AVC);
        bw.write_u8(self.packet_type.code());
        bw.write_i24_be(self.composition_time)?;
        bw.write_bytes(&self.data);
        Ok(())
    }

    /// 解码数据区
    ///
    /// 返回 `None` 表示不是可识别的 AVC 视频数据 (数据区过短、非 AVC、
    /// 未知帧类型或未知子包类型), 调用方按透传 Tag 处理.
    pub fn decode(body: &[u8]) -> Option<Self> {
        let mut br = ByteReader::new(body);
        let video_header = br.read_u8().ok()?;
        let frame_type = (video_header >> 4) & 0x0F;
        let codec_id = video_header & 0x0F;
        if codec_id != FLV_CODEC_AVC || !matches!(frame_type, FRAME_TYPE_KEY | FRAME_TYPE_INTER) {
            return None;
        }

        let packet_type = AvcPacketType::from_code(br.read_u8().ok()?)?;
        let composition_time = br.read_i24_be().ok()?;

        Some(Self {
            is_keyframe: frame_type == FRAME_TYPE_KEY,
            packet_type,
            composition_time,
            data: Bytes::copy_from_slice(br.read_rest()),
        })
    }
}
