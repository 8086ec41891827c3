//! 音频 Tag 数据.
//!
//! ```text
//! SoundFormat (4 bits): 0/3=Linear PCM, 2=MP3, 10=AAC, 11=Speex, ...
//! SoundRate (2 bits): 0=5.5kHz, 1=11kHz, 2=22kHz, 3=44kHz
//! SoundSize (1 bit): 0=8bit, 1=16bit
//! SoundType (1 bit): 0=mono, 1=stereo
//! [AAC: AACPacketType (1 byte): 0=Sequence Header, 1=Raw]
//! Data
//! ```

use bytes::Bytes;

use flvkit_core::{ByteReader, ByteWriter, FlvError, FlvResult};

/// FLV 音频编解码器 ID (SoundFormat)
const FLV_AUDIO_PCM_PLATFORM: u8 = 0;
const FLV_AUDIO_MP3: u8 = 2;
const FLV_AUDIO_PCM_LE: u8 = 3;
const FLV_AUDIO_AAC: u8 = 10;
const FLV_AUDIO_SPEEX: u8 = 11;

/// SoundFormat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundFormat {
    /// Linear PCM, 平台字节序
    LinearPcmPlatformEndian,
    /// MP3
    Mp3,
    /// Linear PCM, 小端
    LinearPcmLittleEndian,
    /// AAC
    Aac,
    /// Speex
    Speex,
    /// 其他格式码 (0..=15)
    Other(u8),
}

impl SoundFormat {
    /// 格式码
    pub fn code(self) -> u8 {
        match self {
            Self::LinearPcmPlatformEndian => FLV_AUDIO_PCM_PLATFORM,
            Self::Mp3 => FLV_AUDIO_MP3,
            Self::LinearPcmLittleEndian => FLV_AUDIO_PCM_LE,
            Self::Aac => FLV_AUDIO_AAC,
            Self::Speex => FLV_AUDIO_SPEEX,
            Self::Other(code) => code,
        }
    }
}

impl From<u8> for SoundFormat {
    fn from(code: u8) -> Self {
        match code {
            FLV_AUDIO_PCM_PLATFORM => Self::LinearPcmPlatformEndian,
            FLV_AUDIO_MP3 => Self::Mp3,
            FLV_AUDIO_PCM_LE => Self::LinearPcmLittleEndian,
            FLV_AUDIO_AAC => Self::Aac,
            FLV_AUDIO_SPEEX => Self::Speex,
            other => Self::Other(other),
        }
    }
}

/// SoundRate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRate {
    /// 5.5 kHz
    Rate5500,
    /// 11 kHz
    Rate11025,
    /// 22 kHz
    Rate22050,
    /// 44 kHz
    Rate44100,
}

impl SampleRate {
    fn code(self) -> u8 {
        match self {
            Self::Rate5500 => 0,
            Self::Rate11025 => 1,
            Self::Rate22050 => 2,
            Self::Rate44100 => 3,
        }
    }

    fn from_code(code: u8) -> Self {
        match code & 0x03 {
            0 => Self::Rate5500,
            1 => Self::Rate11025,
            2 => Self::Rate22050,
            _ => Self::Rate44100,
        }
    }

    /// 采样率 (Hz)
    pub fn hz(self) -> u32 {
        match self {
            Self::Rate5500 => 5512,
            Self::Rate11025 => 11025,
            Self::Rate22050 => 22050,
            Self::Rate44100 => 44100,
        }
    }
}

/// SoundSize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSize {
    /// 8 位
    Bits8,
    /// 16 位
    Bits16,
}

/// SoundType
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundType {
    /// 单声道
    Mono,
    /// 立体声
    Stereo,
}

impl SoundType {
    /// 声道数
    pub fn channels(self) -> u32 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// AACPacketType
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AacPacketType {
    /// AudioSpecificConfig
    SequenceHeader,
    /// 原始 AAC 帧
    Raw,
}

impl AacPacketType {
    fn code(self) -> u8 {
        match self {
            Self::SequenceHeader => 0,
            Self::Raw => 1,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::SequenceHeader),
            1 => Some(Self::Raw),
            _ => None,
        }
    }
}

/// 音频 Tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTag {
    /// 编码格式
    pub format: SoundFormat,
    /// 采样率
    pub sample_rate: SampleRate,
    /// 采样位深
    pub sample_size: SampleSize,
    /// 声道模式
    pub sound_type: SoundType,
    /// AAC 子包类型, 仅当 `format == Aac` 时存在
    pub aac_packet_type: Option<AacPacketType>,
    /// 子头部之后的数据
    pub data: Bytes,
}

impl AudioTag {
    /// 创建 AAC 音频 Tag (44kHz / 16bit / stereo, AAC 实际参数由 sequence header 决定)
    pub fn aac(packet_type: AacPacketType, data: impl Into<Bytes>) -> Self {
        Self {
            format: SoundFormat::Aac,
            sample_rate: SampleRate::Rate44100,
            sample_size: SampleSize::Bits16,
            sound_type: SoundType::Stereo,
            aac_packet_type: Some(packet_type),
            data: data.into(),
        }
    }

    /// 子头部长度
    fn header_len(&self) -> usize {
        if self.format == SoundFormat::Aac { 2 } else { 1 }
    }

    /// 数据区编码长度
    pub fn encoded_len(&self) -> usize {
        self.header_len() + self.data.len()
    }

    /// 写入数据区
    pub fn write_to(&self, bw: &mut ByteWriter) -> FlvResult<()> {
        let format = self.format.code();
        if format > 0x0F {
            return Err(FlvError::InvalidArgument(format!(
                "SoundFormat={format} 超出 4 位范围"
            )));
        }
        let is_aac = self.format == SoundFormat::Aac;
        if is_aac != self.aac_packet_type.is_some() {
            return Err(FlvError::InvalidArgument(
                "AACPacketType 仅且必须出现在 AAC 音频中".into(),
            ));
        }

        let size_bit = u8::from(self.sample_size == SampleSize::Bits16);
        let type_bit = u8::from(self.sound_type == SoundType::Stereo);
        bw.write_u8((format << 4) | (self.sample_rate.code() << 2) | (size_bit << 1) | type_bit);
        if let Some(packet_type) = self.aac_packet_type {
            bw.write_u8(packet_type.code());
        }
        bw.write_bytes(&self.data);
        Ok(())
    }

    /// 解码数据区
    ///
    /// 返回 `None` 表示数据区过短或 AACPacketType 未知, 调用方按透传 Tag 处理.
    pub fn decode(body: &[u8]) -> Option<Self> {
        let mut br = ByteReader::new(body);
        let audio_header = br.read_u8().ok()?;
        let format = SoundFormat::from((audio_header >> 4) & 0x0F);
        let sample_rate = SampleRate::from_code((audio_header >> 2) & 0x03);
        let sample_size = if (audio_header >> 1) & 0x01 == 1 {
            SampleSize::Bits16
        } else {
            SampleSize::Bits8
        };
        let sound_type = if audio_header & 0x01 == 1 {
            SoundType::Stereo
        } else {
            SoundType::Mono
        };

        let aac_packet_type = if format == SoundFormat::Aac {
            Some(AacPacketType::from_code(br.read_u8().ok()?)?)
        } else {
            None
        };

        Some(Self {
            format,
            sample_rate,
            sample_size,
            sound_type,
            aac_packet_type,
            data: Bytes::copy_from_slice(br.read_rest()),
        })
    }
}
