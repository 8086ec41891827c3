//! # flvkit
//!
//! 纯 Rust 实现的 FLV 容器编解码库.
//!
//! - **流式解封装**: 从任意切分的字节流中增量重组完整 Tag
//! - **编码**: 文件头、Tag 头部、音视频/Script 数据区的精确字节布局
//! - **Script Data**: onMetaData 使用的 AMF0 子集
//!
//! # 快速开始
//!
//! ```rust
//! use flvkit::format::{Preamble, StreamReader, Tag};
//! use flvkit::format::tag::VideoTag;
//!
//! let mut data = Preamble::new(false, true).encode(true);
//! let tag = Tag::video(1000, VideoTag::nalu(true, 0, vec![0xAA, 0xBB]));
//! data.extend_from_slice(&tag.encode(true).unwrap());
//!
//! let mut reader = StreamReader::new();
//! let mut tags = reader.feed(&data[..10]).unwrap();
//! tags.extend(reader.feed(&data[10..]).unwrap());
//! assert_eq!(tags, vec![tag]);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `flvkit-core` | 错误类型与大端字节读写 |
//! | `flvkit-format` | 文件头, Tag, Script Data, 流式重组 |

/// 错误类型与字节读写工具
pub use flvkit_core as core;

/// FLV 容器编解码
pub use flvkit_format as format;

/// 获取 flvkit 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
