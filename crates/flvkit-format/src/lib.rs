//! # flvkit-format
//!
//! FLV 容器格式的编解码与流式解封装.
//!
//! - [`preamble`]: 9 字节 FLV 文件头
//! - [`tag`]: 11 字节 Tag 头部以及音频/视频/Script/透传四种 Tag 体
//! - [`script`]: onMetaData 等 Script Tag 使用的 AMF0 子集
//! - [`reader`]: 从任意切分的字节流中增量重组完整 Tag
//! - [`writer`]: 将文件头和 Tag 写入输出
//! - [`walk`]: 借助 PreviousTagSize 从尾部反向遍历 Tag

pub mod preamble;
pub mod probe;
pub mod reader;
pub mod script;
pub mod tag;
pub mod walk;
pub mod writer;

// 重导出常用类型
pub use preamble::{Preamble, PreambleFlags};
pub use reader::{MetadataPolicy, ReaderConfig, StreamReader};
pub use tag::{Tag, TagBody, TagKind};
pub use writer::FlvWriter;
