//! # flvkit-core
//!
//! flvkit 的基础库, 提供统一错误类型以及带边界检查的大端字节读写工具.
//!
//! FLV 中的所有多字节整数都是大端序, 包括 24 位的 DataSize / Timestamp 字段,
//! 这里集中提供这些读写原语, 供 `flvkit-format` 中各编解码模块共用.

pub mod bytereader;
pub mod bytewriter;
pub mod error;

// 重导出常用类型
pub use bytereader::ByteReader;
pub use bytewriter::ByteWriter;
pub use error::{FlvError, FlvResult};
