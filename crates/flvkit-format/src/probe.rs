//! 格式探测.
//!
//! 通过文件头部数据和文件扩展名判断输入是否为 FLV.

use crate::preamble::{FLV_VERSION, PREAMBLE_SIZE, SIGNATURE};

/// 探测置信度
///
/// 数值越高, 表示对格式判断越有信心.
pub type ProbeScore = u32;

/// 最低探测分数 (仅根据扩展名)
pub const SCORE_EXTENSION: ProbeScore = 50;

/// 最高探测分数 (魔数完全匹配)
pub const SCORE_MAX: ProbeScore = 100;

/// 探测 FLV
///
/// - `data`: 文件开头的若干字节
/// - `filename`: 文件名 (可选, 用于扩展名匹配)
pub fn probe(data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
    // 检查 "FLV" 签名 + version
    if data.len() >= PREAMBLE_SIZE && data.starts_with(SIGNATURE) && data[3] == FLV_VERSION {
        return Some(SCORE_MAX);
    }

    let ext = filename.and_then(|name| name.rsplit_once('.')).map(|(_, ext)| ext);
    match ext {
        Some(ext) if ext.eq_ignore_ascii_case("flv") => Some(SCORE_EXTENSION),
        _ => None,
    }
}
