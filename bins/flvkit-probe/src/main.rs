//! flvkit-probe - FLV Tag 探测工具
//!
//! 以固定大小的块读取文件并送入流式重组器, 列出每个 Tag 的类型、时间戳与关键字段.
//! 也可以只查看文件末尾的若干 Tag, 或把解出的 Tag 重新写成新文件.

mod logging;

use std::fs::File;
use std::io::{BufWriter, Read};
use std::process;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;

use flvkit_core::FlvError;
use flvkit_format::probe::probe;
use flvkit_format::tag::{AudioTag, TagBody, VideoTag};
use flvkit_format::walk::walk_backward;
use flvkit_format::{FlvWriter, MetadataPolicy, Preamble, ReaderConfig, StreamReader, Tag};

/// FLV Tag 探测工具
#[derive(Parser, Debug)]
#[command(name = "flvkit-probe", version, about = "纯 Rust FLV Tag 探测工具")]
struct Cli {
    /// 输入文件路径
    input: String,

    /// 每次送入重组器的字节数
    #[arg(long, default_value_t = 4096)]
    chunk_size: usize,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 只显示文件末尾的 N 个 Tag (借助 PreviousTagSize 反向定位)
    #[arg(long, value_name = "N")]
    tail: Option<usize>,

    /// 把解出的 Tag 重新编码写入该文件
    #[arg(long, value_name = "PATH")]
    rewrite: Option<String>,

    /// 跳过损坏的 Script Tag 而不是报错退出
    #[arg(long)]
    skip_bad_metadata: bool,

    /// 输入的 Tag 之后没有 PreviousTagSize 字段
    #[arg(long)]
    no_trailing_size: bool,

    /// 日志详细程度 (-v/-vv/-vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// 额外写入日志文件的目录
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,

    /// 静默模式 (只输出汇总)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================
// 输出结构体
// ============================================================

/// 文件头信息
#[derive(Debug, Serialize)]
struct PreambleInfo {
    version: u8,
    has_audio: bool,
    has_video: bool,
}

/// 单个 Tag 信息
#[derive(Debug, Serialize)]
struct TagInfo {
    index: usize,
    kind: String,
    timestamp: u32,
    size: usize,
    detail: String,
}

/// 汇总统计
#[derive(Debug, Serialize, Default)]
struct Summary {
    total_tags: usize,
    video_tags: usize,
    audio_tags: usize,
    script_tags: usize,
    other_tags: usize,
    total_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_timestamp: Option<u32>,
}

/// 完整探测结果
#[derive(Debug, Serialize)]
struct ProbeOutput {
    filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<PreambleInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<TagInfo>,
    summary: Summary,
}

impl Summary {
    fn record(&mut self, tag: &Tag, size: usize) {
        self.total_tags += 1;
        self.total_bytes += size;
        self.last_timestamp = Some(tag.timestamp);
        match &tag.body {
            TagBody::Video(_) => self.video_tags += 1,
            TagBody::Audio(_) => self.audio_tags += 1,
            TagBody::Metadata(meta) => {
                self.script_tags += 1;
                if let Some(dur) = meta.duration_secs() {
                    self.duration = Some(dur);
                }
            }
            TagBody::Passthrough(_) => self.other_tags += 1,
        }
    }
}

fn describe_video(v: &VideoTag) -> String {
    format!(
        "{:?} keyframe={} cts={} bytes={}",
        v.packet_type,
        v.is_keyframe,
        v.composition_time,
        v.data.len()
    )
}

fn describe_audio(a: &AudioTag) -> String {
    let mut text = format!(
        "{:?} {}Hz {:?} {}ch",
        a.format,
        a.sample_rate.hz(),
        a.sample_size,
        a.sound_type.channels()
    );
    if let Some(packet_type) = a.aac_packet_type {
        text.push_str(&format!(" {packet_type:?}"));
    }
    text.push_str(&format!(" bytes={}", a.data.len()));
    text
}

fn build_tag_info(index: usize, tag: &Tag, size: usize) -> TagInfo {
    let detail = match &tag.body {
        TagBody::Video(v) => describe_video(v),
        TagBody::Audio(a) => describe_audio(a),
        TagBody::Metadata(meta) => {
            let props: Vec<String> = meta
                .properties
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            format!("{} {{{}}}", meta.name, props.join(", "))
        }
        TagBody::Passthrough(p) => format!("raw bytes={}", p.data.len()),
    };
    TagInfo {
        index,
        kind: tag.kind().to_string(),
        timestamp: tag.timestamp,
        size,
        detail,
    }
}

fn preamble_info(preamble: &Preamble) -> PreambleInfo {
    PreambleInfo {
        version: preamble.version,
        has_audio: preamble.has_audio(),
        has_video: preamble.has_video(),
    }
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.log_dir.as_deref()) {
        eprintln!("警告: {e:#}");
    }

    if let Err(e) = run(&cli) {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.chunk_size == 0 {
        bail!("--chunk-size 必须大于 0");
    }

    let output = match cli.tail {
        Some(count) => probe_tail(cli, count)?,
        None => probe_stream(cli)?,
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("序列化 JSON 失败")?;
        println!("{json}");
    } else {
        print_text(&output, cli.quiet);
    }
    Ok(())
}

/// 收集解出的 Tag, 需要时同步写出
struct TagSink {
    writer: Option<FlvWriter<BufWriter<File>>>,
    trailing_size: bool,
    quiet: bool,
    tags: Vec<TagInfo>,
    summary: Summary,
}

impl TagSink {
    fn accept(&mut self, preamble: Option<Preamble>, decoded: Vec<Tag>) -> Result<()> {
        if let (Some(w), Some(preamble)) = (self.writer.as_mut(), preamble) {
            if w.bytes_written() == 0 {
                w.write_header(&preamble)?;
            }
        }

        for tag in decoded {
            let size = tag.total_size(self.trailing_size);
            self.summary.record(&tag, size);
            if let Some(w) = self.writer.as_mut() {
                w.write_tag(&tag)?;
            }
            if !self.quiet {
                let info = build_tag_info(self.summary.total_tags - 1, &tag, size);
                self.tags.push(info);
            }
        }
        Ok(())
    }
}

/// 送入一段数据, 损坏的 Script Tag 报告其序号
fn feed_reader(reader: &mut StreamReader, data: &[u8], index: usize) -> Result<Vec<Tag>> {
    match reader.feed(data) {
        Ok(decoded) => Ok(decoded),
        Err(FlvError::MalformedScriptData(reason)) => {
            bail!("第 {index} 个 Tag 是损坏的 Script Tag: {reason}")
        }
        Err(e) => Err(e).context("解析 FLV 失败"),
    }
}

/// 按块读取整个文件并逐个解出 Tag
fn probe_stream(cli: &Cli) -> Result<ProbeOutput> {
    let mut file =
        File::open(&cli.input).with_context(|| format!("无法打开文件 '{}'", cli.input))?;

    let trailing_size = !cli.no_trailing_size;
    let policy = if cli.skip_bad_metadata {
        MetadataPolicy::Skip
    } else {
        MetadataPolicy::Fail
    };
    let config = ReaderConfig::default()
        .with_trailing_size(trailing_size)
        .with_metadata_policy(policy);
    let mut reader = StreamReader::with_config(config);

    let writer = match &cli.rewrite {
        Some(path) => {
            let out = File::create(path).with_context(|| format!("无法创建输出文件 '{path}'"))?;
            Some(FlvWriter::new(BufWriter::new(out), trailing_size))
        }
        None => None,
    };
    let mut sink = TagSink {
        writer,
        trailing_size,
        quiet: cli.quiet,
        tags: Vec::new(),
        summary: Summary::default(),
    };

    let mut buf = vec![0u8; cli.chunk_size];
    let mut probed = false;

    loop {
        let n = file.read(&mut buf).context("读取输入失败")?;
        if n == 0 {
            break;
        }
        if !probed {
            if probe(&buf[..n], Some(&cli.input)).is_none() {
                warn!("{} 看起来不是 FLV 文件", cli.input);
            }
            probed = true;
        }

        let decoded = feed_reader(&mut reader, &buf[..n], sink.summary.total_tags)?;
        sink.accept(reader.preamble(), decoded)?;
    }

    // 损坏的 Script Tag 之前的 Tag 会先返回, 错误在下一次 feed 时才报告
    loop {
        let decoded = feed_reader(&mut reader, &[], sink.summary.total_tags)?;
        if decoded.is_empty() {
            break;
        }
        sink.accept(reader.preamble(), decoded)?;
    }

    if reader.preamble().is_none() {
        bail!("输入不足一个完整的 FLV 文件头");
    }
    if reader.buffered_len() > 0 {
        warn!("文件末尾有 {} 字节不完整的 Tag 被忽略", reader.buffered_len());
    }
    if let Some(w) = sink.writer {
        let tags_written = w.tags_written();
        w.finish()?;
        info!("重新写入 {tags_written} 个 Tag");
    }

    Ok(ProbeOutput {
        filename: cli.input.clone(),
        preamble: reader.preamble().as_ref().map(preamble_info),
        tags: sink.tags,
        summary: sink.summary,
    })
}

/// 反向定位末尾的 `count` 个 Tag
fn probe_tail(cli: &Cli, count: usize) -> Result<ProbeOutput> {
    if cli.no_trailing_size {
        bail!("--tail 需要 PreviousTagSize 字段");
    }
    let data = std::fs::read(&cli.input).with_context(|| format!("无法读取文件 '{}'", cli.input))?;
    let (preamble, _) = Preamble::decode(&data, true).context("解析 FLV 文件头失败")?;

    let mut spans = Vec::new();
    for span in walk_backward(&data)?.take(count) {
        spans.push(span.context("反向遍历失败")?);
    }
    spans.reverse();

    let mut tags = Vec::new();
    let mut summary = Summary::default();
    for span in spans {
        let (tag, size) = Tag::decode(&data[span.offset..], true)
            .with_context(|| format!("偏移 {} 处的 Tag 解码失败", span.offset))?;
        summary.record(&tag, size);
        tags.push(build_tag_info(summary.total_tags - 1, &tag, size));
    }

    Ok(ProbeOutput {
        filename: cli.input.clone(),
        preamble: Some(preamble_info(&preamble)),
        tags,
        summary,
    })
}

fn print_text(output: &ProbeOutput, quiet: bool) {
    if let Some(p) = &output.preamble {
        println!(
            "{}: FLV v{} audio={} video={}",
            output.filename, p.version, p.has_audio, p.has_video
        );
    }
    if !quiet {
        for t in &output.tags {
            println!(
                "#{:<5} {:<10} ts={:<8} size={:<7} {}",
                t.index, t.kind, t.timestamp, t.size, t.detail
            );
        }
    }
    let s = &output.summary;
    println!(
        "共 {} 个 Tag (视频 {}, 音频 {}, Script {}, 其他 {}), {} 字节",
        s.total_tags, s.video_tags, s.audio_tags, s.script_tags, s.other_tags, s.total_bytes
    );
    if let Some(dur) = s.duration {
        println!("时长: {dur:.3} 秒");
    }
}
