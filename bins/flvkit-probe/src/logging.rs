//! 日志初始化模块.
//!
//! - console: 输出到 stderr, 彩色, 不干扰 stdout 上的探测结果
//! - file (可选): 无色, 按天滚动, 写入 `{dir}/flvkit-probe.{date}.log`
//!
//! 级别默认 warn, 可通过 -v/-vv/-vvv 提升, FLVKIT_LOG 环境变量可覆盖.
//! 库内部通过 `log` 宏输出, 由 tracing-subscriber 统一接管.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, Timelike};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// 日志环境变量
const LOG_ENV: &str = "FLVKIT_LOG";

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 由 -v 次数得到默认级别
fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn make_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)))
}

/// 初始化日志系统
///
/// - `verbosity`: 0=warn, 1=info, 2=debug, 3+=trace
/// - `log_dir`: 指定时额外写入按天滚动的日志文件
pub fn init(verbosity: u8, log_dir: Option<&str>) -> Result<()> {
    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .event_format(ConsoleFormatter)
        .with_filter(make_filter(verbosity));

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("创建日志目录失败: {dir}"))?;
            let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix("flvkit-probe")
                .filename_suffix("log")
                .build(dir)
                .context("创建日志文件失败")?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            LOG_GUARD.set(guard).ok();

            Some(
                fmt::Layer::default()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(FileFormatter)
                    .with_filter(make_filter(verbosity)),
            )
        }
        None => None,
    };

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("初始化日志系统失败")?;
    Ok(())
}

/// 写入 `[MM-DD HH:MM:SS.mmm]` 时间戳
fn write_timestamp(writer: &mut Writer<'_>) -> std::fmt::Result {
    let now = Local::now();
    write!(
        writer,
        "[{:02}-{:02} {:02}:{:02}:{:02}.{:03}] ",
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.timestamp_subsec_millis(),
    )
}

/// Console 格式: 彩色级别
struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let color = match *meta.level() {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            _ => "\x1b[34m",
        };
        write_timestamp(&mut writer)?;
        write!(writer, "{}{:5}\x1b[0m > ", color, meta.level())?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// File 格式: 无色, 时间戳 + 级别 + 消息
struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        write_timestamp(&mut writer)?;
        write!(writer, "{:5} > ", event.metadata().level())?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
