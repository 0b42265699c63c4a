//! 日志初始化：控制台输出，外加按类别写入的可选日志文件。
//!
//! [`LogSinks`] 在进程启动时创建一次（通常来自 `logging` 参数），交给 [`init_tracing`]。
//! 各组件只发 `tracing` 事件；原始 update 使用 [`UPDATE_TARGET`] target，写入 update 日志。

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    filter::{filter_fn, LevelFilter},
    fmt::format::{Format, Full, Writer},
    fmt::time::FormatTime,
    layer::{Filter, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// 原始 update 日志使用的 target。
pub const UPDATE_TARGET: &str = "update";

/// 按类别的日志文件路径；未配置的类别不写入。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSinks {
    /// DEBUG 及以上的所有事件。
    #[serde(default)]
    pub debug: Option<PathBuf>,
    /// 仅 ERROR 事件。
    #[serde(default)]
    pub error: Option<PathBuf>,
    /// target 为 [`UPDATE_TARGET`] 的事件。
    #[serde(default)]
    pub update: Option<PathBuf>,
}

impl LogSinks {
    pub fn is_empty(&self) -> bool {
        self.debug.is_none() && self.error.is_none() && self.update.is_none()
    }
}

/// 本地时间，格式 `YYYY-MM-DD HH:MM:SS`。
struct ChronoLocal;

impl FormatTime for ChronoLocal {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let t = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        write!(w, "{} ", t)
    }
}

fn event_format() -> Format<Full, ChronoLocal> {
    tracing_subscriber::fmt::format()
        .with_timer(ChronoLocal)
        .with_level(true)
        .with_target(true)
        .with_thread_ids(false)
}

/// 以追加方式打开 `path`，必要时创建父目录。
fn open_log_file(path: &Path) -> io::Result<Arc<fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Arc::new(file))
}

fn file_layer<F>(path: &Path, filter: F) -> io::Result<Box<dyn Layer<Registry> + Send + Sync>>
where
    F: Filter<Registry> + Send + Sync + 'static,
{
    let file = open_log_file(path)?;
    Ok(tracing_subscriber::fmt::layer()
        .with_writer(file)
        .event_format(event_format())
        .with_ansi(false)
        .with_filter(filter)
        .boxed())
}

/// 初始化全局 tracing 订阅者。
///
/// 控制台输出写到 stderr（stdout 留给调用输出），级别由 RUST_LOG 控制，未设置则为 info。
/// 每个已配置的 sink 各有一个文件 layer。
/// 注意：需在调用前加载 .env（如 dotenvy::dotenv()），否则 RUST_LOG 不会生效。
pub fn init_tracing(sinks: &LogSinks) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .event_format(event_format())
            .with_ansi(false)
            .with_filter(env_filter)
            .boxed(),
    ];

    if let Some(path) = &sinks.debug {
        layers.push(file_layer(path, LevelFilter::DEBUG)?);
    }
    if let Some(path) = &sinks.error {
        layers.push(file_layer(path, LevelFilter::ERROR)?);
    }
    if let Some(path) = &sinks.update {
        layers.push(file_layer(
            path,
            filter_fn(|meta| meta.target() == UPDATE_TARGET),
        )?);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(())
}
