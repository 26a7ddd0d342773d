//! 日志模块 - 提供结构化日志、请求追踪和性能计时
//!
//! 特性：
//! - 支持完整、紧凑和 JSON 三种格式
//! - 配置了日志目录时写入按大小滚动的文件，否则输出到标准输出
//! - 请求追踪 ID，贯穿单条消息的处理流程
//! - 敏感信息脱敏

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};
use uuid::Uuid;

/// 日志文件名
pub const LOG_FILE_NAME: &str = "wishing_star.log";

/// 单个日志文件上限（8 MiB）
pub const DEFAULT_MAX_FILE_BYTES: u64 = 8 * 1024 * 1024;

/// 保留的历史文件数量
pub const DEFAULT_MAX_BACKUPS: usize = 7;

/// 日志格式类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// 完整单行格式
    #[default]
    Full,
    /// 紧凑单行格式
    Compact,
    /// JSON 结构化格式（适合日志收集系统）
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(LogFormat::Full),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志格式
    pub format: LogFormat,
    /// 日志目录，为 None 时输出到标准输出
    pub log_dir: Option<PathBuf>,
    /// 单个文件上限
    pub max_file_bytes: u64,
    /// 历史文件数量
    pub max_backups: usize,
    /// 是否显示目标模块
    pub show_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Full,
            log_dir: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_backups: DEFAULT_MAX_BACKUPS,
            show_target: true,
        }
    }
}

/// 初始化日志系统
///
/// # 环境变量
/// - `RUST_LOG`: 日志级别过滤（如 `info`, `debug`, `warn,wishing_star=trace`）
pub fn init(config: LogConfig) -> io::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = match &config.log_dir {
        Some(dir) => {
            let writer = Arc::new(RollingFileWriter::open(
                dir,
                LOG_FILE_NAME,
                config.max_file_bytes,
                config.max_backups,
            )?);
            format_layer(&config, writer, false)
        }
        None => format_layer(&config, io::stdout, true),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .init();
    Ok(())
}

type FilteredRegistry = Layered<EnvFilter, Registry>;

fn format_layer<W>(
    config: &LogConfig,
    writer: W,
    ansi: bool,
) -> Box<dyn Layer<FilteredRegistry> + Send + Sync + 'static>
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let base = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(config.show_target)
        .with_ansi(ansi);

    match config.format {
        LogFormat::Full => base.boxed(),
        LogFormat::Compact => base.compact().boxed(),
        LogFormat::Json => base.json().with_current_span(true).boxed(),
    }
}

/// 按大小滚动的日志文件
///
/// 写满上限后 `name` 依次移为 `name.1` ... `name.N`，最旧的被丢弃
#[derive(Debug)]
pub struct RollingFileWriter {
    state: Mutex<RollingState>,
}

#[derive(Debug)]
struct RollingState {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    max_backups: usize,
}

impl RollingFileWriter {
    pub fn open(
        dir: &Path,
        file_name: &str,
        max_bytes: u64,
        max_backups: usize,
    ) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            state: Mutex::new(RollingState {
                path,
                file,
                written,
                max_bytes,
                max_backups,
            }),
        })
    }
}

impl RollingState {
    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_backups == 0 {
            self.file = File::create(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let oldest = self.backup_path(self.max_backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.max_backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for &RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))?;

        if state.max_bytes > 0
            && state.written > 0
            && state.written + buf.len() as u64 > state.max_bytes
        {
            state.rotate()?;
        }

        state.file.write_all(buf)?;
        state.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))?
            .file
            .flush()
    }
}

/// 请求追踪上下文
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// 请求唯一 ID
    pub request_id: String,
    /// 请求开始时间
    pub start_time: Instant,
}

impl RequestContext {
    /// 创建新的请求上下文
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    /// 使用指定 ID 创建请求上下文
    pub fn with_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            start_time: Instant::now(),
        }
    }

    /// 获取已流逝的时间
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// 创建带有请求 ID 的 span
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("message", request_id = %self.request_id)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 性能计时器 - 离开作用域时记录执行时间
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    /// 创建新的计时器
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            target: "metrics",
            operation = %self.name,
            elapsed_ms = %format!("{:.2}", elapsed_ms),
            "operation completed"
        );
    }
}

/// 敏感信息脱敏工具
pub struct Sanitizer;

impl Sanitizer {
    /// 脱敏 API 密钥 - 只保留前 8 位和后 4 位
    pub fn api_key(key: &str) -> String {
        if key.len() <= 16 || !key.is_ascii() {
            return "***".to_string();
        }
        format!("{}...{}", &key[..8], &key[key.len() - 4..])
    }

    /// 脱敏 Token - 完全隐藏
    pub fn token(_token: &str) -> String {
        "***TOKEN***".to_string()
    }
}
