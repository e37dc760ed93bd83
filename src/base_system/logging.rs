//! 日志系统初始化。
//!
//! 控制台与 `logs/` 下按天滚动的文件两路输出；文件侧始终记录 DEBUG。

use std::fs;
use std::io;
use std::panic;
use std::path::PathBuf;

use tracing::error;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,
    #[error("subscriber init failed: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug)]
pub struct LogOptions {
    pub debug: bool,
    pub use_color: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            debug: false,
            use_color: true,
        }
    }
}

/// 持有文件写入端的 guard；丢弃时刷新缓冲。
pub struct LogSystem {
    _guard: WorkerGuard,
}

impl LogSystem {
    pub fn init(options: LogOptions) -> Result<Self, LogError> {
        let logs_dir = PathBuf::from("logs");
        fs::create_dir_all(&logs_dir)?;

        let file_appender = rolling::daily(&logs_dir, "census-mirror.log");
        let (file_writer, guard) = non_blocking::NonBlockingBuilder::default()
            .lossy(false)
            .finish(file_appender);

        let console_level = if options.debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };

        let console_layer = fmt::layer()
            .with_target(false)
            .with_level(true)
            .with_ansi(options.use_color)
            .with_writer(io::stdout)
            .with_filter(console_level);

        let file_layer = fmt::layer()
            .with_target(false)
            .with_level(true)
            .with_ansi(false)
            .with_writer(file_writer)
            .with_filter(LevelFilter::DEBUG);

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("global subscriber") || msg.contains("already") {
                    LogError::AlreadyInitialized
                } else {
                    LogError::SubscriberInit(e)
                }
            })?;

        install_panic_hook();

        Ok(Self { _guard: guard })
    }
}

fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if let Some(location) = info.location() {
            error!("panic at {}:{}: {}", location.file(), location.line(), info);
        } else {
            error!("panic: {info}");
        }
        previous(info);
    }));
}
