//! 人口普查资料镜像下载器。
//!
//! 递归遍历目录索引页里的嵌套列表，把章节结构映射成本地目录树，
//! 并逐个下载叶子节点引用的表格文件。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志等基础设施
//! - `network_parser`：HTTP 抓取与索引页解码
//! - `mirror`：节点分类、递归遍历与落盘

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use scraper::{Html, Selector};
use tracing::{error, info};

mod base_system;
mod mirror;
mod network_parser;

use base_system::config::load_or_create;
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use mirror::models::{MirrorPolicy, MirrorReport};
use mirror::walker::TreeMirror;
use network_parser::network::{FetchConfig, HttpFetcher};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "census-mirror")]
#[command(about = "Census publication tree mirror")]
struct Cli {
    /// 配置文件路径（默认当前目录 config.yml）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 索引页地址（覆盖配置文件）
    #[arg(long)]
    url: Option<String>,

    /// 索引页根节点的 CSS 选择器（覆盖配置文件）
    #[arg(long)]
    selector: Option<String>,

    /// 本地镜像根目录（覆盖配置文件）
    #[arg(long)]
    output: Option<String>,

    /// 只打印将要执行的操作，不创建文件、不发请求
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// 每次下载后的延迟（秒，覆盖配置文件）
    #[arg(long)]
    delay: Option<f64>,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("census-mirror v{}", VERSION);
        return Ok(());
    }

    let _log = LogSystem::init(LogOptions {
        debug: cli.debug,
        use_color: true,
    })
    .map_err(|e| anyhow!(e.to_string()))?;

    let mut config =
        load_or_create::<Config>(cli.config.as_deref()).map_err(|e| anyhow!(e.to_string()))?;
    apply_overrides(&mut config, &cli);

    if let Err(err) = config.validate() {
        error!("配置无效: {err}");
        bail!("{err}");
    }

    run(&config)
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(selector) = &cli.selector {
        config.selector = selector.clone();
    }
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(delay) = cli.delay {
        config.delay = delay;
    }
    if cli.dry_run {
        config.dry_run = true;
    }
}

fn run(config: &Config) -> Result<()> {
    info!("开始抓取 {}", config.url);
    if config.dry_run {
        info!("dry-run 模式：不创建文件、不下载");
    }

    let fetcher = HttpFetcher::new(&FetchConfig {
        request_timeout: Duration::from_secs(config.request_timeout.max(1)),
        user_agent: config.user_agent.clone(),
    })?;

    let text = fetcher.fetch_index(&config.url, &config.encoding)?;
    let doc = Html::parse_document(&text);

    let selector = Selector::parse(&config.selector)
        .map_err(|e| anyhow!("无效选择器 {:?}: {e}", config.selector))?;
    let root = doc
        .select(&selector)
        .next()
        .ok_or_else(|| anyhow!("索引页里找不到匹配 {:?} 的节点", config.selector))?;

    let policy = MirrorPolicy {
        url_prefix: config.url_prefix().to_string(),
        dry_run: config.dry_run,
        delay: config.delay,
    };
    let output = PathBuf::from(&config.output);
    let report = TreeMirror::new(&fetcher, policy).process(root, &output)?;

    log_summary(config, &report);
    Ok(())
}

fn log_summary(config: &Config, report: &MirrorReport) {
    if config.dry_run {
        info!(
            "完成（dry-run）：目录 {} 个，计划下载 {} 个，跳过 {} 个",
            report.directories,
            report.planned.len(),
            report.skipped
        );
    } else {
        info!(
            "完成：目录 {} 个，下载成功 {} 个，失败 {} 个，跳过 {} 个",
            report.directories, report.downloaded, report.failed, report.skipped
        );
    }
}
