//! 运行策略、下载计划与汇总报表。

use std::path::PathBuf;

/// 一次运行的不可变策略，遍历全程共享。
#[derive(Debug, Clone)]
pub struct MirrorPolicy {
    /// 相对 href 的拼接基准：索引页地址去掉最后一段。
    pub url_prefix: String,
    /// 只记录计划，不碰文件系统和网络。
    pub dry_run: bool,
    /// 每次真实下载后的延迟（秒）。
    pub delay: f64,
}

/// 遍历中确定的一次下载：远程地址与落盘路径。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDownload {
    pub url: String,
    pub path: PathBuf,
}

/// 一次遍历的汇总。`planned` 在 dry-run 与真实模式下完全一致。
#[derive(Debug, Clone, Default)]
pub struct MirrorReport {
    pub directories: u32,
    pub downloaded: u32,
    pub failed: u32,
    pub skipped: u32,
    pub planned: Vec<PlannedDownload>,
}
