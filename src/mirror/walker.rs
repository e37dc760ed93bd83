//! 目录树遍历与本地镜像。
//!
//! 深度优先、单线程、按文档顺序处理：标题节点决定其后兄弟节点的
//! 子目录名，叶子节点逐个下载，子目录节点递归。dry-run 与真实模式
//! 走同一条控制流，只是不执行文件系统和网络副作用。

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use scraper::ElementRef;
use tracing::{debug, error, info};

use crate::network_parser::network::{DownloadResult, Fetch};

use super::classify::{NodeRole, classify, sanitize_name};
use super::models::{MirrorPolicy, MirrorReport, PlannedDownload};

/// 没有标题可用时的目录名。
const DEFAULT_TITLE: &str = "未命名";

/// href 没有扩展名时的默认扩展名。
const DEFAULT_EXT: &str = "xls";

pub struct TreeMirror<'a> {
    fetcher: &'a dyn Fetch,
    policy: MirrorPolicy,
}

impl<'a> TreeMirror<'a> {
    pub fn new(fetcher: &'a dyn Fetch, policy: MirrorPolicy) -> Self {
        Self { fetcher, policy }
    }

    /// 遍历 `node` 的子树，把章节结构物化到 `local_dir` 下。
    pub fn process(&self, node: ElementRef<'_>, local_dir: &Path) -> Result<MirrorReport> {
        let mut report = MirrorReport::default();
        self.process_section(node, local_dir, &mut report)?;
        Ok(report)
    }

    fn process_section(
        &self,
        node: ElementRef<'_>,
        local_dir: &Path,
        report: &mut MirrorReport,
    ) -> Result<()> {
        info!("创建目录 {}", local_dir.display());
        if !self.policy.dry_run {
            fs::create_dir_all(local_dir)
                .with_context(|| format!("创建目录失败: {}", local_dir.display()))?;
        }
        report.directories += 1;

        // 标题是本调用帧内的状态，只影响其后兄弟节点的子目录名
        let mut title = DEFAULT_TITLE.to_string();
        for child in node.children().filter_map(ElementRef::wrap) {
            match classify(child) {
                NodeRole::Heading(text) => {
                    let cleaned = sanitize_name(&text);
                    if !cleaned.is_empty() {
                        title = cleaned;
                    }
                }
                NodeRole::Leaf { href: None, label } => {
                    debug!("链接缺少 href，跳过: {label:?}");
                    report.skipped += 1;
                }
                NodeRole::Leaf {
                    href: Some(href),
                    label,
                } => {
                    self.download_leaf(&href, &label, local_dir, report)?;
                }
                NodeRole::Subsection => {
                    self.process_section(child, &local_dir.join(&title), report)?;
                }
            }
        }
        Ok(())
    }

    fn download_leaf(
        &self,
        href: &str,
        label: &str,
        local_dir: &Path,
        report: &mut MirrorReport,
    ) -> Result<()> {
        let url = format!("{}/{}", self.policy.url_prefix, href);
        let path = local_dir.join(leaf_file_name(href, label));
        info!("下载 {} -> {}", url, path.display());
        report.planned.push(PlannedDownload {
            url: url.clone(),
            path: path.clone(),
        });

        if self.policy.dry_run {
            return Ok(());
        }

        match self.fetcher.get(&url) {
            Ok(DownloadResult::Ok(body)) => {
                // 同名叶子直接覆盖，与原站行为保持一致
                fs::write(&path, body)
                    .with_context(|| format!("写入文件失败: {}", path.display()))?;
                report.downloaded += 1;
            }
            Ok(DownloadResult::HttpError { status, reason }) => {
                error!("{status}: {reason} ({url})");
                report.failed += 1;
            }
            Err(err) => {
                error!("下载失败 {url}: {err:#}");
                report.failed += 1;
            }
        }

        if self.policy.delay > 0.0 {
            thread::sleep(Duration::from_secs_f64(self.policy.delay));
        }
        Ok(())
    }
}

/// 叶子文件名：清洗后的链接文字加 href 的扩展名；
/// 链接文字清洗后为空时，退回 href 的最后一段原样使用。
fn leaf_file_name(href: &str, label: &str) -> String {
    let stem = sanitize_name(label);
    if stem.is_empty() {
        return href.rsplit('/').next().unwrap_or(href).to_string();
    }
    let ext = Path::new(href)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(DEFAULT_EXT);
    format!("{stem}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use anyhow::anyhow;
    use scraper::{Html, Selector};

    const PREFIX: &str = "http://stats.example.cn/rkpc/6rp";

    struct StubFetcher {
        responses: HashMap<String, DownloadResult>,
        requests: RefCell<Vec<String>>,
    }

    impl StubFetcher {
        fn new(responses: &[(&str, DownloadResult)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(path, result)| (format!("{PREFIX}/{path}"), result.clone()))
                    .collect(),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn empty() -> Self {
            Self::new(&[])
        }

        fn ok(paths: &[&str]) -> Self {
            let responses: Vec<(&str, DownloadResult)> = paths
                .iter()
                .map(|p| (*p, DownloadResult::Ok(b"bytes".to_vec())))
                .collect();
            Self::new(&responses)
        }
    }

    impl Fetch for StubFetcher {
        fn get(&self, url: &str) -> Result<DownloadResult> {
            self.requests.borrow_mut().push(url.to_string());
            match self.responses.get(url) {
                Some(result) => Ok(result.clone()),
                None => Err(anyhow!("connection refused: {url}")),
            }
        }
    }

    fn policy(dry_run: bool) -> MirrorPolicy {
        MirrorPolicy {
            url_prefix: PREFIX.to_string(),
            dry_run,
            delay: 0.0,
        }
    }

    fn mirror<'a>(
        fetcher: &'a StubFetcher,
        html: &str,
        out: &Path,
        dry_run: bool,
    ) -> MirrorReport {
        let doc = Html::parse_document(html);
        let sel = Selector::parse("body > ul").unwrap();
        let root = doc.select(&sel).next().unwrap();
        TreeMirror::new(fetcher, policy(dry_run))
            .process(root, out)
            .unwrap()
    }

    #[test]
    fn labeled_leaf_lands_in_current_directory() {
        let out = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::ok(&["html/t0101.xls"]);
        let html = "<html><body><ul>\
            <li>第一章</li>\
            <li><a href='html/t0101.xls'>表1</a></li>\
            </ul></body></html>";

        let report = mirror(&fetcher, html, out.path(), false);

        assert_eq!(report.directories, 1);
        assert_eq!(report.downloaded, 1);
        assert_eq!(
            fs::read(out.path().join("表1.xls")).unwrap(),
            b"bytes".to_vec()
        );
        // 标题被记录但叶子自带文字，不产生子目录
        assert!(!out.path().join("第一章").exists());
    }

    #[test]
    fn subsection_nests_under_latest_heading() {
        let out = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::ok(&["a.xls", "b.xls"]);
        let html = "<html><body><ul>\
            <li>第二章 户别</li>\
            <ul>\
              <li><a href='a.xls'>表A</a></li>\
              <li><a href='b.xls'>表B</a></li>\
            </ul>\
            </ul></body></html>";

        let report = mirror(&fetcher, html, out.path(), false);

        assert_eq!(report.directories, 2);
        assert!(out.path().join("第二章 户别/表A.xls").exists());
        assert!(out.path().join("第二章 户别/表B.xls").exists());
    }

    #[test]
    fn leaf_under_two_subsections_lands_two_levels_deep() {
        let out = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::ok(&["deep1.xls", "deep2.xls"]);
        let html = "<html><body><ul>\
            <li>甲</li>\
            <ul>\
              <li>乙</li>\
              <ul>\
                <li><a href='deep1.xls'>深表一</a></li>\
                <li><a href='deep2.xls'>深表二</a></li>\
              </ul>\
            </ul>\
            </ul></body></html>";

        let report = mirror(&fetcher, html, out.path(), false);

        assert_eq!(report.directories, 3);
        assert!(out.path().join("甲/乙/深表一.xls").exists());
        assert!(out.path().join("甲/乙/深表二.xls").exists());
    }

    #[test]
    fn subsection_without_preceding_heading_uses_default_title() {
        let out = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::ok(&["a.xls", "b.xls"]);
        let html = "<html><body><ul>\
            <ul>\
              <li><a href='a.xls'>表A</a></li>\
              <li><a href='b.xls'>表B</a></li>\
            </ul>\
            </ul></body></html>";

        mirror(&fetcher, html, out.path(), false);

        assert!(out.path().join("未命名/表A.xls").exists());
    }

    #[test]
    fn heading_that_sanitizes_empty_keeps_previous_title() {
        let out = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::ok(&["a.xls", "b.xls"]);
        let html = "<html><body><ul>\
            <li>第四章</li>\
            <li> ://..\\ </li>\
            <ul>\
              <li><a href='a.xls'>表A</a></li>\
              <li><a href='b.xls'>表B</a></li>\
            </ul>\
            </ul></body></html>";

        mirror(&fetcher, html, out.path(), false);

        assert!(out.path().join("第四章/表A.xls").exists());
    }

    #[test]
    fn empty_label_falls_back_to_href_basename() {
        let out = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::ok(&["html/t0301.xls"]);
        // 前面的标题不参与文件名回退，用 href 最后一段
        let html = "<html><body><ul>\
            <li>第三章</li>\
            <li><a href='html/t0301.xls'></a></li>\
            </ul></body></html>";

        let report = mirror(&fetcher, html, out.path(), false);

        assert_eq!(report.downloaded, 1);
        assert!(out.path().join("t0301.xls").exists());
        assert!(!out.path().join("第三章.xls").exists());
    }

    #[test]
    fn non_200_is_logged_and_traversal_continues() {
        let out = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::new(&[
            (
                "bad.xls",
                DownloadResult::HttpError {
                    status: 404,
                    reason: "Not Found".to_string(),
                },
            ),
            ("good.xls", DownloadResult::Ok(b"bytes".to_vec())),
        ]);
        let html = "<html><body><ul>\
            <li><a href='bad.xls'>坏表</a></li>\
            <li><a href='good.xls'>好表</a></li>\
            </ul></body></html>";

        let report = mirror(&fetcher, html, out.path(), false);

        assert_eq!(report.failed, 1);
        assert_eq!(report.downloaded, 1);
        assert!(!out.path().join("坏表.xls").exists());
        assert!(out.path().join("好表.xls").exists());
    }

    #[test]
    fn transport_error_is_tolerated_like_bad_status() {
        let out = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::ok(&["good.xls"]);
        let html = "<html><body><ul>\
            <li><a href='unreachable.xls'>断网表</a></li>\
            <li><a href='good.xls'>好表</a></li>\
            </ul></body></html>";

        let report = mirror(&fetcher, html, out.path(), false);

        assert_eq!(report.failed, 1);
        assert_eq!(report.downloaded, 1);
    }

    #[test]
    fn every_leaf_is_accounted_for() {
        let out = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::new(&[
            ("a.xls", DownloadResult::Ok(b"bytes".to_vec())),
            (
                "b.xls",
                DownloadResult::HttpError {
                    status: 500,
                    reason: "Internal Server Error".to_string(),
                },
            ),
        ]);
        let html = "<html><body><ul>\
            <li><a href='a.xls'>甲</a></li>\
            <li><a href='b.xls'>乙</a></li>\
            <li><a href='c.xls'>丙</a></li>\
            </ul></body></html>";

        let report = mirror(&fetcher, html, out.path(), false);

        assert_eq!(report.planned.len() as u32, report.downloaded + report.failed);
        assert_eq!(fetcher.requests.borrow().len(), report.planned.len());
    }

    #[test]
    fn dry_run_plans_match_real_run_and_touch_nothing() {
        let out = tempfile::tempdir().unwrap();
        let html = "<html><body><ul>\
            <li>第五章</li>\
            <li><a href='t05.xls'>表5</a></li>\
            <ul>\
              <li><a href='a.xls'>表A</a></li>\
              <li><a href='b.xls'>表B</a></li>\
            </ul>\
            </ul></body></html>";

        let fetcher = StubFetcher::empty();
        let dry = mirror(&fetcher, html, out.path(), true);
        assert!(fetcher.requests.borrow().is_empty());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);

        let fetcher = StubFetcher::ok(&["t05.xls", "a.xls", "b.xls"]);
        let real = mirror(&fetcher, html, out.path(), false);

        assert_eq!(dry.planned, real.planned);
        assert_eq!(dry.directories, real.directories);
        assert_eq!(real.downloaded, 3);
    }

    #[test]
    fn anchor_without_href_is_skipped() {
        let out = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::empty();
        let html = "<html><body><ul>\
            <li><a>悬空</a></li>\
            </ul></body></html>";

        let report = mirror(&fetcher, html, out.path(), false);

        assert_eq!(report.skipped, 1);
        assert!(report.planned.is_empty());
    }

    #[test]
    fn leaf_file_name_defaults_extension() {
        assert_eq!(leaf_file_name("html/t01", "表"), "表.xls");
        assert_eq!(leaf_file_name("html/t01.htm", "表"), "表.htm");
        assert_eq!(leaf_file_name("html/t0301.xls", ""), "t0301.xls");
        assert_eq!(leaf_file_name("t.xls", " .:/ "), "t.xls");
    }
}
