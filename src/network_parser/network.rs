//! HTTP 抓取与索引页解码。

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::Encoding;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

/// 抓取客户端参数。
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36".to_string(),
        }
    }
}

/// 单次下载的结果：响应内容，或非 200 的状态与原因。
#[derive(Debug, Clone)]
pub enum DownloadResult {
    Ok(Vec<u8>),
    HttpError { status: u16, reason: String },
}

/// 叶子文档的下载接口；遍历通过它发请求，测试里用桩实现替换。
pub trait Fetch {
    fn get(&self, url: &str) -> Result<DownloadResult>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or(HeaderValue::from_static("Mozilla/5.0")),
        );

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(config.request_timeout)
            .build()
            .context("构建 HTTP 客户端失败")?;

        Ok(Self { client })
    }

    /// 抓取索引页并按 `encoding` 解码；这一步的任何失败都是致命的。
    ///
    /// 旧站点经常不声明（或声明错误的）charset，所以这里强制使用
    /// 配置里的编码，忽略响应头。
    pub fn fetch_index(&self, url: &str, encoding: &str) -> Result<String> {
        let charset = Encoding::for_label(encoding.as_bytes())
            .ok_or_else(|| anyhow!("未知编码: {encoding}"))?;

        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("请求索引页失败: {url}"))?;
        let status = resp.status();
        if status != StatusCode::OK {
            bail!(
                "索引页返回 {}: {} ({url})",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown"),
            );
        }

        let body = resp
            .bytes()
            .with_context(|| format!("读取索引页失败: {url}"))?;
        let (text, actual, had_errors) = charset.decode(&body);
        if had_errors {
            debug!("索引页按 {} 解码出现替换字符", actual.name());
        }
        Ok(text.into_owned())
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<DownloadResult> {
        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("请求失败: {url}"))?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Ok(DownloadResult::HttpError {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }
        let body = resp
            .bytes()
            .with_context(|| format!("读取响应失败: {url}"))?;
        Ok(DownloadResult::Ok(body.to_vec()))
    }
}
