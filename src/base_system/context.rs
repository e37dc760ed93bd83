//! 运行配置（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息。

use serde::{Deserialize, Serialize};

use super::config::{ConfigError, ConfigSpec, FieldMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 抓取目标
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub selector: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,

    // 输出配置
    #[serde(default = "default_output")]
    pub output: String,

    // 运行策略
    #[serde(default = "default_false")]
    pub dry_run: bool,
    #[serde(default = "default_delay")]
    pub delay: f64,

    // 网络配置
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            selector: String::new(),
            encoding: default_encoding(),
            output: default_output(),
            dry_run: default_false(),
            delay: default_delay(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 8] = [
            FieldMeta {
                name: "url",
                description: "索引页地址（必填）",
            },
            FieldMeta {
                name: "selector",
                description: "索引页根节点的 CSS 选择器（必填），例如: body > ul",
            },
            FieldMeta {
                name: "encoding",
                description: "索引页字符编码",
            },
            FieldMeta {
                name: "output",
                description: "本地镜像根目录",
            },
            FieldMeta {
                name: "dry_run",
                description: "只打印将要执行的操作，不创建文件、不发请求",
            },
            FieldMeta {
                name: "delay",
                description: "每次下载后的延迟（秒），减轻网站压力",
            },
            FieldMeta {
                name: "request_timeout",
                description: "请求超时时间（秒）",
            },
            FieldMeta {
                name: "user_agent",
                description: "请求使用的 User-Agent",
            },
        ];
        &FIELDS
    }
}

impl Config {
    /// 校验必填项；url 与 selector 任一为空都拒绝启动。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Validation("缺少必填配置项 url".to_string()));
        }
        if self.selector.trim().is_empty() {
            return Err(ConfigError::Validation(
                "缺少必填配置项 selector".to_string(),
            ));
        }
        if self.delay < 0.0 {
            return Err(ConfigError::Validation("delay 不能为负数".to_string()));
        }
        Ok(())
    }

    /// 远程地址前缀：索引页地址去掉最后一段，相对 href 以它为基准拼接。
    pub fn url_prefix(&self) -> &str {
        self.url.rsplit_once('/').map_or("", |(prefix, _)| prefix)
    }
}

fn default_encoding() -> String {
    "GB18030".to_string()
}

fn default_output() -> String {
    ".".to_string()
}

fn default_false() -> bool {
    false
}

fn default_delay() -> f64 {
    0.0
}

fn default_request_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36".to_string()
}
