//! 节点分类与名称清洗。
//!
//! 分类只看子树里超链接的数量：0 个是章节标题，恰好 1 个是叶子文档，
//! 2 个以上是需要递归的子目录。数量严格决定角色。

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

/// 列表节点在目录树中扮演的角色。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRole {
    /// 无链接节点：文本成为其后兄弟节点的章节标题。
    Heading(String),
    /// 恰有一个链接的叶子文档；链接可能没有 href 属性。
    Leaf { href: Option<String>, label: String },
    /// 两个以上链接：作为子目录递归处理。
    Subsection,
}

fn sel_anchor() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse("a").unwrap())
}

fn re_unsafe_runs() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[:/\\?.\s]+").unwrap())
}

/// 收集子树里的全部超链接；节点自身是 `<a>` 时也算在内。
fn anchors_of(node: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut anchors = Vec::new();
    if node.value().name() == "a" {
        anchors.push(node);
    }
    anchors.extend(node.select(sel_anchor()));
    anchors
}

/// 按链接数量给节点定角色。
///
/// 文本看起来像标题但带一个链接的节点仍按叶子处理，
/// 与数量启发式保持一致。
pub fn classify(node: ElementRef<'_>) -> NodeRole {
    let anchors = anchors_of(node);
    match anchors.len() {
        0 => NodeRole::Heading(node.text().collect()),
        1 => {
            let anchor = anchors[0];
            NodeRole::Leaf {
                href: anchor.value().attr("href").map(str::to_string),
                label: anchor.text().collect(),
            }
        }
        _ => NodeRole::Subsection,
    }
}

/// 把任意文本清洗成安全的目录/文件名成分。
///
/// `: / \ ? .` 与空白的连续串折叠成单个空格，再去掉首尾空格。
/// 目录名与文件名主干走同一条规则。
pub fn sanitize_name(raw: &str) -> String {
    re_unsafe_runs().replace_all(raw, " ").trim().to_string()
}
