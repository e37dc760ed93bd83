//! 镜像流程模块入口。
//!
//! 子模块：
//! - `classify` — 节点分类与名称清洗
//! - `models`   — 运行策略、下载计划与汇总报表
//! - `walker`   — 递归遍历与落盘

pub mod classify;
pub mod models;
pub mod walker;
