//! 网络层：HTTP 客户端、索引页抓取与解码。

pub mod network;
