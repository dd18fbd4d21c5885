//! 静态配置
//!
//! 启动时加载一次，之后以 `Arc<StaticConfig>` 注入各个服务。

mod structs;

pub use structs::*;
