// 服务层模块
//
// - config: 应用配置存储
// - tool: 工具目录、检测、版本查询与更新

pub mod config;
pub mod tool;

pub use config::{ConfigManager, ConfigUpdate};
pub use tool::{Catalog, ToolDetector, ToolManager, Updater, VersionService};
