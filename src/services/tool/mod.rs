// 工具服务模块
//
// 包含工具目录、安装检测、版本查询与更新

pub mod cache;
pub mod catalog;
pub mod detector;
pub mod manager;
pub mod package_manager;
pub mod sources;
pub mod updater;
pub mod version;

pub use cache::VersionCache;
pub use catalog::Catalog;
pub use detector::ToolDetector;
pub use manager::ToolManager;
pub use sources::{ProviderEndpoints, VersionProvider};
pub use updater::Updater;
pub use version::VersionService;
