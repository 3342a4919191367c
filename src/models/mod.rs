pub mod config;
pub mod tool;
pub mod update;
pub mod version;

pub use config::*;
pub use tool::*;
pub use update::*;
pub use version::*;
