pub mod command;
pub mod version;

pub use command::*;
pub use version::*;
