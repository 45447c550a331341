#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::missing_crate_level_docs)]
#![doc = include_str!("../README.md")]

pub mod code;
pub mod config;
pub mod error;
pub mod hook;
pub mod lock;
pub mod page;
pub mod patcher;
pub mod protect;

pub use config::InstallOptions;
pub use error::PatchError;
pub use page::{page_size, PageRange};
pub use patcher::mem::{install, install_with};
