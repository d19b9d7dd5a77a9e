pub mod config;
pub mod error;
pub mod types;

pub use config::IntunewinConfig;
pub use error::{IntunewinError, IntunewinResult};
pub use types::{EntryContent, PackOptions, SourceEntry};
