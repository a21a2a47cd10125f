pub mod config;
pub mod export;
pub mod formats;

pub use config::handle_config_command;
pub use export::{ExportRequest, handle_export_command};
pub use formats::handle_formats_command;
