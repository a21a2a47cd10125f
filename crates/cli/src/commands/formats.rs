use eyre::Result;
use folio_export::{MemorySink, default_export_manager};
use std::sync::Arc;

pub async fn handle_formats_command() -> Result<()> {
    let manager = default_export_manager(Arc::new(MemorySink::new()))?;

    println!("📦 Available formats:");
    for info in manager.available_formats() {
        println!(
            "  {:<5} {} ({}, .{})",
            info.id(),
            info.name,
            info.mime_type,
            info.format.extension()
        );
    }
    Ok(())
}
