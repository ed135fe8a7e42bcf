//! Image viewer host for the vitrine engine.
//!
//! Usage: `vitrine-studio [IMAGE]...`. Images can also be dropped onto the
//! window. Escape closes it.

mod app;

use std::path::PathBuf;

use anyhow::Result;
use vitrine_engine::logging::{init_logging, LoggingConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let images: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if images.is_empty() {
        log::info!("no images given; drop files onto the window to load them");
    }

    app::run(app::StudioConfig {
        images,
        ..app::StudioConfig::default()
    })
}
