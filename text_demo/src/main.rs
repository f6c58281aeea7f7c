//! Mesh-shader text demo
//!
//! Renders the configured text with MSDF glyphs, or a row of curve glyphs,
//! until the window is closed. Run from the workspace root.
//! Usage: `text_demo [config.toml|config.ron]` (defaults to the shipped
//! `resources/config/text_demo.toml`, built-in defaults when that file does
//! not exist).

use mesh_text::prelude::*;

fn main() {
    // Set up panic hook for better error reporting
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred: {panic_info:?}");

        if let Some(location) = panic_info.location() {
            eprintln!("Panic location: {}:{}:{}", location.file(), location.line(), location.column());
        }

        if let Some(payload) = panic_info.payload().downcast_ref::<&str>() {
            eprintln!("Panic message: {payload}");
        } else if let Some(payload) = panic_info.payload().downcast_ref::<String>() {
            eprintln!("Panic message: {payload}");
        }
    }));

    // Info by default; RUST_LOG overrides
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("Starting mesh-shader text demo");

    if let Err(e) = run_demo() {
        log::error!("Text demo failed: {e}");
        std::process::exit(1);
    }

    log::info!("Text demo finished successfully");
}

fn run_demo() -> Result<(), RenderError> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| TextRendererConfig::DEFAULT_PATH.to_string());
    let config = TextRendererConfig::load_or_default(&config_path)?;

    match config.content {
        ContentKind::Text => log::info!("Rendering {:?} at {}px", config.text, config.font_px),
        ContentKind::Curves => log::info!("Rendering {} curve glyphs", config.curve_count),
    }
    mesh_text::run(&config)
}
