//! Renderer bring-up and the frame loop

use crate::config::{ContentKind, TextRendererConfig};
use crate::render::backends::vulkan::{
    CurvePushConstants, CurveResources, DrawContent, FrameBackendSettings, TextPushConstants, TextResources,
    VulkanFrameBackend, Window,
};
use crate::render::frame::{ContentProducer, FrameOrchestrator, FrameStats};
use crate::render::systems::curve::{CurveGeometry, CurveRow, CurveRowStyle};
use crate::render::systems::text::{AtlasImage, FontMetrics, TextLayout, TextStyle};
use crate::render::RenderResult;

/// Open a window and render the configured content until the window is closed
///
/// Every failure is returned; nothing here exits the process.
pub fn run(config: &TextRendererConfig) -> RenderResult<()> {
    log::info!("Initializing {:?} renderer...", config.content);

    let mut window = Window::new(&config.window_title, config.window_width, config.window_height)?;
    let framebuffer_size = window.wait_for_nonzero_framebuffer()?;

    let stats = match config.content {
        ContentKind::Text => run_text(config, &mut window, framebuffer_size)?,
        ContentKind::Curves => run_curves(config, &mut window, framebuffer_size)?,
    };

    log::info!(
        "Renderer finished: {} frames, {} recreations, {} skipped ticks, {} truncated records",
        stats.frames_presented,
        stats.recreations,
        stats.ticks_skipped,
        stats.truncated_records
    );
    Ok(())
}

fn run_text(config: &TextRendererConfig, window: &mut Window, framebuffer_size: (u32, u32)) -> RenderResult<FrameStats> {
    let metrics = FontMetrics::load(&config.font_json)?;
    let atlas_info = *metrics.atlas();
    let atlas = AtlasImage::load(&config.atlas_image, atlas_info.width, atlas_info.height)?;
    log::info!(
        "Font loaded: {} glyphs, atlas {}x{}",
        metrics.glyph_count(),
        atlas_info.width,
        atlas_info.height
    );

    let px_range = config.px_range.unwrap_or(atlas_info.distance_range);
    let style = TextStyle {
        font_px: config.font_px,
        start_x: config.start_x,
        baseline_y: config.baseline_y,
    };
    let layout = TextLayout::new(metrics, style, config.text.as_str());

    drive::<TextResources, _>(
        config,
        window,
        framebuffer_size,
        &atlas,
        TextPushConstants::new(px_range, config.debug_atlas),
        layout,
    )
}

fn run_curves(
    config: &TextRendererConfig,
    window: &mut Window,
    framebuffer_size: (u32, u32),
) -> RenderResult<FrameStats> {
    let geometry = CurveGeometry::closing_paren();
    let row = CurveRow::new(CurveRowStyle {
        count: config.curve_count,
        height: config.curve_height,
        ..CurveRowStyle::default()
    });

    drive::<CurveResources, _>(
        config,
        window,
        framebuffer_size,
        &geometry,
        CurvePushConstants {
            fill_color: config.curve_color,
        },
        row,
    )
}

fn drive<C, P>(
    config: &TextRendererConfig,
    window: &mut Window,
    framebuffer_size: (u32, u32),
    source: &C::Source,
    push_constants: C::PushConstants,
    producer: P,
) -> RenderResult<FrameStats>
where
    C: DrawContent,
    P: ContentProducer<Instance = C::Instance>,
{
    let settings = FrameBackendSettings {
        shader_dir: &config.shader_dir,
        max_instances: config.max_instances,
        clear_color: config.clear_color,
        push_constants,
    };
    let backend = VulkanFrameBackend::<C>::new(
        window,
        &config.window_title,
        config.enable_validation,
        framebuffer_size,
        source,
        settings,
    )?;

    let mut orchestrator = FrameOrchestrator::new(backend, producer, framebuffer_size)?;
    orchestrator.run(window)
}
