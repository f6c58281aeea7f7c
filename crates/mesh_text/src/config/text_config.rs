//! Text renderer configuration
//!
//! Everything the demo needs to know that isn't a device capability: window,
//! assets, layout placement and a few renderer knobs. Loaded through
//! [`Config`](super::Config) from TOML or RON; every field has a default.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Config;

/// What the renderer draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// `text` laid out with MSDF glyphs from the font atlas
    #[default]
    Text,
    /// A row of curve glyphs drawn from their outline triangulation
    Curves,
}

/// Configuration for the mesh-shader text renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextRendererConfig {
    /// Window title, also used as the Vulkan application name
    pub window_title: String,
    /// Initial window width in screen coordinates
    pub window_width: u32,
    /// Initial window height in screen coordinates
    pub window_height: u32,
    /// MSDF text or curve glyphs
    pub content: ContentKind,
    /// Text to lay out, ASCII with `\n` line breaks
    pub text: String,
    /// msdf-atlas-gen JSON with atlas, metrics and glyph data
    pub font_json: PathBuf,
    /// Atlas pixels: `.png`, or raw RGBA8 (optionally with the 12-byte legacy header)
    pub atlas_image: PathBuf,
    /// Directory holding the compiled `mesh_text.*.spv` and `mesh_curve.*.spv` shaders
    pub shader_dir: PathBuf,
    /// Font size in pixels
    pub font_px: f32,
    /// Pen start, pixels from the left edge
    pub start_x: f32,
    /// First baseline, pixels from the top edge
    pub baseline_y: f32,
    /// Overrides the distance range read from the font JSON
    pub px_range: Option<f32>,
    /// Show raw atlas channels instead of the reconstructed glyph
    pub debug_atlas: bool,
    /// Number of curve glyphs in the row
    pub curve_count: u32,
    /// NDC half-height of one curve glyph
    pub curve_height: f32,
    /// Curve glyph fill color [R, G, B, A]
    pub curve_color: [f32; 4],
    /// Capacity of the instance buffer in records
    pub max_instances: usize,
    /// Background clear color [R, G, B, A] (0.0-1.0 range)
    pub clear_color: [f32; 4],
    /// Whether to enable Vulkan validation layers
    pub enable_validation: bool,
}

impl TextRendererConfig {
    /// Shipped demo configuration, relative to the workspace root
    pub const DEFAULT_PATH: &'static str = "resources/config/text_demo.toml";

    /// Set the text to render
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set font metrics and atlas paths
    pub fn with_font(mut self, font_json: impl Into<PathBuf>, atlas_image: impl Into<PathBuf>) -> Self {
        self.font_json = font_json.into();
        self.atlas_image = atlas_image.into();
        self
    }

    /// Set the directory compiled shaders are loaded from
    pub fn with_shader_dir(mut self, shader_dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = shader_dir.into();
        self
    }

    /// Set font size and pen start
    pub fn with_placement(mut self, font_px: f32, start_x: f32, baseline_y: f32) -> Self {
        self.font_px = font_px;
        self.start_x = start_x;
        self.baseline_y = baseline_y;
        self
    }

    /// Draw a row of `count` curve glyphs instead of text
    pub fn with_curves(mut self, count: u32) -> Self {
        self.content = ContentKind::Curves;
        self.curve_count = count;
        self
    }

    /// Set instance buffer capacity (at least one glyph)
    pub fn with_max_instances(mut self, max_instances: usize) -> Self {
        self.max_instances = max_instances.max(1);
        self
    }

    /// Set background clear color [R, G, B, A] (0.0-1.0 range)
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Enable or disable Vulkan validation layers
    pub fn with_validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }
}

impl Default for TextRendererConfig {
    fn default() -> Self {
        Self {
            window_title: "MSDF Text (Mesh Shader)".to_string(),
            window_width: 1280,
            window_height: 720,
            content: ContentKind::Text,
            text: "Hello, MSDF!\nMesh shaders".to_string(),
            font_json: PathBuf::from("resources/fonts/font.json"),
            atlas_image: PathBuf::from("resources/fonts/atlas.png"),
            shader_dir: PathBuf::from("target/shaders"),
            font_px: 140.0,
            start_x: 60.0,
            baseline_y: 180.0,
            px_range: None,
            debug_atlas: false,
            curve_count: 8,
            curve_height: 0.25,
            curve_color: [0.95, 0.95, 0.95, 1.0],
            max_instances: 4096,
            clear_color: [0.23, 0.23, 0.28, 1.0],
            enable_validation: cfg!(debug_assertions),
        }
    }
}

impl Config for TextRendererConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TextRendererConfig = toml::from_str(
            r#"
            text = "A"
            font_px = 48.0
            "#,
        )
        .unwrap();

        assert_eq!(config.text, "A");
        assert_eq!(config.font_px, 48.0);
        assert_eq!(config.start_x, 60.0);
        assert_eq!(config.max_instances, 4096);
    }

    #[test]
    fn test_content_kind_is_lowercase() {
        let config: TextRendererConfig = toml::from_str(r#"content = "curves""#).unwrap();
        assert_eq!(config.content, ContentKind::Curves);
        assert_eq!(config.curve_count, 8);

        assert!(toml::from_str::<TextRendererConfig>(r#"content = "Curves""#).is_err());
        assert_eq!(TextRendererConfig::default().content, ContentKind::Text);
    }

    #[test]
    fn test_default_path_points_at_shipped_config() {
        let workspace = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let shipped = TextRendererConfig::load_from_file(workspace.join(TextRendererConfig::DEFAULT_PATH)).unwrap();
        assert_eq!(shipped.window_width, 1280);
    }

    #[test]
    fn test_shipped_demo_config_parses() {
        let shipped: TextRendererConfig =
            toml::from_str(include_str!("../../../../resources/config/text_demo.toml")).unwrap();
        let defaults = TextRendererConfig::default();

        assert_eq!(shipped.content, ContentKind::Text);
        assert_eq!(shipped.font_json, defaults.font_json);
        assert_eq!(shipped.atlas_image, defaults.atlas_image);
        assert_eq!(shipped.shader_dir, defaults.shader_dir);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = TextRendererConfig::default()
            .with_text("two\nlines")
            .with_curves(3)
            .with_max_instances(0)
            .with_clear_color([0.0, 0.0, 0.0, 1.0]);

        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        let parsed: TextRendererConfig = ron::from_str(&text).unwrap();

        assert_eq!(parsed, config);
        assert_eq!(parsed.max_instances, 1);
    }
}
