use fbx_viewer::cli::CliOverrides;
use fbx_viewer::config::{Theme, ViewerConfig, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;

#[test]
fn shipped_config_matches_defaults() {
    let shipped = ViewerConfig::load(DEFAULT_CONFIG_PATH).expect("config/viewer.json parses");
    let defaults = ViewerConfig::default();
    assert_eq!(shipped.window.width, defaults.window.width);
    assert_eq!(shipped.window.height, defaults.window.height);
    assert_eq!(shipped.assets.textures_dir, defaults.assets.textures_dir);
    assert_eq!(shipped.assets.environments_dir, defaults.assets.environments_dir);
    assert_eq!(shipped.assets.uploaded_texture_prefix, defaults.assets.uploaded_texture_prefix);
    assert_eq!(shipped.camera.framing_scale, defaults.camera.framing_scale);
    assert_eq!(shipped.cache.texture_limit, None);
    assert_eq!(shipped.theme, Theme::Light);
}

#[test]
fn command_line_overrides_apply_on_top_of_the_file() {
    let args = ["fbx_viewer", "--theme", "dark", "--width", "800", "--open", "a.fbx", "--open", "b.fbx"];
    let cli = CliOverrides::parse(args).expect("arguments parse");
    let mut config = ViewerConfig::load_or_default(&cli.config_path);
    config.apply_overrides(&cli.config_overrides());

    assert_eq!(config.theme, Theme::Dark);
    assert_eq!(config.window.width, 800);
    assert_eq!(config.window.height, 720);
    assert_eq!(cli.open, vec![PathBuf::from("a.fbx"), PathBuf::from("b.fbx")]);
}
