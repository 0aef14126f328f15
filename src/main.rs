use fbx_viewer::cli::CliOverrides;
use fbx_viewer::config::ViewerConfig;
use fbx_viewer::run_with_overrides;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    let mut config = ViewerConfig::load_or_default(&cli.config_path);
    config.apply_overrides(&cli.config_overrides());
    if let Err(err) = pollster::block_on(run_with_overrides(config, cli.open)) {
        log::error!("Application error: {err:?}");
        std::process::exit(1);
    }
}
