use clap::Parser;

use snapcam::cli::{self, Args, Command};
use snapcam::config::{self, Config};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(config::default_path);

    let cfg = match Config::load(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Command::ListDevices => {
            cli::list_devices(&cfg);
            Ok(())
        }
        Command::Config { action } => cli::handle_config_action(&cfg, &config_path, action),
        Command::Photo { save, camera } => {
            run_async(async { cli::run_photo(&cfg, save, camera).await })
        }
        Command::Video { seconds, camera } => {
            if let Err(e) = cli::setup_ctrlc_handler() {
                log::warn!("Failed to set Ctrl+C handler: {}", e);
            }
            run_async(async { cli::run_video(&cfg, seconds, camera).await })
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_async<F>(future: F) -> Result<(), String>
where
    F: std::future::Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start async runtime: {}", e))?;
    runtime.block_on(future)
}
