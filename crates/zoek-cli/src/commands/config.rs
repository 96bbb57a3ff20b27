use std::path::Path;
use std::process::ExitCode;

use clap::Subcommand;
use zoek_core::config::ZoekConfig;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Create ~/.zoek/ with a default config file
    Init,
    /// Print the effective configuration
    Show,
}

pub fn run(action: ConfigAction, config_path: Option<&Path>) -> anyhow::Result<ExitCode> {
    match action {
        ConfigAction::Init => {
            let home = match config_path {
                Some(path) => {
                    if !path.exists() {
                        ZoekConfig::default().save_to(path)?;
                    }
                    println!("Initialized zoek config at {}", path.display());
                    return Ok(ExitCode::SUCCESS);
                }
                None => ZoekConfig::init()?,
            };
            let config = ZoekConfig::load(None)?;
            println!("Initialized zoek at {}", home.display());
            println!("  config: {}", ZoekConfig::config_path()?.display());
            println!("  mirror: {}", config.mirror_root()?.display());
            println!("  index:  {}", config.index_root()?.display());
            Ok(ExitCode::SUCCESS)
        }
        ConfigAction::Show => {
            let config = ZoekConfig::load(config_path)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{toml_str}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
