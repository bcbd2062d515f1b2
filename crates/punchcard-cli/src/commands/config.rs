//! Configuration management commands.

use clap::Subcommand;
use punchcard_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the active configuration
    Show,
    /// Set the attendance API base URL
    SetUrl { url: String },
    /// Set the API access token
    SetToken { token: String },
    /// Print the configuration file path
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::SetUrl { url } => {
            let mut config = Config::load()?;
            config.api.base_url = url;
            config.save()?;
            println!("Saved to {}.", Config::path()?.display());
        }
        ConfigAction::SetToken { token } => {
            let mut config = Config::load()?;
            config.api.access_token = Some(token);
            config.save()?;
            println!("Saved to {}.", Config::path()?.display());
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
    }
    Ok(())
}
