//! `rustedscout onboard`: First-time setup.

use super::CommandResult;
use rustedscout_config::AppConfig;

pub async fn run() -> CommandResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("RustedScout First-Time Setup");
    println!("===========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config.toml at: {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. Set api_key (or ANTHROPIC_API_KEY) for the reasoning model");
    println!("   2. Set [actions].tavily_api_key (or TAVILY_API_KEY) for web research");
    println!("   3. Run: rustedscout research \"your question\"\n");

    Ok(())
}
