//! Config command handlers

use anyhow::Result;

use trellis_core::Config;

use crate::output::{Output, OutputFormat};

/// Show the effective configuration
pub fn show(config: &Config, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => output.print_json(config),
        OutputFormat::Quiet => println!("{}", config.sqlite_path().display()),
        OutputFormat::Human => {
            println!("Config file:  {}", Config::config_file_path().display());
            println!("Data dir:     {}", config.data_dir.display());
            println!("Database:     {}", config.sqlite_path().display());
            println!("Busy timeout: {} ms", config.busy_timeout_ms);
            println!("Log level:    {}", config.log_level);
            println!(
                "Default user: {}",
                config.default_user.as_deref().unwrap_or("(none)")
            );
        }
    }
    Ok(())
}

/// Print the config file location
pub fn path() -> Result<()> {
    println!("{}", Config::config_file_path().display());
    Ok(())
}
