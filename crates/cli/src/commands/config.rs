//! `folio config`: inspect and edit the configuration file.

use eyre::{Result, WrapErr, eyre};
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub async fn handle_config_command(cmd: ConfigCommands, path: &Path) -> Result<()> {
    match cmd {
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Show => {
            let config = Config::load(path).await?;
            println!("{}", config.show_all());
            println!("\nFile: {}", path.display());
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(path).await?;
            for line in lookup(&config, &key)? {
                println!("{}", line);
            }
        }
        ConfigCommands::Set { key, value } => {
            let change = update(path, &key, &value).await?;
            println!("✅ {}", change);
        }
        ConfigCommands::Reset { force } => {
            if !force && !confirm_reset(&mut io::stdin().lock())? {
                println!("❌ Cancelled");
                return Ok(());
            }
            Config::reset(path).await?;
            println!("✅ {} reset to defaults", path.display());
        }
    }

    Ok(())
}

/// `key = value` lines for one key, or for every key of a section.
fn lookup(config: &Config, key: &str) -> Result<Vec<String>> {
    let section = format!("{}.", key.trim_end_matches('.'));
    let keys: Vec<&str> = Config::KEYS
        .iter()
        .copied()
        .filter(|k| *k == key || k.starts_with(&section))
        .collect();

    if keys.is_empty() {
        return Err(eyre!("Unknown configuration key: {}", key));
    }

    keys.into_iter()
        .map(|k| Ok(format!("{} = {}", k, shown(&config.get_value(k)?))))
        .collect()
}

/// Apply one assignment and persist it. The file is left untouched when the
/// result would not be accepted by the export manager.
async fn update(path: &Path, key: &str, value: &str) -> Result<String> {
    let mut config = Config::load(path).await?;
    let before = config.get_value(key)?;

    config.set_value(key, value)?;
    config
        .export_options()
        .validate()
        .wrap_err_with(|| format!("Refusing to set {}", key))?;
    config.save(path).await?;

    Ok(format!(
        "{}: {} -> {}",
        key,
        shown(&before),
        shown(&config.get_value(key)?)
    ))
}

fn confirm_reset(input: &mut impl BufRead) -> Result<bool> {
    print!("Reset all configuration to defaults? (y/N): ");
    io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn shown(value: &str) -> &str {
    if value.is_empty() { "(not set)" } else { value }
}
