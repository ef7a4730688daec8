//! `supportdesk init` — Write a default config file.

use std::path::Path;

use supportdesk_config::AppConfig;

pub async fn run(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_path = AppConfig::config_dir().join("config.toml");
    let path = config_path.unwrap_or(&default_path);

    println!("🛎️  supportdesk — Setup");
    println!("======================\n");

    write_default(path, force)?;
    println!("✅ Wrote {}", path.display());
    println!();
    println!("  Next steps:");
    println!("    supportdesk seed     # load demo orders, products and the warranty policy");
    println!("    supportdesk doctor   # check the database and the model provider");
    println!("    supportdesk chat     # talk to the agent");

    Ok(())
}

fn write_default(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(())
}
