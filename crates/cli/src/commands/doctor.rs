//! `supportdesk doctor` — Diagnose system health.

use std::path::Path;

use supportdesk_config::AppConfig;
use supportdesk_core::provider::Provider;
use supportdesk_core::store::CatalogStore;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 supportdesk doctor — System Diagnostics");
    println!("==========================================\n");

    let mut issues = 0;

    let default_path = AppConfig::config_dir().join("config.toml");
    let path = config_path.unwrap_or(&default_path);
    if path.exists() {
        println!("  ✅ Config file found: {}", path.display());
    } else {
        println!("  ⚠️  No config file at {} — using defaults (run `supportdesk init`)", path.display());
    }

    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ {e}");
            println!("\n  ⚠️  Fix the config before running the remaining checks.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else if config.provider.default_provider != "ollama" {
        println!(
            "  ⚠️  No API key for '{}' — set SUPPORTDESK_API_KEY",
            config.provider.default_provider
        );
        issues += 1;
    }

    // Database
    match super::open_store(&config).await {
        Ok(store) => {
            match store.ping().await {
                Ok(()) => println!("  ✅ Database reachable: {}", config.database.url),
                Err(e) => {
                    println!("  ❌ Database ping failed: {e}");
                    issues += 1;
                }
            }
            match store.product_names().await {
                Ok(names) if !names.is_empty() => println!("  ✅ {} products in catalog", names.len()),
                Ok(_) => {
                    println!("  ⚠️  Catalog is empty — run `supportdesk seed`");
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Catalog unreadable: {e}");
                    issues += 1;
                }
            }
            match store.find_policy(&config.intents.warranty_policy_type).await {
                Ok(Some(_)) => println!("  ✅ Warranty policy present"),
                Ok(None) => {
                    println!(
                        "  ⚠️  No '{}' policy — warranty questions will fail",
                        config.intents.warranty_policy_type
                    );
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Policy lookup failed: {e}");
                    issues += 1;
                }
            }
            store.close().await;
        }
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Provider
    let provider = supportdesk_providers::build_from_config(&config)
        .map_err(|e| e.to_string())
        .and_then(|router| {
            println!("  ✅ Providers configured: {}", router.list().join(", "));
            router
                .default_provider()
                .ok_or_else(|| format!("Provider '{}' is not configured", config.provider.default_provider))
        });
    match provider {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => {
                println!("  ✅ Provider '{}' reachable", provider.name());
                match provider.list_models().await {
                    Ok(models) if models.iter().any(|m| m == &config.provider.default_model) => {
                        println!("  ✅ Model '{}' available", config.provider.default_model)
                    }
                    Ok(models) if models.is_empty() => {}
                    Ok(_) => {
                        println!(
                            "  ⚠️  Model '{}' not listed by the provider",
                            config.provider.default_model
                        );
                        issues += 1;
                    }
                    Err(e) => {
                        println!("  ⚠️  Could not list models: {e}");
                        issues += 1;
                    }
                }
            }
            Ok(false) => {
                println!("  ❌ Provider '{}' did not answer", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
