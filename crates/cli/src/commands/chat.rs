//! `supportdesk chat` — Interactive or single-message chat mode.

use std::io::Write;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

pub async fn run(
    config_path: Option<&Path>,
    session_id: &str,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let store = super::open_store(&config).await?;
    let engine = super::build_engine(&config, &store)?;

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let reply = engine.process_message(session_id, &msg).await;
        eprint!("\r              \r");
        let reply = reply?;
        println!("{}", reply.message);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║     supportdesk — Interactive Chat           ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.provider.default_provider);
    println!("  Model:     {}", config.provider.default_model);
    println!("  Session:   {session_id}");
    println!("  Memory:    last {} exchanges", config.memory.window_exchanges);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    debug!(session_id = %session_id, "Interactive chat started");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if !line.is_empty() {
            eprint!("  ...");
            match engine.process_message(session_id, line).await {
                Ok(reply) => {
                    eprint!("\r     \r");
                    println!();
                    for text in reply.message.lines() {
                        println!("  Assistant > {text}");
                    }
                    println!();
                }
                Err(e) => {
                    eprint!("\r     \r");
                    let hint = if e.is_retryable() { " (try again)" } else { "" };
                    eprintln!("  [Error] {e}{hint}");
                    println!();
                }
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Sampai jumpa! 👋");
    println!();

    store.close().await;
    Ok(())
}
