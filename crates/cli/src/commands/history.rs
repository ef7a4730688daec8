//! `supportdesk history` — Print a session's committed messages.

use std::path::Path;

use supportdesk_core::message::StoredMessage;
use supportdesk_core::store::MessageLog;

pub async fn run(config_path: Option<&Path>, session_id: &str, raw: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let store = super::open_store(&config).await?;

    let messages = store.history(session_id).await?;

    if raw {
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else if messages.is_empty() {
        println!("  No messages for session '{session_id}'");
    } else {
        println!("📜 Session {session_id} — {} messages", messages.len());
        println!();
        for message in &messages {
            println!("{}", render(message));
        }
    }

    store.close().await;
    Ok(())
}

fn render(message: &StoredMessage) -> String {
    let mut header = format!(
        "  [{}] #{} {}",
        message.created_at.format("%Y-%m-%d %H:%M:%S"),
        message.turn_index,
        message.role.as_str()
    );
    if !message.tool_calls.is_empty() {
        header.push_str(&format!(" (tools: {})", message.tool_calls.join(", ")));
    }

    let body: Vec<String> = message.content.lines().map(|line| format!("    {line}")).collect();
    format!("{header}\n{}\n", body.join("\n"))
}
