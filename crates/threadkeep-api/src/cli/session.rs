//! Session inspection commands: history and forget.

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use threadkeep_types::chat::{Namespace, Role, SessionKey, Turn};

use crate::state::AppState;

/// Print the live transcript of a session.
///
/// ```bash
/// threadkeep history my-session
/// threadkeep history ws-1 --namespace mcp --json
/// ```
pub async fn show_history(state: &AppState, session: &str, namespace: Namespace, json: bool) -> Result<()> {
    let key = SessionKey::new(namespace, session).context("Invalid session id")?;
    let turns = state
        .chat_service
        .history(&key)
        .await
        .with_context(|| format!("Failed to load history for '{key}'"))?;
    // Raw record count, malformed records included.
    let stored = state
        .chat_service
        .store()
        .len(&key)
        .await
        .with_context(|| format!("Failed to count records for '{key}'"))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "session_id": key.session_id(),
                "namespace": namespace,
                "count": turns.len(),
                "stored": stored,
                "turns": turns,
            }))?
        );
        return Ok(());
    }

    if turns.is_empty() {
        println!();
        println!(
            "  {} No history for '{}' (never used, expired or forgotten).",
            style("i").blue().bold(),
            style(key.session_id()).cyan()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("{}", history_table(&turns));
    println!(
        "  {} turn(s) in {}",
        style(turns.len()).bold(),
        style(key.as_str()).dim()
    );
    if stored > turns.len() {
        println!(
            "  {} {} malformed record(s) skipped",
            style("!").yellow().bold(),
            stored - turns.len()
        );
    }
    println!();
    Ok(())
}

/// Delete a session's transcript.
pub async fn forget(state: &AppState, session: &str, namespace: Namespace, json: bool) -> Result<()> {
    let key = SessionKey::new(namespace, session).context("Invalid session id")?;
    let deleted = state
        .chat_service
        .forget(&key)
        .await
        .with_context(|| format!("Failed to delete '{key}'"))?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "session_id": key.session_id(), "deleted": deleted })
        );
    } else if deleted {
        println!(
            "  {} Forgot session '{}'",
            style("✓").green().bold(),
            style(key.session_id()).cyan()
        );
    } else {
        println!(
            "  {} Nothing stored for '{}'",
            style("i").blue().bold(),
            style(key.session_id()).cyan()
        );
    }
    Ok(())
}

fn history_table(turns: &[Turn]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Text").fg(Color::White),
    ]);

    for (i, turn) in turns.iter().enumerate() {
        let role = match turn.role {
            Role::User => Cell::new("user").fg(Color::Cyan),
            Role::Model => Cell::new("model").fg(Color::Green),
        };
        table.add_row(vec![Cell::new(i + 1), role, Cell::new(preview(&turn.text, 120))]);
    }

    table
}

/// Truncate on a char boundary, appending an ellipsis when cut.
fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_state;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("line one\nline two", 40), "line one line two");
        assert_eq!(preview("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_history_table_lists_every_turn() {
        let turns = vec![Turn::user("Hi"), Turn::model("Hello!")];
        let rendered = history_table(&turns).to_string();
        assert!(rendered.contains("Hi"));
        assert!(rendered.contains("Hello!"));
        assert!(rendered.contains("model"));
    }

    #[tokio::test]
    async fn test_forget_then_history_is_empty() {
        let (state, _) = test_state();
        let key = SessionKey::new(Namespace::Chat, "cli").unwrap();
        state.chat_service.chat(Some(&key), "Hi").await.unwrap();

        forget(&state, "cli", Namespace::Chat, true).await.unwrap();
        assert!(state.chat_service.history(&key).await.unwrap().is_empty());

        show_history(&state, "cli", Namespace::Chat, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_session_id_is_an_error() {
        let (state, _) = test_state();
        assert!(show_history(&state, "", Namespace::Chat, false).await.is_err());
    }

    #[tokio::test]
    async fn test_history_reads_live_record_count() {
        let (state, _) = test_state();
        let key = SessionKey::new(Namespace::Chat, "counted").unwrap();
        state.chat_service.chat(Some(&key), "Hi").await.unwrap();

        assert_eq!(state.chat_service.store().len(&key).await.unwrap(), 2);
        show_history(&state, "counted", Namespace::Chat, false).await.unwrap();
    }
}
