//! One-shot prompt from the terminal.

use anyhow::{Context, Result};
use console::style;

use threadkeep_types::chat::{MemoryMode, Namespace, SessionKey};

use crate::state::AppState;

/// Send `text`, continuing `session` when given, and print the answer.
pub async fn ask(
    state: &AppState,
    text: &str,
    session: Option<&str>,
    namespace: Namespace,
    json: bool,
) -> Result<()> {
    let key = session
        .map(|id| SessionKey::new(namespace, id))
        .transpose()
        .context("Invalid session id")?;

    let reply = state.chat_service.chat(key.as_ref(), text).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "response": reply.text,
                "session_id": key.as_ref().map(|k| k.session_id()),
                "memory": reply.memory,
            })
        );
        return Ok(());
    }

    println!("{}", reply.text);
    match reply.memory {
        MemoryMode::Used if reply.history_len > 0 => eprintln!(
            "  {}",
            style(format!("(continued from {} earlier turn(s))", reply.history_len)).dim()
        ),
        MemoryMode::Degraded => eprintln!(
            "  {} {}",
            style("!").yellow().bold(),
            style("store unavailable, answered without memory").yellow()
        ),
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_state;

    #[tokio::test]
    async fn test_ask_with_session_persists() {
        let (state, _) = test_state();
        ask(&state, "Hi", Some("term"), Namespace::Chat, true).await.unwrap();

        let key = SessionKey::new(Namespace::Chat, "term").unwrap();
        assert_eq!(state.chat_service.history(&key).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ask_surfaces_model_failure() {
        let (state, provider) = test_state();
        provider.set_failing(true);
        assert!(ask(&state, "Hi", None, Namespace::Chat, false).await.is_err());
    }
}
