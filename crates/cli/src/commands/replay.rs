use std::fs;
use std::path::Path;

use hrdesk_agent::runtime::{AgentRuntime, TurnReply};
use hrdesk_core::config::AppConfig;
use serde::Serialize;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct GreetingLine<'a> {
    turn: usize,
    session_id: &'a str,
    messages: &'a [String],
}

#[derive(Debug, Serialize)]
struct ReplayLine<'a> {
    turn: usize,
    input: &'a str,
    #[serde(flatten)]
    reply: &'a TurnReply,
}

/// Reads user messages from `path`, one per line, and replays them through a
/// fresh session. Blank lines and lines starting with `#` are skipped.
pub async fn run(config: &AppConfig, path: &Path, session_id: &str) -> CommandResult {
    let transcript = match fs::read_to_string(path) {
        Ok(transcript) => transcript,
        Err(error) => {
            return CommandResult::failure(
                "replay",
                "io",
                format!("could not read transcript `{}`: {error}", path.display()),
                3,
            )
        }
    };

    let runtime = AgentRuntime::from_config(config);
    let greeting = runtime.open_session(session_id).await;

    let mut lines = Vec::new();
    match serde_json::to_string(&GreetingLine { turn: 0, session_id, messages: &greeting }) {
        Ok(line) => lines.push(line),
        Err(error) => {
            return CommandResult::failure("replay", "serialization", error.to_string(), 5)
        }
    }

    let inputs = transcript
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'));

    let mut turns = 0usize;
    for input in inputs {
        let reply = runtime.handle_message(session_id, input).await;
        turns += 1;
        match serde_json::to_string(&ReplayLine { turn: turns, input, reply: &reply }) {
            Ok(line) => lines.push(line),
            Err(error) => {
                return CommandResult::failure("replay", "serialization", error.to_string(), 5)
                    .with_preamble(&lines)
            }
        }
    }

    CommandResult::success("replay", format!("replayed {turns} turns for session `{session_id}`"))
        .with_preamble(&lines)
}
