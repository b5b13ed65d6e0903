use hrdesk_agent::runtime::AgentRuntime;
use hrdesk_core::config::AppConfig;
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use super::CommandResult;

const EXIT_WORDS: &[&str] = &["exit", "bye"];

pub async fn run(config: &AppConfig, session_id: &str) -> CommandResult {
    let runtime = AgentRuntime::from_config(config);
    let mut out = stdout();

    let greeting = runtime.open_session(session_id).await;
    if let Err(error) = write_messages(&mut out, &greeting).await {
        return CommandResult::failure("chat", "io", error.to_string(), 3);
    }

    let mut lines = BufReader::new(stdin()).lines();
    let mut turns = 0usize;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => return CommandResult::failure("chat", "io", error.to_string(), 3),
        };
        if EXIT_WORDS.contains(&line.trim().to_ascii_lowercase().as_str()) {
            break;
        }

        let reply = runtime.handle_message(session_id, &line).await;
        turns += 1;
        if let Err(error) = write_messages(&mut out, &reply.messages).await {
            return CommandResult::failure("chat", "io", error.to_string(), 3);
        }
    }

    info!(event_name = "cli.chat_ended", session_id, turns, "chat session ended");
    CommandResult::success("chat", format!("chat session `{session_id}` ended after {turns} turns"))
}

async fn write_messages(
    out: &mut tokio::io::Stdout,
    messages: &[String],
) -> std::io::Result<()> {
    for message in messages {
        out.write_all(format!("bot> {message}\n").as_bytes()).await?;
    }
    out.flush().await
}
