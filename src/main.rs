use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use genie_chat::config::{self, GenieConfig, SpaceConfig};
use genie_chat::error::{Error, GenieError};
use genie_chat::genie::{Attachment, Conversation, Message, MessageStatus};
use genie_chat::render::format_table;
use genie_chat::store::{HistorySink, JsonlHistory};
use genie_chat::transport::ApiClient;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = GenieConfig::from_env().context("Genie configuration")?;

    let spaces_path = std::env::var("GENIE_SPACES_FILE")
        .unwrap_or_else(|_| "./data/genie_spaces.json".to_string());
    let spaces = config::load_spaces(Path::new(&spaces_path)).unwrap_or_default();

    let space_id = match std::env::var("GENIE_SPACE_ID") {
        Ok(id) if !id.is_empty() => id,
        _ => spaces
            .first()
            .map(|space| space.id.clone())
            .context("GENIE_SPACE_ID not set and no spaces configured")?,
    };

    let history_path = std::env::var("GENIE_HISTORY_FILE")
        .unwrap_or_else(|_| "./data/genie_history.jsonl".to_string());
    let user = std::env::var("GENIE_USER")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "unknown".to_string());

    eprintln!("🧞 Genie chat v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Host:    {}", config.host);
    eprintln!("   Space:   {}", space_label(&spaces, &space_id));
    eprintln!("   History: {}", history_path);
    eprintln!("   Ask a question and press Enter. /new starts over, /quit exits.\n");

    let history: Arc<dyn HistorySink> = Arc::new(JsonlHistory::new(&history_path));
    let api = Arc::new(ApiClient::new(&config));
    let mut conversation =
        Conversation::new(api, Arc::clone(&history), &space_id, &user).with_poll_config(config.poll);

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    eprint!("> ");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "/quit" | "/exit" => break,
            "/new" => {
                conversation.reset();
                eprintln!("Started a fresh conversation.");
            }
            "/spaces" => {
                for space in &spaces {
                    println!("{}  {}", space.id, space.name);
                }
            }
            "/history" => show_history(history.as_ref()).await,
            "/poll" => {
                // Resume waiting on the current message after a timeout.
                if let Err(e) = poll_and_render(&conversation).await {
                    report_error(&e);
                }
            }
            prompt => {
                if let Err(e) = run_exchange(&mut conversation, prompt).await {
                    report_error(&e);
                }
            }
        }
        eprint!("> ");
    }

    Ok(())
}

/// Drive one prompt end to end: send, poll, render.
async fn run_exchange(conversation: &mut Conversation, prompt: &str) -> Result<(), Error> {
    conversation.ask(prompt).await?;
    poll_and_render(conversation).await
}

async fn poll_and_render(conversation: &Conversation) -> Result<(), Error> {
    eprintln!("⏳ Waiting for Genie...");
    let message = conversation.wait_for_reply().await?;

    if message.status == MessageStatus::Failed {
        eprintln!("❌ Genie could not answer this prompt.");
        return Ok(());
    }
    if message.attachments.is_empty() {
        println!("(no attachments in the response)");
        return Ok(());
    }
    for attachment in &message.attachments {
        render_attachment(conversation, &message, attachment).await;
    }
    Ok(())
}

async fn render_attachment(
    conversation: &Conversation,
    message: &Message,
    attachment: &Attachment,
) {
    match attachment {
        Attachment::Text { content } => {
            println!("\n{content}\n");
        }
        Attachment::Query {
            sql,
            description,
            attachment_id,
        } => {
            if !description.is_empty() {
                println!("\n{description}");
            }
            println!("\n{sql}\n");
            let Some(attachment_id) = attachment_id else {
                return;
            };
            match conversation.fetch_query_result(message, attachment_id).await {
                Ok(result) if result.is_empty() => println!("(no data)"),
                Ok(result) => println!("{}", format_table(&result)),
                Err(Error::Genie(GenieError::MalformedResult { reason })) => {
                    tracing::warn!("Unreadable query result: {reason}");
                    println!("(no data)");
                }
                Err(e) => eprintln!("❌ Could not fetch query result: {e}"),
            }
        }
    }
}

async fn show_history(history: &dyn HistorySink) {
    match history.recent(10).await {
        Ok(entries) if entries.is_empty() => eprintln!("No chat history yet."),
        Ok(entries) => {
            for entry in entries {
                println!(
                    "[{}] {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.prompt
                );
            }
        }
        Err(e) => eprintln!("❌ Could not read history: {e}"),
    }
}

fn report_error(error: &Error) {
    match error {
        Error::Genie(GenieError::Timeout { elapsed, .. }) => {
            eprintln!(
                "⏳ No answer after {elapsed:?}. Genie may still be working; /poll keeps waiting."
            );
        }
        other => eprintln!("❌ {other}"),
    }
}

fn space_label(spaces: &[SpaceConfig], space_id: &str) -> String {
    spaces
        .iter()
        .find(|space| space.id == space_id)
        .map(|space| format!("{} ({})", space.name, space.id))
        .unwrap_or_else(|| space_id.to_string())
}
