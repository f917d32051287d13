//! Terminal chat against the advisor, sharing configuration and memory
//! with the API server.

use competitive_intel_advisor::{agent::Advisor, config::AdvisorConfig};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = AdvisorConfig::from_env()?;
    let advisor = Advisor::from_config(&config)?;
    let session = std::env::args().nth(1);

    info!(session = ?session, "Competitive Intelligence Advisor starting");

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();

    stdout
        .write_all(b"Competitive Intelligence Advisor. Commands: /history, /clear, /quit\n")
        .await?;

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                let (_, turns) = advisor.session_history(session.as_deref(), None).await?;
                if turns.is_empty() {
                    println!("(no history)");
                }
                for turn in turns {
                    println!("[{}] {}", turn.role, turn.text);
                }
            }
            "/clear" => {
                let (_, removed) = advisor.clear_session(session.as_deref()).await?;
                println!("Memory cleared ({} turns removed)", removed);
            }
            prompt => match advisor.chat(session.as_deref(), prompt).await {
                Ok(reply) => {
                    println!("{}", reply.answer);
                    if !reply.tools_used.is_empty() {
                        let names: Vec<&str> =
                            reply.tools_used.iter().map(|t| t.name.as_str()).collect();
                        println!("\n(tools: {})", names.join(", "));
                    }
                }
                Err(e) => eprintln!("Error: {}", e),
            },
        }
    }

    Ok(())
}
