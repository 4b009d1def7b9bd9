use std::io::Write as _;

use browserpilot_core::types::{Message, Role};
use browserpilot_core::{Config, Paths};
use tokio::io::AsyncBufReadExt;

pub async fn run(message: Option<String>, session: String) -> anyhow::Result<()> {
    let paths = Paths::new();
    paths.ensure_dirs()?;
    let config = Config::load_or_default(&paths)?;
    let runtime = super::build_runtime(config, &paths)?;

    if let Some(msg) = message {
        // Single message mode
        let transcript = runtime.process_message(&session, &msg).await?;
        println!("{}", final_assistant_text(&transcript));
        runtime.release_browser(&session).await;
        return Ok(());
    }

    println!("browserpilot interactive mode (/quit to exit)");
    println!("Session: {}", session);
    println!("Commands: /clear reset this conversation | /quit exit");
    println!();

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input {
            "/quit" | "/exit" => break,
            "/clear" => {
                runtime.clear_session(&session).await;
                println!("Session cleared");
                continue;
            }
            _ => {}
        }

        match runtime.process_message(&session, input).await {
            Ok(transcript) => println!("\n{}\n", final_assistant_text(&transcript)),
            Err(e) => eprintln!("\nerror: {}\n", e),
        }
    }

    runtime.release_browser(&session).await;
    println!("Goodbye!");
    Ok(())
}

fn final_assistant_text(transcript: &[Message]) -> String {
    transcript
        .iter()
        .rev()
        .find(|message| message.role == Role::Assistant)
        .map(|message| message.text())
        .unwrap_or_default()
}
