use anyhow::{anyhow, bail, Context, Result};
use clap::Subcommand;
use serde::Serialize;

use aiterm_client::{BackendClient, DEFAULT_HISTORY_LIMIT};
use aiterm_core::SessionStore;
use aiterm_observability::ProcessKind;
use aiterm_types::{Executor, HistoryEntry};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Interactive terminal UI (default).
    Tui,
    /// Run one natural-language command and print its output.
    Exec {
        /// Mark the command as spoken.
        #[arg(long, default_value_t = false)]
        voice: bool,
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// Backend health and capability flags.
    Health,
    /// Backend working directory.
    Directory,
    /// Recent commands recorded by the backend.
    History {
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
    /// Commands the sandboxed executor could not handle.
    Feedback,
    /// Search for a file by name.
    Search {
        filename: String,
        #[arg(long)]
        start_dir: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "available"
    } else {
        "unavailable"
    }
}

pub async fn run(
    command: Command,
    client: &BackendClient,
    executor: Executor,
    json: bool,
) -> Result<()> {
    match command {
        Command::Tui => bail!("the interactive UI is not a one-shot command"),
        Command::Exec { voice, words } => exec(client, &words.join(" "), voice, executor, json).await,
        Command::Health => {
            let health = client.health().await.context("health check failed")?;
            if json {
                return print_json(&health);
            }
            println!("status:     {}", health.status.as_deref().unwrap_or("unknown"));
            println!("gemini ai:  {}", yes_no(health.gemini_available));
            println!("mini bash:  {}", yes_no(health.mini_bash_available));
            if let Some(dir) = &health.current_directory {
                println!("directory:  {dir}");
            }
            Ok(())
        }
        Command::Directory => {
            let dir = client
                .current_directory()
                .await
                .context("failed to fetch directory")?;
            if json {
                return print_json(&dir);
            }
            println!("{}", dir.current_directory);
            Ok(())
        }
        Command::History { limit } => {
            let history = client.history(limit).await.context("failed to fetch history")?;
            if json {
                return print_json(&history);
            }
            for entry in &history.history {
                let mark = if entry.result.success { "ok" } else { "failed" };
                let voice = if entry.is_voice { " [voice]" } else { "" };
                println!(
                    "{}  {}{} -> {} ({mark})",
                    entry.timestamp, entry.user_input, voice, entry.command
                );
            }
            println!("{} of {} entries", history.history.len(), history.total);
            Ok(())
        }
        Command::Feedback => {
            let feedback = client.feedback().await.context("failed to fetch feedback")?;
            if json {
                return print_json(&feedback);
            }
            for entry in &feedback.feedback {
                println!("{}  {}  [{}] {}", entry.timestamp, entry.command, entry.status, entry.error);
            }
            println!("{} entries", feedback.total);
            Ok(())
        }
        Command::Search {
            filename,
            start_dir,
        } => {
            let found = client
                .search_files(&filename, start_dir.as_deref())
                .await
                .context("search failed")?;
            if json {
                return print_json(&found);
            }
            for path in &found.results {
                println!("{path}");
            }
            eprintln!("{} match(es) for '{}'", found.count, found.search_term);
            Ok(())
        }
    }
}

async fn exec(
    client: &BackendClient,
    text: &str,
    is_voice: bool,
    executor: Executor,
    json: bool,
) -> Result<()> {
    let mut store = SessionStore::for_process(ProcessKind::Cli);
    store
        .submit_command(client, text, is_voice, executor)
        .await
        .ok_or_else(|| anyhow!("nothing to execute"))?;

    if json {
        return print_json(&store.history());
    }

    match store.history().last() {
        Some(HistoryEntry::Output {
            content,
            success,
            command,
            ai_interpretation,
            executor,
            ..
        }) => {
            if let (Some(command), Some(ai)) = (command, ai_interpretation) {
                eprintln!("AI: {command} ({}% confident)", ai.confidence_percent());
            }
            if !content.is_empty() {
                println!("{content}");
            }
            if let Some(executor) = executor {
                eprintln!("Executed by: {executor}");
            }
            if !success {
                bail!("command failed");
            }
            Ok(())
        }
        Some(HistoryEntry::Error { content, .. }) => Err(anyhow!("{content}")),
        _ => Err(anyhow!("no result recorded")),
    }
}
