//! Folio Assistant - terminal front end for the portfolio assistant.
//!
//! Lines typed at the prompt go to the conversation session; lines starting
//! with `/` are local commands.

mod config;
mod page;
mod render;

use agent_host::{suggestions, AgentHost, PromptCategory, SubmitOutcome, UserInput};
use parking_lot::Mutex;
use services::theme_store::ReloadRequest;
use shared::document::SharedDocument;
use shared::events::{SessionEvent, TurnPhase};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::render::Renderer;

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Say(String),
    Help,
    Suggest(Option<PromptCategory>),
    Page,
    Status,
    Reset,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Say(line.to_string());
        };
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next().unwrap_or_default().trim();
        match name.as_str() {
            "help" | "?" => Command::Help,
            "suggest" => Command::Suggest(PromptCategory::parse(arg)),
            "page" => Command::Page,
            "status" => Command::Status,
            "reset" => Command::Reset,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(name),
        }
    }
}

const HELP: &str = "Commands:
  /suggest [theme|info|contact]  show example prompts
  /page                          print the current page outline
  /status                        show whether a custom theme is active
  /reset                         forget the custom theme and reload the page
  /quit                          leave
Start a message with \"Theme:\" to restyle the page.";

fn apply_reload(_reload: ReloadRequest, document: &SharedDocument) {
    document.lock().reload();
}

/// Progress lines for the in-flight turn.
fn status_line(event: &SessionEvent) -> Option<&'static str> {
    match event {
        SessionEvent::PhaseChanged {
            phase: TurnPhase::AwaitingSearch,
            ..
        } => Some("(searching the web...)"),
        SessionEvent::PhaseChanged {
            phase: TurnPhase::ApplyingMutations,
            ..
        } => Some("(applying theme changes...)"),
        SessionEvent::SearchDegraded { .. } => Some("(web search unavailable, answering without it)"),
        SessionEvent::ReloadRequested => Some("(theme cleared, page reloaded)"),
        _ => None,
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let (settings, found) = config::load_settings_or_default();
    if !found {
        config::save_settings(&settings);
    }
    let biography = config::load_biography(&settings);

    let portfolio = Arc::new(Mutex::new(page::portfolio_page()));
    let document: SharedDocument = portfolio.clone();
    let host = AgentHost::from_settings(settings, document.clone(), biography);
    let restored = host.restore_theme();
    if let Some(label) = host.theme_status().label() {
        tracing::info!(applied = restored.applied.len(), "{}", label);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = host.open_session().with_events(tx);
    let renderer = Renderer::new(host.settings.persona.name.clone());

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = status_line(&event) {
                println!("{}", line);
            }
        }
    });

    for message in session.snapshot().messages {
        println!("{}", renderer.message(&message));
    }
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Say(text) => {
                let outcome = session.submit(UserInput::typed(text)).await;
                if outcome == SubmitOutcome::Busy {
                    println!("(still working on the last message)");
                }
                if !matches!(outcome, SubmitOutcome::Ignored | SubmitOutcome::Busy) {
                    if let Some(reply) = session.snapshot().messages.last() {
                        println!("{}", renderer.message(reply));
                    }
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Suggest(category) => {
                for s in suggestions(category) {
                    println!("  [{}] {}", s.category.as_str(), s.text);
                }
            }
            Command::Page => println!("{}", portfolio.lock().outline()),
            Command::Status => match session.theme_status().label() {
                Some(label) => println!("{}", label),
                None => println!("Default theme"),
            },
            Command::Reset => match session.reset_theme() {
                Ok(reload) => apply_reload(reload, &document),
                Err(e) => println!("{}", e.render()),
            },
            Command::Quit => break,
            Command::Unknown(name) => println!("Unknown command /{}. Type /help.", name),
        }
        prompt();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("  hello there "), Command::Say("hello there".into()));
        assert_eq!(Command::parse("Theme: dark"), Command::Say("Theme: dark".into()));
        assert_eq!(Command::parse("/QUIT"), Command::Quit);
        assert_eq!(
            Command::parse("/suggest contact"),
            Command::Suggest(Some(PromptCategory::Contact))
        );
        assert_eq!(Command::parse("/suggest all"), Command::Suggest(None));
        assert_eq!(Command::parse("/nope"), Command::Unknown("nope".into()));
    }

    #[test]
    fn test_status_lines() {
        assert!(status_line(&SessionEvent::ReloadRequested).is_some());
        assert!(status_line(&SessionEvent::MessageUpdated { index: 1 }).is_none());
    }
}
