use std::fmt;

use services::{AppServices, ClientConfig, Clock, DeckStore};
use study_core::model::DeckId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDeckId { raw: String },
    MissingDeckId,
    MissingCredentials,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDeckId { raw } => write!(f, "invalid --deck-id value: {raw}"),
            ArgsError::MissingDeckId => write!(f, "study requires --deck-id"),
            ArgsError::MissingCredentials => {
                write!(f, "not signed in: set --email and FLASHCARDS_PASSWORD")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- decks [--api-url <url>] [--email <email>]");
    eprintln!("  cargo run -p app -- study --deck-id <id> [--api-url <url>] [--email <email>]");
    eprintln!();
    eprintln!("While studying, type an answer to submit it, or:");
    eprintln!("  :n next card   :p previous card   :s show/hide answer");
    eprintln!("  :r restart     :q end session");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FLASHCARDS_API_URL, FLASHCARDS_HTTP_TIMEOUT_SECS");
    eprintln!("  FLASHCARDS_EMAIL, FLASHCARDS_PASSWORD, FLASHCARDS_DECK_ID");
    eprintln!("  RUST_LOG (default: info)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Decks,
    Study,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "decks" => Some(Self::Decks),
            "study" => Some(Self::Study),
            _ => None,
        }
    }
}

struct Args {
    api_url: Option<String>,
    email: Option<String>,
    deck_id: Option<DeckId>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut api_url = None;
        let mut email = std::env::var("FLASHCARDS_EMAIL").ok();
        let mut deck_id = std::env::var("FLASHCARDS_DECK_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(DeckId::new);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api-url" => api_url = Some(require_value(args, "--api-url")?),
                "--email" => email = Some(require_value(args, "--email")?),
                "--deck-id" => {
                    let value = require_value(args, "--deck-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidDeckId { raw: value.clone() })?;
                    deck_id = Some(DeckId::new(parsed));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            api_url,
            email,
            deck_id,
        })
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Study,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Study,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = parsed.api_url.as_deref() {
        config.set_base_url(url)?;
    }
    let services = AppServices::new_http(&config, Clock::default())?;

    sign_in(&services, parsed.email.as_deref()).await?;
    let mut store = services.deck_store();

    match cmd {
        Command::Decks => {
            for deck in store.fetch_decks().await? {
                println!("{:>6}  {} ({} cards)", deck.id, deck.name, deck.cards.len());
            }
            Ok(())
        }
        Command::Study => {
            let deck_id = parsed.deck_id.ok_or(ArgsError::MissingDeckId)?;
            study(&mut store, deck_id).await
        }
    }
}

/// Restore a session from the refresh cookie, falling back to a password login.
async fn sign_in(
    services: &AppServices,
    email: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = services.session();
    session.check_auth().await;
    if session.is_authenticated() {
        info!("session restored");
    } else {
        let email = email.ok_or(ArgsError::MissingCredentials)?;
        let password =
            std::env::var("FLASHCARDS_PASSWORD").map_err(|_| ArgsError::MissingCredentials)?;
        session.login(email, &password).await?;
    }

    if let Err(err) = services.users().fetch_current().await {
        warn!(error = %err, "could not load profile");
    }
    Ok(())
}

async fn study(store: &mut DeckStore, deck_id: DeckId) -> Result<(), Box<dyn std::error::Error>> {
    store.start_session(deck_id).await?;
    if let Some(deck) = store.study().deck() {
        println!("Studying \"{}\" ({} cards)", deck.name, deck.cards.len());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_card(store);

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":q" => break,
            ":n" => store.next_card(),
            ":p" => store.previous_card(),
            ":s" => store.toggle_answer(),
            ":r" => store.reset_session(),
            "" => continue,
            answer => match store.submit_answer(answer).await {
                Ok(verdict) => {
                    println!("{}", if verdict.is_correct { "correct" } else { "incorrect" });
                    if !store.is_last_card() {
                        store.next_card();
                    }
                }
                Err(err) => {
                    eprintln!("{err}");
                    store.clear_error();
                }
            },
        }
        print_card(store);
    }

    let summary = store.end_session().await?;
    println!(
        "{} correct, {} incorrect ({:.0}% accuracy), deck {:.0}% complete",
        summary.counters.correct(),
        summary.counters.incorrect(),
        summary.accuracy_percentage,
        summary.completion_percentage
    );
    Ok(())
}

fn print_card(store: &DeckStore) {
    let Some(card) = store.current_card() else {
        println!("(no cards)");
        return;
    };
    let total = store.study().deck().map_or(0, |d| d.cards.len());
    println!();
    println!("[{}/{}] {}", store.study().card_index() + 1, total, card.question);
    if store.study().show_answer() {
        println!("  -> {}", card.answer);
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
