//! Shatranj
//!
//! Sign in with a wallet and play a match from the terminal.

mod board;

use anyhow::{Context, Result};
use auth::{LocalWallet, WalletProvider};
use chess_game::{AppConfig, GameSession, Notification};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "shatranj", version, about = "Wallet-authenticated chess")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with the wallet in WALLET_PRIVATE_KEY and persist the session
    Login,
    /// Clear the persisted session
    Logout,
    /// Show the signed-in address, seat and session expiry
    Status,
    /// Play moves interactively
    Play {
        /// Start from this position instead of the standard one
        #[arg(long)]
        fen: Option<String>,
    },
}

const HELP: &str = "\
  <uci>        play a move, e.g. e2e4 or e7e8q
  undo         take back the last move
  moves        list legal moves
  history      show the move list
  board        draw the board
  fen          print the current position
  load <FEN>   replace the position
  login        sign in with the local wallet
  logout       sign out
  quit         leave";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let mut session = config.build_session()?;
    let wallet = local_wallet()?;

    match cli.command {
        Command::Login => login(&mut session, wallet.as_ref()).await,
        Command::Logout => logout(&mut session),
        Command::Status => {
            status(&mut session);
            Ok(())
        }
        Command::Play { fen } => play(&mut session, wallet.as_ref(), fen).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shatranj=info,auth=info,chess_game=info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");

    // Logs go to stderr so the REPL owns stdout.
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// The development wallet, if one is configured.
fn local_wallet() -> Result<Option<LocalWallet>> {
    match std::env::var("WALLET_PRIVATE_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            let wallet = LocalWallet::from_private_key(&key)
                .context("WALLET_PRIVATE_KEY is not a valid private key")?;
            debug!(address = %wallet.address_string(), "Loaded local wallet");
            Ok(Some(wallet))
        }
        _ => Ok(None),
    }
}

async fn login(session: &mut GameSession, wallet: Option<&LocalWallet>) -> Result<()> {
    let wallet = wallet.map(|w| w as &dyn WalletProvider);
    match session.login(wallet).await {
        Ok(_) => {
            let username = session.current_player().map(|p| p.username.as_str());
            println!("{}", Notification::connected(username));
            status(session);
        }
        Err(e) => match Notification::from_auth_error(&e) {
            Some(notification) => println!("{}", notification),
            None => debug!(error = %e, "Sign-in superseded"),
        },
    }
    Ok(())
}

fn logout(session: &mut GameSession) -> Result<()> {
    session.logout().context("Failed to clear session")?;
    println!("{}", Notification::signed_out());
    Ok(())
}

fn status(session: &mut GameSession) {
    let state = session.state_at(chrono::Utc::now()).clone();
    println!("Session: {}", state);
    if let Some(player) = session.current_player() {
        println!("Player:  {}", player.username);
    }
    if let Some(expires_at) = session.expires_at() {
        println!("Expires: {}", expires_at.to_rfc3339());
    }
    let roster = session.roster();
    println!(
        "White:   {} ({})",
        roster.white().username,
        auth::format_address(&roster.white().address)
    );
    println!(
        "Black:   {} ({})",
        roster.black().username,
        auth::format_address(&roster.black().address)
    );
}

async fn play(session: &mut GameSession, wallet: Option<&LocalWallet>, fen: Option<String>) -> Result<()> {
    if let Some(fen) = fen {
        if let Err(e) = session.load_position(&fen) {
            println!("{}", Notification::from_rejected_load(&e));
        }
    }

    info!(state = %session.state(), "Starting game");
    status(session);
    println!("{}", board::render(session.position().fen(), session.orientation()));
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        // Orientation and player lookups below read the checked state.
        session.state_at(chrono::Utc::now());
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "fen" => println!("{}", session.position().fen()),
            "board" => println!("{}", board::render(session.position().fen(), session.orientation())),
            "history" => println!("{}", session.move_list()),
            "moves" => println!("{}", session.legal_moves().join(" ")),
            "login" => login(session, wallet).await?,
            "logout" => logout(session)?,
            "undo" => match session.undo() {
                Ok(Some(position)) => println!("{}", position.fen()),
                Ok(None) => println!("Nothing to undo"),
                Err(e) => println!("{}", Notification::from_rejected_move(&e)),
            },
            "load" => match session.load_position(rest) {
                Ok(position) => println!("{}", board::render(position.fen(), session.orientation())),
                Err(e) => println!("{}", Notification::from_rejected_load(&e)),
            },
            mv => match session.submit_move(mv) {
                Ok(position) => {
                    if let Some(last) = session.history().last() {
                        println!("{} {}", last.color, last.san);
                    }
                    println!("{}", board::render(position.fen(), session.orientation()));
                    if position.status().is_over() {
                        println!("Game over: {}", position.status());
                    }
                }
                Err(e) => println!("{}", Notification::from_rejected_move(&e)),
            },
        }
    }
    Ok(())
}
