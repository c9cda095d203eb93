//! Integration tests for component interactions.
//!
//! These tests drive sign-in, persistence and play together, the way a page
//! load followed by user actions would.

use std::path::PathBuf;
use std::sync::Arc;

use auth::{
    format_address, ChallengeConfig, LocalWallet, SessionStore, SessionStoreProvider,
    SessionTokenIssuer, SignatureVerifier, TokenAuthority, TokenConfig,
};
use chess_game::{
    AuthState, Color, GameSession, Player, PositionState, RejectedMove, Roster, Seat,
    TurnResolver, START_FEN,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

fn authority() -> Arc<TokenAuthority> {
    Arc::new(TokenAuthority::new(TokenConfig {
        secret: "integration-secret".to_string(),
        ..Default::default()
    }))
}

fn store_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("shatranj-it-{}", Uuid::new_v4()))
        .join("session.json")
}

/// Open a session against the file at `path`, as a fresh page load would.
fn open_session(path: &PathBuf, roster: &Roster) -> GameSession {
    let authority = authority();
    let store = SessionStore::open(
        SessionStoreProvider::File { path: path.clone() },
        authority.clone(),
    )
    .unwrap();
    let mut session = GameSession::new(
        roster.clone(),
        PositionState::new(),
        store,
        SessionTokenIssuer::new(authority, ChallengeConfig::default()),
        Duration::hours(24),
    );
    session.restore();
    session
}

fn roster_for(white: &LocalWallet, black: &LocalWallet) -> Roster {
    Roster::new(
        Player::new("altstream", white.address()),
        Player::new("rehesamay", black.address()),
    )
    .unwrap()
}

#[test]
fn test_signature_round_trip_and_mutation() {
    let wallet = LocalWallet::random();
    let message = b"Sign in to Shatranj";
    let signature = tokio_test::block_on(wallet.sign(message)).unwrap();
    let verifier = SignatureVerifier::new();

    assert!(verifier.verify(message, &signature, &wallet.address()));

    let mut tampered = signature.clone();
    tampered[0] ^= 0x80;
    assert!(!verifier.verify(message, &tampered, &wallet.address()));
    assert!(!verifier.verify(message, &signature, &LocalWallet::random().address()));
}

#[tokio::test]
async fn test_login_survives_reload() {
    let white = LocalWallet::random();
    let black = LocalWallet::random();
    let roster = roster_for(&white, &black);
    let path = store_path();

    let mut first = open_session(&path, &roster);
    assert_eq!(first.state(), &AuthState::Unauthenticated);
    first.login(Some(&white)).await.unwrap();

    let second = open_session(&path, &roster);
    assert_eq!(
        second.state(),
        &AuthState::Player {
            address: white.address(),
            color: Color::White
        }
    );
    assert_eq!(second.store().stored_address(), Some(white.address()));
    assert!(second.expires_at().unwrap() > Utc::now() + Duration::hours(23));

    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[tokio::test]
async fn test_black_session_in_different_case() {
    let white = LocalWallet::random();
    let black = LocalWallet::random();

    let black_upper = format!("0x{}", format_address(&black.address())[2..].to_ascii_uppercase());
    let roster = Roster::new(
        Player::new("altstream", white.address()),
        Player::parse("rehesamay", &black_upper).unwrap(),
    )
    .unwrap();
    assert_eq!(
        TurnResolver::resolve_str(&black.address_string(), &roster),
        Seat::Player(Color::Black)
    );

    let path = store_path();
    let mut session = open_session(&path, &roster);
    session.login(Some(&black)).await.unwrap();

    // White to move in the start position.
    let result = session.submit_move("e2e4");
    assert!(matches!(result, Err(RejectedMove::NotYourTurn { .. })));
    assert_eq!(session.position().fen(), START_FEN);
    assert!(session.history().is_empty());

    session.load_position(AFTER_E4).unwrap();
    let position = session.submit_move("d7d5").unwrap();
    assert_eq!(position.side_to_move(), Color::White);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].san, "d5");
    assert_eq!(session.move_list(), "1... d5");

    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[tokio::test]
async fn test_no_wallet_is_unavailable() {
    let roster = roster_for(&LocalWallet::random(), &LocalWallet::random());
    let path = store_path();
    let mut session = open_session(&path, &roster);

    let result = session.login(None).await;
    assert!(matches!(result, Err(auth::AuthError::WalletUnavailable)));
    assert_eq!(session.state(), &AuthState::Unauthenticated);
    assert!(session.store().is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_expired_token_is_dropped_on_load() {
    let white = LocalWallet::random();
    let roster = roster_for(&white, &LocalWallet::random());
    let path = store_path();

    let mut session = open_session(&path, &roster);
    session.login(Some(&white)).await.unwrap();

    let mut reloaded = open_session(&path, &roster);
    let later = Utc::now() + Duration::hours(25);
    assert_eq!(reloaded.restore_at(later), &AuthState::Unauthenticated);
    assert!(reloaded.store().is_empty());
    assert_eq!(
        TurnResolver::resolve(reloaded.store().stored_address_at(later).as_ref(), &roster),
        Seat::Observer
    );

    // The clear reached the file too.
    let fresh = open_session(&path, &roster);
    assert!(fresh.store().is_empty());

    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[tokio::test]
async fn test_full_game_to_checkmate() {
    let white = LocalWallet::random();
    let black = LocalWallet::random();
    let roster = roster_for(&white, &black);
    let path = store_path();

    let mut white_view = open_session(&path, &roster);
    white_view.login(Some(&white)).await.unwrap();
    white_view.submit_move("f2f3").unwrap();

    // Each seat plays from its own view; carry the position across.
    let black_path = store_path();
    let mut black_view = open_session(&black_path, &roster);
    black_view.login(Some(&black)).await.unwrap();
    black_view.load_position(white_view.position().fen()).unwrap();
    black_view.submit_move("e7e5").unwrap();

    white_view.load_position(black_view.position().fen()).unwrap();
    white_view.submit_move("g2g4").unwrap();

    black_view.load_position(white_view.position().fen()).unwrap();
    let position = black_view.submit_move("d8h4").unwrap();
    assert!(position.status().is_over());
    assert_eq!(black_view.history()[0].san, "Qh4#");

    white_view.load_position(position.fen()).unwrap();
    assert!(matches!(
        white_view.submit_move("e2e3"),
        Err(RejectedMove::Illegal(_))
    ));

    std::fs::remove_dir_all(path.parent().unwrap()).ok();
    std::fs::remove_dir_all(black_path.parent().unwrap()).ok();
}
