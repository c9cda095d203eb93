//! Latency benchmarks for the sign-in and move paths.
//!
//! Run with: `cargo bench --bench latency`

use std::sync::Arc;

use auth::{LocalWallet, SignatureVerifier, TokenAuthority, TokenConfig};
use chess_game::{LegalityChecker, PositionState, ShakmatyRules, START_FEN};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const MESSAGE: &[u8] = b"localhost wants you to sign in with your Ethereum account";

fn bench_signature_verification(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let wallet = LocalWallet::random();
    let signature = runtime.block_on(wallet.sign(MESSAGE)).unwrap();
    let verifier = SignatureVerifier::new();
    let address = wallet.address();

    let mut group = c.benchmark_group("signature");
    group.bench_function("verify_valid", |b| {
        b.iter(|| verifier.verify(black_box(MESSAGE), black_box(&signature), &address))
    });

    let mut tampered = signature.clone();
    tampered[10] ^= 0x01;
    group.bench_function("verify_tampered", |b| {
        b.iter(|| verifier.verify(black_box(MESSAGE), black_box(&tampered), &address))
    });
    group.finish();
}

fn bench_token_validation(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let authority = Arc::new(TokenAuthority::new(TokenConfig {
        secret: "bench-secret".to_string(),
        ..Default::default()
    }));
    let mut issuer = auth::SessionTokenIssuer::new(authority.clone(), Default::default());
    let wallet = LocalWallet::random();
    let token = runtime
        .block_on(issuer.issue(Some(&wallet), authority.validity()))
        .unwrap();

    c.bench_function("token_validate", |b| {
        b.iter(|| authority.validate(black_box(token.as_str())).unwrap())
    });
}

fn bench_move_application(c: &mut Criterion) {
    let rules = ShakmatyRules::new();

    let mut group = c.benchmark_group("moves");
    group.bench_function("apply_legal", |b| {
        b.iter(|| rules.apply(black_box(START_FEN), black_box("e2e4")).unwrap())
    });
    group.bench_function("classify_illegal", |b| {
        b.iter(|| rules.apply(black_box(START_FEN), black_box("e2e5")).unwrap_err())
    });
    group.bench_function("undo_after_20_plies", |b| {
        let opening = [
            "e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4", "g8f6", "e1g1", "f8e7",
            "f1e1", "b7b5", "a4b3", "d7d6", "c2c3", "e8g8", "h2h3", "c6b8", "d2d4", "b8d7",
        ];
        b.iter(|| {
            let mut state = PositionState::new();
            for mv in opening {
                state.apply_move(mv).unwrap();
            }
            state.undo()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_signature_verification,
    bench_token_validation,
    bench_move_application
);
criterion_main!(benches);
