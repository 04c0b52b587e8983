// crates/shellbridge-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Unit Tests
// Description: Tests for token bootstrapping and argument parsing.
// Purpose: Verify CLI helpers without starting a server.
// Dependencies: clap, tempfile
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test assertions use expect/unwrap for clarity."
)]

use clap::Parser;

use super::Cli;
use super::Commands;
use super::generate_token;
use super::write_token_file;

#[test]
fn generated_tokens_are_hex_and_distinct() {
    let first = generate_token();
    let second = generate_token();
    assert_eq!(first.len(), 64);
    assert!(first.chars().all(|ch| ch.is_ascii_hexdigit()));
    assert_ne!(first, second);
}

#[test]
fn token_file_round_trips_one_token_per_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("token");
    write_token_file(&path, "abc123").expect("write token");
    let content = std::fs::read_to_string(&path).expect("read token");
    assert_eq!(content, "abc123\n");
}

#[cfg(unix)]
#[test]
fn token_file_is_owner_readable_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("token");
    write_token_file(&path, "abc123").expect("write token");
    let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn serve_accepts_bind_override() {
    let cli = Cli::parse_from(["shellbridge", "serve", "--bind", "127.0.0.1:9000"]);
    match cli.command {
        Commands::Serve(command) => {
            assert_eq!(command.bind.as_deref(), Some("127.0.0.1:9000"));
            assert!(command.config.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn token_accepts_explicit_path() {
    let cli = Cli::parse_from(["shellbridge", "token", "--path", "/tmp/tok"]);
    match cli.command {
        Commands::Token(command) => {
            assert_eq!(command.path.as_deref(), Some(std::path::Path::new("/tmp/tok")));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}
