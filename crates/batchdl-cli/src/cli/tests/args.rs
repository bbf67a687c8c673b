//! Argument parsing for every subcommand.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_serve() {
    assert!(matches!(parse(&["batchdl", "serve"]), CliCommand::Serve));
}

#[test]
fn cli_parse_add_defaults() {
    match parse(&["batchdl", "add", "https://example.com/a.iso", "https://example.com/b.iso"]) {
        CliCommand::Add {
            urls,
            dest,
            concurrency,
            throttle,
        } => {
            assert_eq!(urls.len(), 2);
            assert_eq!(urls[0], "https://example.com/a.iso");
            assert_eq!(dest, "");
            assert!(concurrency.is_none());
            assert!(throttle.is_none());
        }
        _ => panic!("expected Add"),
    }
}

#[test]
fn cli_parse_add_with_options() {
    match parse(&[
        "batchdl",
        "add",
        "https://example.com/a.iso",
        "--dest",
        "isos",
        "--concurrency",
        "5",
        "--throttle",
        "1048576",
    ]) {
        CliCommand::Add {
            urls,
            dest,
            concurrency,
            throttle,
        } => {
            assert_eq!(urls, vec!["https://example.com/a.iso".to_string()]);
            assert_eq!(dest, "isos");
            assert_eq!(concurrency, Some(5));
            assert_eq!(throttle, Some(1_048_576));
        }
        _ => panic!("expected Add"),
    }
}

#[test]
fn cli_parse_add_requires_url() {
    assert!(Cli::try_parse_from(["batchdl", "add"]).is_err());
}

#[test]
fn cli_parse_id_commands() {
    match parse(&["batchdl", "cancel", "3"]) {
        CliCommand::Cancel { id } => assert_eq!(id, 3),
        _ => panic!("expected Cancel"),
    }
    match parse(&["batchdl", "resume", "4"]) {
        CliCommand::Resume { id } => assert_eq!(id, 4),
        _ => panic!("expected Resume"),
    }
    match parse(&["batchdl", "remove", "5"]) {
        CliCommand::Remove { id } => assert_eq!(id, 5),
        _ => panic!("expected Remove"),
    }
}

#[test]
fn cli_parse_rejects_negative_id() {
    assert!(Cli::try_parse_from(["batchdl", "cancel", "-1"]).is_err());
    assert!(Cli::try_parse_from(["batchdl", "resume", "abc"]).is_err());
}

#[test]
fn cli_parse_clear_and_watch() {
    assert!(matches!(parse(&["batchdl", "clear"]), CliCommand::Clear));
    assert!(matches!(parse(&["batchdl", "watch"]), CliCommand::Watch));
}

#[test]
fn cli_parse_global_socket() {
    let cli = Cli::try_parse_from(["batchdl", "watch", "--socket", "/tmp/agent.sock"]).unwrap();
    assert_eq!(cli.socket, Some(PathBuf::from("/tmp/agent.sock")));
    let cli = Cli::try_parse_from(["batchdl", "clear"]).unwrap();
    assert!(cli.socket.is_none());
}

#[test]
fn cli_parse_queries() {
    assert!(matches!(parse(&["batchdl", "status"]), CliCommand::Status));
    assert!(matches!(parse(&["batchdl", "root"]), CliCommand::Root));
    assert!(matches!(parse(&["batchdl", "shutdown"]), CliCommand::Shutdown));
    match parse(&["batchdl", "exists", "isos/debian"]) {
        CliCommand::Exists { dir } => assert_eq!(dir, "isos/debian"),
        _ => panic!("expected Exists"),
    }
    assert!(Cli::try_parse_from(["batchdl", "exists"]).is_err());
}
