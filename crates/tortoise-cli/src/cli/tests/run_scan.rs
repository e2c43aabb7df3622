//! Tests for scan and run.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_scan() {
    match parse(&["tortoise", "scan", "channels.txt"]) {
        CliCommand::Scan { sources } => assert_eq!(sources, PathBuf::from("channels.txt")),
        _ => panic!("expected Scan"),
    }
}

#[test]
fn cli_parse_scan_requires_file() {
    assert!(Cli::try_parse_from(["tortoise", "scan"]).is_err());
}

#[test]
fn cli_parse_run_defaults() {
    match parse(&["tortoise", "run"]) {
        CliCommand::Run { workers, no_wait } => {
            assert!(workers.is_none());
            assert!(!no_wait);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_with_options() {
    match parse(&["tortoise", "run", "--workers", "2", "--no-wait"]) {
        CliCommand::Run { workers, no_wait } => {
            assert_eq!(workers, Some(2));
            assert!(no_wait);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_global_config() {
    let cli = Cli::try_parse_from(["tortoise", "run", "--config", "/tmp/t.toml"]).unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
    let cli = Cli::try_parse_from(["tortoise", "--config", "/tmp/t.toml", "populate"]).unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
    assert!(matches!(cli.command, CliCommand::Populate));
}
