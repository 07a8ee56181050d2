use crate::args::Args;
use clap::Parser;
use rstest::rstest;
use writer_config::{LogLevel, RunMode};

#[test]
fn test_no_flags_leaves_everything_unset() {
    let args = Args::try_parse_from(["e2b-writer"]).unwrap();

    assert!(args.config.is_none());
    assert!(args.mode.is_none());
    assert!(args.log_level.is_none());
    assert!(!args.no_echo);
}

#[rstest]
#[case("selftest", RunMode::SelfTest)]
#[case("self-test", RunMode::SelfTest)]
#[case("transfer", RunMode::Transfer)]
#[case("TRANSFER", RunMode::Transfer)]
fn test_mode_flag(#[case] value: &str, #[case] expected: RunMode) {
    let args = Args::try_parse_from(["e2b-writer", "--mode", value]).unwrap();
    assert_eq!(args.mode, Some(expected));
}

#[test]
fn test_unknown_mode_is_rejected() {
    assert!(Args::try_parse_from(["e2b-writer", "--mode", "upload"]).is_err());
}

#[test]
fn test_all_flags() {
    let args = Args::try_parse_from([
        "e2b-writer",
        "--config",
        "pipeline.toml",
        "--log-level",
        "debug",
        "--no-echo",
    ])
    .unwrap();

    assert_eq!(args.config.as_deref(), Some(std::path::Path::new("pipeline.toml")));
    assert_eq!(args.log_level, Some(LogLevel::Debug));
    assert!(args.no_echo);
}
