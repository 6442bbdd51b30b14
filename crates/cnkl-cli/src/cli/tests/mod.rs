//! CLI parse tests.

use super::{Cli, CliCommand, VerifyArgs};
use clap::Parser;

pub(super) fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

pub(super) fn parse_verify(args: &[&str]) -> VerifyArgs {
    match parse(args) {
        CliCommand::Verify(v) => v,
        other => panic!("expected Verify, got {other:?}"),
    }
}
