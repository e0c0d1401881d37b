use chrono::{TimeZone, Utc};
use clap::Parser;
use digestd_core::{Digest, Frequency};
use std::collections::BTreeMap;

use super::*;

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["digestd-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Migrate));
}

#[test]
fn parses_due_and_cycle_commands() {
    let due = Cli::try_parse_from(["digestd-cli", "due"]).unwrap();
    assert!(matches!(due.command, Commands::Due));

    let cycle = Cli::try_parse_from(["digestd-cli", "cycle"]).unwrap();
    assert!(matches!(cycle.command, Commands::Cycle));
}

#[test]
fn parses_run_with_email_override() {
    let id = Uuid::new_v4();
    let cli = Cli::try_parse_from([
        "digestd-cli",
        "run",
        &id.to_string(),
        "--email",
        "qa@example.com",
    ])
    .unwrap();

    match cli.command {
        Commands::Run { digest_id, email } => {
            assert_eq!(digest_id, id);
            assert_eq!(email.as_deref(), Some("qa@example.com"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn run_rejects_malformed_digest_id() {
    assert!(Cli::try_parse_from(["digestd-cli", "run", "not-a-uuid"]).is_err());
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["digestd-cli"]).is_err());
}

#[test]
fn format_due_lists_groups_in_order() {
    let digest = |name: &str, frequency| Digest {
        id: Uuid::nil(),
        user_id: Uuid::nil(),
        name: name.to_string(),
        description: None,
        frequency,
        active: true,
        last_run_at: None,
    };
    let mut weekly = digest("Weekly Roundup", Frequency::Weekly);
    weekly.last_run_at = Some(Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap());

    let mut groups = BTreeMap::new();
    groups.insert(Frequency::Weekly, vec![weekly]);
    groups.insert(Frequency::Hourly, vec![digest("AI News", Frequency::Hourly)]);

    let out = commands::format_due(&groups);
    let hourly_at = out.find("hourly (1)").expect("hourly header");
    let weekly_at = out.find("weekly (1)").expect("weekly header");
    assert!(hourly_at < weekly_at);
    assert!(out.contains("last run: never"));
    assert!(out.contains("last run: 2025-03-01 09:30 UTC"));
}

#[test]
fn format_due_reports_nothing_due() {
    assert_eq!(commands::format_due(&BTreeMap::new()), "no digests are due\n");
}
