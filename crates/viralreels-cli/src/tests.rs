use super::*;
use uuid::Uuid;
use viralreels_core::{FeedFilter, FeedSort};

#[test]
fn parses_db_ping_command() {
    let cli =
        Cli::try_parse_from(["viralreels-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["viralreels-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["viralreels-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn jobs_ensure_defaults_requester_to_cli() {
    let cli = Cli::try_parse_from(["viralreels-cli", "jobs", "ensure"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Jobs {
            command: JobsCommands::Ensure {
                batch_size: None,
                ref requested_by,
            }
        }) if requested_by == "cli"
    ));
}

#[test]
fn jobs_ensure_accepts_batch_size() {
    let cli = Cli::try_parse_from([
        "viralreels-cli",
        "jobs",
        "ensure",
        "--batch-size",
        "12",
        "--requested-by",
        "ops",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Jobs {
            command: JobsCommands::Ensure {
                batch_size: Some(12),
                ref requested_by,
            }
        }) if requested_by == "ops"
    ));
}

#[test]
fn jobs_process_requires_a_uuid() {
    let id = Uuid::new_v4();
    let cli = Cli::try_parse_from(["viralreels-cli", "jobs", "process", &id.to_string()]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Jobs {
            command: JobsCommands::Process { job_id }
        }) if job_id == id
    ));

    assert!(Cli::try_parse_from(["viralreels-cli", "jobs", "process", "not-a-uuid"]).is_err());
}

#[test]
fn jobs_status_id_conflicts_with_requester() {
    let id = Uuid::new_v4().to_string();
    let result = Cli::try_parse_from([
        "viralreels-cli",
        "jobs",
        "status",
        "--id",
        &id,
        "--requested-by",
        "ops",
    ]);
    assert!(result.is_err());
}

#[test]
fn jobs_run_max_loops_is_optional() {
    let cli = Cli::try_parse_from(["viralreels-cli", "jobs", "run"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Jobs {
            command: JobsCommands::Run { max_loops: None }
        })
    ));
}

#[test]
fn reels_top_defaults_to_virality_over_all() {
    let cli = Cli::try_parse_from(["viralreels-cli", "reels", "top"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Reels {
            command: ReelsCommands::Top {
                filter: FeedFilter::All,
                sort: FeedSort::Virality,
                search: None,
                limit: 10,
            }
        })
    ));
}

#[test]
fn reels_top_parses_filter_and_sort() {
    let cli = Cli::try_parse_from([
        "viralreels-cli",
        "reels",
        "top",
        "--filter",
        "risingStars",
        "--sort",
        "shares",
        "--limit",
        "5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Reels {
            command: ReelsCommands::Top {
                filter: FeedFilter::RisingStars,
                sort: FeedSort::Shares,
                limit: 5,
                ..
            }
        })
    ));
}

#[test]
fn reels_top_rejects_unknown_sort() {
    let result = Cli::try_parse_from(["viralreels-cli", "reels", "top", "--sort", "likes"]);
    assert!(result.is_err());
}
