//! Terminal driver for the OneMust stores.
//!
//! # Responsibility
//! - Verify `onemust_core` linkage (`ping`).
//! - Drive the local and shared stores the same way the app and widget do,
//!   using the `ONEMUST_*` environment configuration.

use clap::{Parser, Subcommand};
use onemust_core::db::open_db;
use onemust_core::{
    complete_from_widget, core_version, init_logging_for, now_epoch_ms, parse_deep_link, ping,
    Card, CardId, CardService, CompletionOutcome, DeepLink, LogRole, NoopReloader,
    SqliteKeyValueStore, StoreConfig, TimelineEntryKind, WidgetTimeline,
};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "onemust", version, about = "OneMust card store driver")]
struct Cli {
    /// Absolute directory for rolling log files; logging stays off when unset.
    #[arg(long, global = true)]
    log_dir: Option<String>,
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print core linkage info.
    Ping,
    /// Capture a new card.
    Capture {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show priorities and the drawer.
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Complete {
        id: String,
    },
    Delete {
        id: String,
    },
    Pin {
        id: String,
    },
    Unpin {
        id: String,
    },
    Exclude {
        id: String,
    },
    Include {
        id: String,
    },
    /// Complete a card the way the widget does, touching only the shared store.
    WidgetComplete {
        id: String,
    },
    /// Print the widget timeline, consuming any completion marker.
    WidgetTimeline,
    /// Fold widget completions into local state.
    Reconcile,
    /// Parse an `onemust://` deep link.
    Open {
        url: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let role = match cli.command {
            Commands::WidgetComplete { .. } | Commands::WidgetTimeline => LogRole::Widget,
            _ => LogRole::App,
        };
        if let Err(err) = init_logging_for(role, &cli.log_level, log_dir) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(cli.command, &StoreConfig::from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &StoreConfig) -> Result<(), String> {
    match command {
        Commands::Ping => {
            println!("onemust_core ping={}", ping());
            println!("onemust_core version={}", core_version());
            Ok(())
        }
        Commands::WidgetComplete { id } => {
            let outcome = widget_complete(config, parse_id(&id)?);
            println!("{}", outcome.as_str());
            Ok(())
        }
        Commands::WidgetTimeline => {
            print_timeline(&widget_timeline(config));
            Ok(())
        }
        Commands::Open { url } => {
            match parse_deep_link(&url).map_err(|err| err.to_string())? {
                DeepLink::Capture => println!("route=capture"),
                DeepLink::OpenCard(id) => println!("route=card id={id}"),
            }
            Ok(())
        }
        command => app_command(command, config),
    }
}

fn app_command(command: Commands, config: &StoreConfig) -> Result<(), String> {
    let local_conn =
        open_db(&config.local_db_path).map_err(|err| format!("local DB open failed: {err}"))?;
    let shared_conn = config.shared_db_path.as_ref().and_then(|path| {
        open_db(path)
            .map_err(|err| eprintln!("warning: shared store unavailable: {err}"))
            .ok()
    });
    let local = SqliteKeyValueStore::try_new(&local_conn).map_err(|err| err.to_string())?;
    let shared = shared_conn
        .as_ref()
        .and_then(|conn| SqliteKeyValueStore::try_new(conn).ok());
    let service = CardService::new(local, shared);

    let changed = match command {
        Commands::Capture { text } => {
            let card = service
                .capture(&text.join(" "), now_epoch_ms())
                .map_err(|err| err.to_string())?;
            print_card("captured", &card);
            return Ok(());
        }
        Commands::List { search } => {
            let view = service.view(search.as_deref());
            for (rank, card) in view.priorities.iter().enumerate() {
                print_card(&format!("#{}", rank + 1), card);
            }
            for card in &view.drawer {
                print_card("drawer", card);
            }
            return Ok(());
        }
        Commands::Reconcile => {
            let absorbed = service.reconcile().map_err(|err| err.to_string())?;
            println!("absorbed={absorbed}");
            return Ok(());
        }
        Commands::Complete { id } => service
            .complete(parse_id(&id)?, now_epoch_ms())
            .map(|entry| entry.is_some()),
        Commands::Delete { id } => service.delete(parse_id(&id)?),
        Commands::Pin { id } => service.pin(parse_id(&id)?),
        Commands::Unpin { id } => service.unpin(parse_id(&id)?),
        Commands::Exclude { id } => service.exclude(parse_id(&id)?),
        Commands::Include { id } => service.include(parse_id(&id)?),
        Commands::Ping
        | Commands::WidgetComplete { .. }
        | Commands::WidgetTimeline
        | Commands::Open { .. } => return Ok(()),
    }
    .map_err(|err| err.to_string())?;

    println!("{}", if changed { "ok" } else { "not_found" });
    Ok(())
}

/// Runs `f` against the shared store, or with `None` when it is disabled or
/// cannot be opened. Widget commands degrade instead of failing.
fn with_shared_store<T>(
    config: &StoreConfig,
    f: impl FnOnce(Option<&SqliteKeyValueStore<'_>>) -> T,
) -> T {
    let shared_conn = config.shared_db_path.as_ref().and_then(|path| {
        open_db(path)
            .map_err(|err| eprintln!("warning: shared store unavailable: {err}"))
            .ok()
    });
    let shared = shared_conn.as_ref().and_then(|conn| {
        SqliteKeyValueStore::try_new(conn)
            .map_err(|err| eprintln!("warning: shared store unavailable: {err}"))
            .ok()
    });
    f(shared.as_ref())
}

fn widget_complete(config: &StoreConfig, id: CardId) -> CompletionOutcome {
    with_shared_store(config, |shared| {
        complete_from_widget(shared, id, now_epoch_ms(), &NoopReloader)
    })
}

fn widget_timeline(config: &StoreConfig) -> WidgetTimeline {
    with_shared_store(config, |shared| {
        onemust_core::widget_timeline(shared, now_epoch_ms())
    })
}

fn print_timeline(timeline: &WidgetTimeline) {
    for entry in &timeline.entries {
        let kind = match entry.kind {
            TimelineEntryKind::Completing => "completing",
            TimelineEntryKind::Steady => "steady",
        };
        println!("entry at={} kind={}", entry.at_ms, kind);
        for row in &entry.cards {
            let mark = if row.struck { "x" } else { " " };
            println!(
                "  [{mark}] {} {}{}",
                row.rank,
                row.emoji.as_deref().map(|emoji| format!("{emoji} ")).unwrap_or_default(),
                row.text
            );
        }
    }
    println!("refresh_after={}", timeline.refresh_after_ms);
}

fn parse_id(raw: &str) -> Result<CardId, String> {
    CardId::parse_str(raw.trim()).map_err(|err| format!("invalid card id `{raw}`: {err}"))
}

fn print_card(label: &str, card: &Card) {
    let emoji = card.emoji.as_deref().unwrap_or("-");
    println!("{label} {} {emoji} {}", card.id, card.simplified_text);
}
