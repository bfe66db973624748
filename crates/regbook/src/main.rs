//! `regbook` - CLI for the local registration ledger.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use regbook::cli::{
    AddCommand, Cli, Command, ConfigCommand, ExportCommand, ListCommand, MirrorCommand,
    ResetCommand, StatsCommand,
};
use regbook::{codec, init_logging, AppContext, Collection, Config, Mirror, Submission};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        // config inspection must not create the ledger database
        Command::Config(cmd) => handle_config(&config, cmd),
        command => {
            let mut ctx = AppContext::init(config)?;
            run_command(&mut ctx, command).await
        }
    }
}

async fn run_command(ctx: &mut AppContext, command: Command) -> CliResult {
    match command {
        Command::Add(cmd) => handle_add(ctx, &cmd),
        Command::List(cmd) => handle_list(ctx, &cmd),
        Command::Export(cmd) => handle_export(ctx, &cmd),
        Command::Stats(cmd) => handle_stats(ctx, &cmd),
        Command::Reset(cmd) => handle_reset(ctx, &cmd),
        Command::Mirror(cmd) => handle_mirror(ctx, &cmd).await,
        // dispatched before the context is built
        Command::Config(_) => Ok(()),
    }
}

fn handle_add(ctx: &mut AppContext, cmd: &AddCommand) -> CliResult {
    let raw = match &cmd.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let submission: Submission = serde_json::from_str(&raw)?;

    let collection: Collection = cmd.collection.into();
    let row = codec::encode(collection, &submission);

    let mut store = ctx.store.lock().map_err(|_| "record store lock poisoned")?;
    store.append(collection, row)?;
    println!(
        "Recorded {collection} registration #{}",
        store.data_rows(collection).len()
    );
    Ok(())
}

fn handle_list(ctx: &mut AppContext, cmd: &ListCommand) -> CliResult {
    let collection: Collection = cmd.collection.into();
    let store = ctx.store.lock().map_err(|_| "record store lock poisoned")?;
    let rows = store.data_rows(collection);
    let shown = if cmd.limit == 0 {
        rows
    } else {
        &rows[..rows.len().min(cmd.limit)]
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(shown)?);
    } else if rows.is_empty() {
        println!("No {collection} registrations recorded.");
    } else {
        println!("{}", codec::layout(collection).headers.join(" | "));
        for row in shown {
            println!("{}", row.join(" | "));
        }
        if rows.len() > shown.len() {
            println!("... and {} more", rows.len() - shown.len());
        }
    }
    Ok(())
}

fn handle_export(ctx: &mut AppContext, cmd: &ExportCommand) -> CliResult {
    let exporter = match &cmd.dir {
        Some(dir) => ctx.exporter.with_out_dir(dir.clone()),
        None => ctx.exporter.with_out_dir(ctx.config.export_dir()),
    };

    let mut store = ctx.store.lock().map_err(|_| "record store lock poisoned")?;
    let paths = match cmd.collection {
        Some(arg) => vec![exporter.export_collection(&mut store, arg.into())?],
        None => exporter.export_all(&mut store)?,
    };
    for path in &paths {
        println!("Wrote {}", path.display());
    }

    if cmd.cache {
        if exporter.cache_workbooks(&mut store)? {
            println!("Cached workbook bytes into the ledger database");
        } else {
            println!("Workbook rendering unavailable, nothing cached");
        }
    }
    Ok(())
}

fn handle_stats(ctx: &mut AppContext, cmd: &StatsCommand) -> CliResult {
    let store = ctx.store.lock().map_err(|_| "record store lock poisoned")?;
    let stats = store.stats();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("regbook statistics");
        println!("------------------");
        for entry in &stats.collections {
            let updated = entry
                .updated_at
                .map_or_else(|| "never".to_string(), |dt| dt.to_rfc3339());
            println!(
                "{:<16} {:>6}   last update: {updated}",
                entry.collection.to_string(),
                entry.data_rows
            );
        }
        println!("{:<16} {:>6}", "total", stats.total_rows);
    }
    Ok(())
}

fn handle_reset(ctx: &mut AppContext, cmd: &ResetCommand) -> CliResult {
    let collection: Collection = cmd.collection.into();
    if !cmd.yes {
        println!("This will discard all {collection} registrations. This cannot be undone.");
        println!("Use --yes to confirm.");
        return Ok(());
    }

    let mut store = ctx.store.lock().map_err(|_| "record store lock poisoned")?;
    store.reset(collection)?;
    println!("Reset {collection} to its header row.");
    Ok(())
}

async fn handle_mirror(ctx: &mut AppContext, cmd: &MirrorCommand) -> CliResult {
    if let Some(secs) = cmd.interval {
        if secs == 0 {
            return Err("mirror interval must be greater than 0".into());
        }
        ctx.mirror = Mirror::new(Arc::clone(&ctx.store), Duration::from_secs(secs));
    }

    let handle = ctx.mirror.enable();
    println!(
        "Mirror running every {:?}, press Ctrl-C to stop",
        ctx.mirror.interval()
    );

    tokio::signal::ctrl_c().await?;
    ctx.mirror.disable().await;
    println!("Mirror stopped after {} snapshot ticks", handle.ticks());
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:  {}", config.database_path().display());
                println!();
                println!("[Mirror]");
                println!("  Interval (s):   {}", config.mirror.interval_secs);
                println!();
                println!("[Export]");
                println!("  Output dir:     {}", config.export_dir().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
