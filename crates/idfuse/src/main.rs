use clap::{Parser, Subcommand};
use idfuse::{load_events, load_roster, EngineHandle, ListFilter, QueryService, ResolverConfig};
use idfuse_core::{Category, Source};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "idfuse")]
#[command(about = "Resolve identities across roster and event exports")]
#[command(version)]
struct Args {
    /// Roster export (JSON array of rows)
    #[arg(long)]
    roster: PathBuf,

    /// Event export tagged with its source, e.g. `wifi=./wifi.json` (repeatable)
    #[arg(long = "events", value_name = "SOURCE=PATH")]
    events: Vec<String>,

    /// Resolver configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exact lookup by identifier type and value
    Lookup {
        /// Identifier type, e.g. `contact-id` or the roster column `email`
        kind: String,
        value: String,
    },
    /// Approximate name search
    Fuzzy {
        name: String,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Identities linked to one identity
    Linked { identity_id: String },
    /// Fusion report for one identity
    Report { identity_id: String },
    /// List identities, optionally filtered
    List {
        #[arg(long)]
        department: Option<String>,
        /// student, staff, faculty, or unknown
        #[arg(long)]
        category: Option<Category>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    idfuse::tracing::init_with_filter(&args.log_level);

    let config = match &args.config {
        Some(path) => ResolverConfig::from_file(path)?,
        None => ResolverConfig::default(),
    };

    let roster = load_roster(&args.roster)?;
    let mut events = Vec::with_capacity(args.events.len());
    for entry in &args.events {
        let (label, path) = entry
            .split_once('=')
            .ok_or_else(|| idfuse::Error::Config(format!("expected SOURCE=PATH, got '{entry}'")))?;
        let source = Source::from_label(label);
        info!(%source, path, "Loading events");
        events.push(load_events(source, path)?);
    }

    let handle = Arc::new(EngineHandle::default());
    handle.rebuild(&roster, &events, &config, chrono::Utc::now().timestamp_millis());
    let service = QueryService::new(handle, config);

    match args.command {
        Command::Lookup { kind, value } => print_json(&service.search(&kind, &value)?),
        Command::Fuzzy { name, threshold } => print_json(&service.fuzzy_search(&name, threshold)?),
        Command::Linked { identity_id } => print_json(&service.linked(&identity_id)?),
        Command::Report { identity_id } => print_json(&service.report(&identity_id)?),
        Command::List {
            department,
            category,
            skip,
            limit,
        } => {
            let filter = ListFilter {
                organizational_unit: department,
                category,
                skip,
                limit,
            };
            print_json(&service.list(&filter))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
