use anyhow::{Context, Result, bail};
use rangemark_config::{AddressEncoding, Config};
use rangemark_engine::{
    AddressKind, HighlightRange, HighlightSession, MarkerStyle, OverlapPolicy, RangeEvents,
    RangeId, RangeStore, Renderer, SessionError, io,
};
use std::{env, path::PathBuf, process};

const USAGE: &str = "Usage: rangemark-cli [--merge|--reject] <command> <document.html> [args]

Commands:
  render              print the document with highlights
  list                list saved highlights
  add <start> <end>   highlight characters [start, end)
  erase <start> <end> remove highlighting from [start, end)
  merge               coalesce touching highlights
  delete <id>         delete a highlight
  clear               delete all highlights";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Render,
    List,
    Add { start: usize, end: usize },
    Erase { start: usize, end: usize },
    Merge,
    Delete(RangeId),
    Clear,
}

#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    command: Command,
    document: PathBuf,
    policy: Option<OverlapPolicy>,
}

/// Logs range events; the records file is written once the command is done.
struct LogEvents;

impl RangeEvents for LogEvents {
    fn range_created(&mut self, range: &HighlightRange) {
        log::info!("Created highlight {} ({:?})", range.id, range.text);
    }

    fn range_deleted(&mut self, id: RangeId) {
        log::info!("Deleted highlight {id}");
    }

    fn error(&mut self, error: &SessionError) {
        log::warn!("{error}");
    }
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut policy = None;
    let mut positional = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--merge" => policy = Some(OverlapPolicy::Merge),
            "--reject" => policy = Some(OverlapPolicy::Reject),
            flag if flag.starts_with("--") => bail!("Unknown option '{flag}'"),
            _ => positional.push(arg.as_str()),
        }
    }

    let [name, document, rest @ ..] = positional.as_slice() else {
        bail!("Missing command or document");
    };

    let command = match (*name, rest) {
        ("render", []) => Command::Render,
        ("list", []) => Command::List,
        ("merge", []) => Command::Merge,
        ("clear", []) => Command::Clear,
        ("add", [start, end]) => Command::Add {
            start: parse_offset(start)?,
            end: parse_offset(end)?,
        },
        ("erase", [start, end]) => Command::Erase {
            start: parse_offset(start)?,
            end: parse_offset(end)?,
        },
        ("delete", [id]) => Command::Delete(
            id.parse()
                .with_context(|| format!("Invalid highlight id '{id}'"))?,
        ),
        (name, _) => bail!("Unknown command or wrong arguments: '{name}'"),
    };

    Ok(Invocation {
        command,
        document: PathBuf::from(document),
        policy,
    })
}

fn parse_offset(value: &str) -> Result<usize> {
    value
        .parse()
        .with_context(|| format!("Invalid character offset '{value}'"))
}

fn load_config() -> Result<Config> {
    let config_path = Config::config_path();
    match Config::load()? {
        Some(config) => {
            log::info!("Using config file {}", config_path.display());
            Ok(config)
        }
        None => {
            log::info!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Ok(Config::new(Config::default_storage_path()))
        }
    }
}

fn configured_policy(config: &Config) -> OverlapPolicy {
    match config.overlap_policy {
        rangemark_config::OverlapPolicy::Reject => OverlapPolicy::Reject,
        rangemark_config::OverlapPolicy::Merge => OverlapPolicy::Merge,
    }
}

fn configured_kind(config: &Config) -> AddressKind {
    match config.address_encoding {
        AddressEncoding::Path => AddressKind::Path,
        AddressEncoding::Query => AddressKind::Query,
    }
}

fn run(invocation: Invocation, config: &Config) -> Result<()> {
    let tree = io::read_document(&invocation.document)
        .with_context(|| format!("Failed to load '{}'", invocation.document.display()))?;
    let policy = invocation.policy.unwrap_or_else(|| configured_policy(config));
    let renderer = Renderer::new(MarkerStyle {
        tag: config.marker.tag.clone(),
        class: config.marker.class.clone(),
        id_attribute: config.marker.id_attribute.clone(),
    });
    let store = RangeStore::new(policy).with_separator(config.merge_separator.clone());
    let mut session = HighlightSession::new(tree, configured_kind(config), LogEvents)
        .with_renderer(renderer)
        .with_store(store);

    let records_path = io::records_path_for(&invocation.document)?;
    if let Some(json) = io::read_records_json(&records_path, &config.storage_path)? {
        let report = session.restore_json(&json)?;
        if report.dropped > 0 {
            log::warn!(
                "Dropped {} highlight(s) that no longer match the document",
                report.dropped
            );
        }
    }

    let changed = match invocation.command {
        Command::Render => {
            println!("{}", session.html());
            false
        }
        Command::List => {
            for record in session.records() {
                println!(
                    "{}\t{}:{}\t{}:{}\t{:?}",
                    record.id,
                    record.start_address,
                    record.start_offset,
                    record.end_address,
                    record.end_offset,
                    record.text
                );
            }
            false
        }
        Command::Add { start, end } => {
            let outcome = session.select_offsets(start, end)?;
            println!("Added highlight {}", outcome.range.id);
            true
        }
        Command::Erase { start, end } => {
            let outcome = session.erase_offsets(start, end)?;
            println!(
                "Removed {} highlight(s), kept {} part(s)",
                outcome.removed.len(),
                outcome.created.len()
            );
            !outcome.is_empty()
        }
        Command::Merge => {
            let outcome = session.merge_all();
            println!("Merged {} highlight(s)", outcome.removed.len());
            !outcome.is_empty()
        }
        Command::Delete(id) => match session.delete(id) {
            Some(_) => {
                println!("Deleted highlight {id}");
                true
            }
            None => {
                println!("No highlight {id}");
                false
            }
        },
        Command::Clear => {
            let ids = session.clear();
            println!("Cleared {} highlight(s)", ids.len());
            !ids.is_empty()
        }
    };

    if changed {
        io::write_records(&records_path, &config.storage_path, &session.records())?;
        log::info!(
            "Saved {} highlight(s) to {}",
            session.store().len(),
            records_path.to_path(&config.storage_path).display()
        );
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    let result = load_config().and_then(|config| run(invocation, &config));
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
