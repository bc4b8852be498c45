use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use jamf_collections::config::Config;
use jamf_collections::{
    format_api_error, get_all_resource_keys, get_resource, AllOptions, Connection, DeletePolicy,
    Lookup, Sort,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line access to Jamf Pro collection resources
#[derive(Parser, Debug)]
#[command(name = "jcoll", version, about, long_about = None)]
struct Args {
    /// Jamf Pro API root, e.g. https://jamf.example.com/api
    #[arg(short, long)]
    server: Option<String>,

    /// Bearer token for API calls
    #[arg(short, long)]
    token: Option<String>,

    /// Remember --server in the config file
    #[arg(long)]
    save: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the known collection types
    Types,
    /// List members of a collection
    List {
        collection: String,
        /// Sort criteria, field:asc or field:desc, comma separated
        #[arg(long)]
        sort: Option<String>,
        /// RSQL filter expression
        #[arg(long)]
        filter: Option<String>,
        /// Fetch page by page instead of all at once
        #[arg(long)]
        paged: bool,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// List the ids of every member
    Ids { collection: String },
    /// List every value of one field
    Values { collection: String, field: String },
    /// Map an identifier to another attribute
    Map {
        collection: String,
        ident: String,
        to: String,
    },
    /// Fetch one member by id or by any identifier
    Fetch {
        collection: String,
        value: String,
        /// Identifier to match, e.g. name or serialNumber
        #[arg(long)]
        by: Option<String>,
    },
    /// Fetch a random member
    Random { collection: String },
    /// Count the members of a collection
    Count { collection: String },
    /// Delete members by id
    Delete {
        collection: String,
        #[arg(required = true)]
        ids: Vec<String>,
        /// Keep going when an individual delete fails
        #[arg(long)]
        continue_on_error: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("jcoll started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("jcoll").join("jcoll.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".jcoll").join("jcoll.log");
    }
    PathBuf::from("jcoll.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    if let Err(err) = run(args).await {
        match err.downcast_ref::<jamf_collections::Error>() {
            Some(api_err) => eprintln!("Error: {}", format_api_error(api_err)),
            None => eprintln!("Error: {err:?}"),
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(args: Args) -> Result<()> {
    if let Command::Types = args.command {
        for key in get_all_resource_keys() {
            let def = get_resource(key).context("registry changed underneath us")?;
            println!("{:<28} {}", key, def.display_name);
        }
        return Ok(());
    }

    let mut config = Config::load();
    let server = config
        .effective_server_url(args.server.as_deref())
        .context("No Jamf Pro server configured. Set JAMF_URL or use --server")?;
    let token = config.effective_token(args.token.as_deref());

    if args.save {
        config.set_server_url(&server)?;
    }

    tracing::info!("Using server: {}", server);
    let cnx = Connection::new(&server, token.as_deref())?;

    match args.command {
        Command::Types => {}
        Command::List {
            collection,
            sort,
            filter,
            paged,
            page_size,
        } => {
            let coll = cnx.collection(&collection)?;
            let mut options = AllOptions::new();
            if let Some(sort) = sort {
                options = options.sort(sort.parse::<Sort>()?);
            }
            if let Some(filter) = filter {
                options = options.filter(filter);
            }

            if paged {
                let size = page_size.or(config.page_size).unwrap_or(100);
                let mut page = coll.all(&options.paged(size)).await?;
                while !page.is_empty() {
                    print_json(&page)?;
                    page = coll.next_page_of_all().await?;
                }
            } else {
                print_json(&coll.all(&options).await?)?;
            }
        }
        Command::Ids { collection } => {
            print_json(&cnx.collection(&collection)?.all_ids(false).await?)?;
        }
        Command::Values { collection, field } => {
            print_json(&cnx.collection(&collection)?.all_values(&field, false).await?)?;
        }
        Command::Map {
            collection,
            ident,
            to,
        } => {
            print_json(&cnx.collection(&collection)?.map_all(&ident, &to, false).await?)?;
        }
        Command::Fetch {
            collection,
            value,
            by,
        } => {
            let lookup = match by {
                Some(ident) => Lookup::by(&ident, value),
                None => Lookup::any(value),
            };
            let instance = cnx.collection(&collection)?.fetch(&lookup).await?;
            print_json(&instance.to_json())?;
        }
        Command::Random { collection } => {
            let instance = cnx.collection(&collection)?.fetch_random().await?;
            print_json(&instance.to_json())?;
        }
        Command::Count { collection } => {
            println!("{}", cnx.collection(&collection)?.count().await?);
        }
        Command::Delete {
            collection,
            ids,
            continue_on_error,
        } => {
            let policy = if continue_on_error {
                DeletePolicy::ContinueOnError
            } else {
                DeletePolicy::AbortOnError
            };
            let errors = cnx.collection(&collection)?.delete_with(&ids, policy).await?;
            if !errors.is_empty() {
                print_json(&errors)?;
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
