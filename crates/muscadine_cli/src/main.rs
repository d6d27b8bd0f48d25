//! Admin command line for Muscadine document collections.
//!
//! # Responsibility
//! - Open a store from configuration (MongoDB) or a local SQLite file.
//! - List, fetch or insert documents as JSON on stdout.

use clap::{Parser, Subcommand};
use muscadine_store::{
    default_log_level, init_logging, load_config, Document, DocumentStore, MongoDocumentStore,
    RecordService, SqliteDocumentStore, StoreConfig, StoreError, StoreResult,
};
use muscadine_store::config::ENV_COLLECTION;
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_SQLITE_COLLECTION: &str = "documents";

#[derive(Debug, Parser)]
#[command(name = "muscadine", version, about = "Inspect and seed Muscadine document collections")]
struct Cli {
    /// TOML store config; `MUSCADINE_MONGO_*` variables override it.
    #[arg(long, env = "MUSCADINE_CONFIG")]
    config: Option<PathBuf>,

    /// Use an embedded SQLite file instead of MongoDB.
    #[arg(long, env = "MUSCADINE_SQLITE")]
    sqlite: Option<PathBuf>,

    /// Collection name; overrides the configured one.
    #[arg(long)]
    collection: Option<String>,

    /// Absolute directory for log files. Logging stays off when omitted.
    #[arg(long, env = "MUSCADINE_LOG_DIR")]
    log_dir: Option<String>,

    #[arg(long, default_value_t = default_log_level().to_string())]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every document ordered by id.
    List,
    /// Print one document.
    Get { id: String },
    /// Insert a JSON object and print the id used.
    Insert { json: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        if let Err(err) = init_logging(&cli.log_level, log_dir) {
            eprintln!("muscadine: {err}");
            return ExitCode::FAILURE;
        }
    }

    match dispatch(&cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("muscadine: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: &Cli) -> StoreResult<String> {
    match cli.sqlite.as_ref() {
        Some(path) => {
            let configured = configured_collection(cli)?;
            let collection = resolve_collection(cli.collection.as_deref(), configured.as_deref());
            let store = SqliteDocumentStore::open(path, collection)?;
            run(RecordService::new(store), &cli.command).await
        }
        None => {
            let store = MongoDocumentStore::open_with_config(&mongo_config(cli)?).await?;
            run(RecordService::new(store), &cli.command).await
        }
    }
}

/// Collection named by `--config` or, without a file, by the environment.
fn configured_collection(cli: &Cli) -> StoreResult<Option<String>> {
    match cli.config.as_ref() {
        Some(path) => Ok(Some(load_config(path)?.collection)),
        None => Ok(std::env::var(ENV_COLLECTION)
            .ok()
            .filter(|collection| !collection.trim().is_empty())),
    }
}

/// `--collection` wins over configuration, which wins over the default.
fn resolve_collection(flag: Option<&str>, configured: Option<&str>) -> String {
    flag.or(configured)
        .unwrap_or(DEFAULT_SQLITE_COLLECTION)
        .to_string()
}

fn mongo_config(cli: &Cli) -> StoreResult<StoreConfig> {
    let mut config = match cli.config.as_ref() {
        Some(path) => load_config(path)?,
        None => StoreConfig::from_env()?,
    };
    if let Some(collection) = cli.collection.clone() {
        config.collection = collection;
    }
    Ok(config)
}

async fn run<S: DocumentStore>(service: RecordService<S>, command: &Command) -> StoreResult<String> {
    match command {
        Command::List => {
            let documents: Vec<Document> = service.list().await?;
            to_pretty_json(&documents)
        }
        Command::Get { id } => {
            let document: Document = service.require(id).await?;
            to_pretty_json(&document)
        }
        Command::Insert { json } => {
            let value: serde_json::Value = serde_json::from_str(json)?;
            let document = Document::from_value(value).ok_or_else(|| {
                StoreError::InvalidArgument("insert expects a JSON object".to_string())
            })?;
            service.create(&document).await
        }
    }
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> StoreResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::{configured_collection, resolve_collection, run, Cli, Command};
    use clap::Parser;
    use muscadine_store::{RecordService, SqliteDocumentStore, StoreError};
    use std::io::Write;

    #[test]
    fn collection_flag_wins_over_configuration() {
        assert_eq!(resolve_collection(Some("flag"), Some("configured")), "flag");
        assert_eq!(resolve_collection(None, Some("configured")), "configured");
        assert_eq!(resolve_collection(None, None), "documents");
    }

    #[test]
    fn sqlite_mode_reads_collection_from_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "host = \"localhost\"\ndatabase = \"site\"\ncollection = \"posts\""
        )
        .unwrap();
        let config_path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from([
            "muscadine",
            "--sqlite",
            "site.db",
            "--config",
            config_path,
            "list",
        ])
        .unwrap();

        let configured = configured_collection(&cli).unwrap();
        assert_eq!(configured.as_deref(), Some("posts"));
        assert_eq!(
            resolve_collection(cli.collection.as_deref(), configured.as_deref()),
            "posts"
        );
    }

    fn service() -> RecordService<SqliteDocumentStore> {
        RecordService::new(SqliteDocumentStore::open_in_memory("cli").unwrap())
    }

    #[tokio::test]
    async fn insert_then_get_prints_document() {
        let service = service();
        let id = run(
            service.clone(),
            &Command::Insert {
                json: r#"{"_id": "p1", "title": "Hello"}"#.to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(id, "p1");

        let printed = run(service, &Command::Get { id }).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&printed).unwrap();
        assert_eq!(value["title"], "Hello");
    }

    #[tokio::test]
    async fn insert_rejects_non_object_json() {
        let err = run(service(), &Command::Insert { json: "[1]".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn get_missing_reports_not_found() {
        let err = run(service(), &Command::Get { id: "nope".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
