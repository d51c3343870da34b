//! Command-line front end: import, export and clean API documents in the
//! catalog.
//!
//! Connection settings come from `.apicatalog.yaml` (or `--config`), with
//! `--url/--user/--password` and their `APICATALOG_*` environment variables
//! taking precedence. `import --dry-run` needs no catalog at all.

use anyhow::{Context, Result, bail};
use apicatalog::{
    CatalogConfig, DocumentFormat, Entity, HttpCatalog, MemoryCatalog, Overrides, SpecKind,
    clean_document, clean_openapi, expand_components, export_document, import_document,
    import_openapi, load_document, root_name_from_path, write_document,
};
use clap::{ArgGroup, Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apicatalog")]
#[command(about = "Import and export AsyncAPI documents as catalog assets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: .apicatalog.yaml in $HOME or the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog REST base URL
    #[arg(long, global = true, env = "APICATALOG_URL")]
    url: Option<String>,

    /// Catalog user
    #[arg(short, long, global = true, env = "APICATALOG_USER")]
    user: Option<String>,

    /// Catalog password
    #[arg(short, long, global = true, env = "APICATALOG_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Log store requests and created entities
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import an AsyncAPI (or OpenAPI) document into the catalog
    Import {
        /// JSON or YAML document to import
        #[arg(short, long)]
        input: PathBuf,

        /// Root entity name (default: input file name up to the first '.')
        #[arg(short, long)]
        root: Option<String>,

        /// Import into an in-memory catalog and print the entities instead
        #[arg(long)]
        dry_run: bool,
    },

    /// Rebuild a document from the catalog
    Export {
        /// Root entity name
        #[arg(short, long)]
        root: String,

        /// Output file (default: ROOT.json or ROOT.yaml)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: DocumentFormat,

        /// Inline #/components/ references in the exported document
        #[arg(long)]
        dereference: bool,
    },

    /// Remove an imported root entity and its component type records
    #[command(group(ArgGroup::new("target").required(true).args(["input", "root"])))]
    Clean {
        /// Document whose import should be removed
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Root entity name
        #[arg(short, long)]
        root: Option<String>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Import {
            input,
            root,
            dry_run,
        } => import(&cli, input, root.as_deref(), *dry_run),
        Commands::Export {
            root,
            output,
            format,
            dereference,
        } => export(&cli, root, output.as_deref(), *format, *dereference),
        Commands::Clean { input, root } => clean(&cli, input.as_deref(), root.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn connect(cli: &Cli) -> Result<HttpCatalog> {
    let endpoint = CatalogConfig::discover(cli.config.as_deref())?
        .with_overrides(Overrides {
            url: cli.url.clone(),
            user: cli.user.clone(),
            password: cli.password.clone(),
        })
        .endpoint()?;
    HttpCatalog::new(&endpoint)
}

fn import(cli: &Cli, input: &Path, root: Option<&str>, dry_run: bool) -> Result<()> {
    let document = load_document(input)?;
    let root = match root {
        Some(root) => root.to_string(),
        None => root_name_from_path(input)?,
    };

    match SpecKind::detect(&document) {
        SpecKind::AsyncApi(version) => {
            tracing::info!(input = %input.display(), %version, root = %root, "importing AsyncAPI document");
            if dry_run {
                let mut store = MemoryCatalog::new();
                let summary = import_document(&mut store, &root, &document)?;
                for entity in store.entities() {
                    println!("{}", entity_line(entity)?);
                }
                eprintln!(
                    "dry run: {} entities, {} type records",
                    summary.entities, summary.type_records
                );
            } else {
                let mut store = connect(cli)?;
                let summary = import_document(&mut store, &root, &document)?;
                println!(
                    "imported {} as root {} ({} entities)",
                    input.display(),
                    summary.root_id,
                    summary.entities
                );
            }
        }
        SpecKind::OpenApi(_) => {
            for path in import_openapi(&document)? {
                println!("import path {} - {}", path.path, path.operations.join(" "));
            }
        }
        SpecKind::Unknown => bail!(
            "{} is neither an AsyncAPI nor an OpenAPI document",
            input.display()
        ),
    }
    Ok(())
}

fn entity_line(entity: &Entity) -> Result<String> {
    serde_json::to_string(entity).context("Failed to encode entity")
}

fn export(
    cli: &Cli,
    root: &str,
    output: Option<&Path>,
    format: DocumentFormat,
    dereference: bool,
) -> Result<()> {
    let store = connect(cli)?;
    let mut document = export_document(&store, root)?;
    if dereference {
        if let Value::Object(map) = &mut document {
            expand_components(map)?;
        }
    }
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(format!("{root}.{}", format.extension())),
    };
    write_document(&output, &document, format)?;
    println!("exported {root} to {}", output.display());
    Ok(())
}

fn clean(cli: &Cli, input: Option<&Path>, root: Option<&str>) -> Result<()> {
    let root = match (input, root) {
        (_, Some(root)) => root.to_string(),
        (Some(input), None) => {
            let document = load_document(input)?;
            if let SpecKind::OpenApi(_) = SpecKind::detect(&document) {
                clean_openapi(&document);
                return Ok(());
            }
            root_name_from_path(input)?
        }
        (None, None) => bail!("clean needs --input or --root"),
    };
    let mut store = connect(cli)?;
    let summary = clean_document(&mut store, &root)?;
    if summary.root_found {
        println!(
            "removed {root} and {} component type records",
            summary.type_records_deleted
        );
    } else {
        println!("nothing to clean for {root}");
    }
    Ok(())
}
