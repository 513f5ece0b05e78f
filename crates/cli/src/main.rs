mod config;
mod error;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use policy::{
    Authorizer, Capability, CapabilityResolver, Decision, Note, NoteId, NoteTarget, User, UserId,
};
use storage::{NewNote, NoteRecord, NoteStore};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "notecaps.toml";

#[derive(Parser)]
#[command(name = "notecaps")]
#[command(about = "Capability checks for collaborative notes", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./notecaps.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a user may exercise a capability
    Check(CheckArgs),
    /// Print the capabilities a check would require
    Resolve(CheckArgs),
    /// Manage the local note store
    Notes {
        #[command(subcommand)]
        command: NotesCommand,
    },
    /// Apply pending schema migrations
    Migrate,
    /// Show the effective role table
    Roles,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Acting user id
    #[arg(short, long)]
    user: u64,
    /// Capability name (e.g. read_notes)
    #[arg(long)]
    cap: Capability,
    /// Target note id
    #[arg(short, long)]
    note: Option<u64>,
}

#[derive(Subcommand)]
enum NotesCommand {
    /// Add a note
    Add {
        /// Author user id
        #[arg(short, long)]
        author: u64,
        /// Only visible to the author and privileged roles
        #[arg(long)]
        private: bool,
        /// Reply to this note
        #[arg(long)]
        parent: Option<u64>,
        content: String,
    },
    /// List recent notes
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check(args) => cmd_check(&config, &args),
        Commands::Resolve(args) => cmd_resolve(&config, &args),
        Commands::Notes { command } => match command {
            NotesCommand::Add {
                author,
                private,
                parent,
                content,
            } => cmd_add_note(&config, author, private, parent, content),
            NotesCommand::List { limit } => cmd_list_notes(&config, limit),
        },
        Commands::Migrate => cmd_migrate(&config),
        Commands::Roles => cmd_roles(&config),
    }
}

fn cmd_check(config: &Config, args: &CheckArgs) -> Result<()> {
    let (user, required, authorizer) = required_for(config, args)?;
    println!("required: {}", join(&required));

    match authorizer.evaluate(&user, &required) {
        Decision::Allow => {
            println!("decision: allow");
            Ok(())
        }
        Decision::Deny { reason } => {
            println!("decision: deny");
            Err(Error::Denied { reason })
        }
    }
}

fn cmd_resolve(config: &Config, args: &CheckArgs) -> Result<()> {
    let (_, required, _) = required_for(config, args)?;
    for cap in required {
        println!("{cap}");
    }
    Ok(())
}

fn required_for(config: &Config, args: &CheckArgs) -> Result<(User, Vec<Capability>, Authorizer)> {
    let user = config.user(args.user);
    let mut authorizer = Authorizer::new(config.role_table());

    let targets = match args.note {
        Some(id) => {
            let path = db_path(config);
            if path.exists() {
                authorizer.register(CapabilityResolver::new(NoteStore::open(&path)?));
            } else {
                // No database yet, so no note can exist.
                debug!(path = %path.display(), "note database missing, resolving against no notes");
                authorizer.register(CapabilityResolver::new(HashMap::<NoteId, Note>::new()));
            }
            vec![NoteTarget::Id(NoteId(id))]
        }
        None => Vec::new(),
    };

    let required = authorizer.required(&user, &args.cap, &targets)?;
    Ok((user, required, authorizer))
}

fn cmd_add_note(
    config: &Config,
    author: u64,
    private: bool,
    parent: Option<u64>,
    content: String,
) -> Result<()> {
    let store = create_store(config)?;

    let mut note = NewNote::new(UserId(author), content);
    if private {
        note = note.private();
    }
    if let Some(parent) = parent {
        note = note.reply_to(NoteId(parent));
    }

    let record = store.insert(&note)?;
    println!("Added note {}", record.id);
    Ok(())
}

fn cmd_list_notes(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let notes = store.list_recent(limit)?;

    if notes.is_empty() {
        println!("No notes found.");
        return Ok(());
    }

    println!(
        "{:<6}  {:<6}  {:<6}  {:<8}  {:<16}  CONTENT",
        "ID", "AUTHOR", "PARENT", "VISIBLE", "CREATED"
    );
    println!("{}", "-".repeat(80));

    for note in notes {
        print_note(&note);
    }
    Ok(())
}

fn print_note(note: &NoteRecord) {
    let created = Local
        .from_utc_datetime(&note.created_at.naive_utc())
        .format("%Y-%m-%d %H:%M");
    let parent = note
        .parent_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let visibility = if note.is_public { "public" } else { "private" };
    let content = if note.content.chars().count() > 40 {
        format!("{}...", note.content.chars().take(40).collect::<String>())
    } else {
        note.content.clone()
    };
    println!(
        "{:<6}  {:<6}  {:<6}  {:<8}  {:<16}  {content}",
        note.id.to_string(),
        note.author_id.to_string(),
        parent,
        visibility,
        created.to_string()
    );
}

fn cmd_migrate(config: &Config) -> Result<()> {
    let store = create_store(config)?;
    println!("Schema version: {}", store.schema_version()?);
    Ok(())
}

fn cmd_roles(config: &Config) -> Result<()> {
    for (role, grants) in &config.role_table().roles {
        if grants.grant.is_empty() {
            println!("{role}: (none)");
        } else {
            println!("{role}: {}", join(&grants.grant));
        }
    }
    Ok(())
}

fn join(caps: &[Capability]) -> String {
    caps.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn db_path(config: &Config) -> PathBuf {
    config.database.clone().unwrap_or_else(|| {
        dirs_data_dir()
            .unwrap_or_else(|| ".notecaps".into())
            .join("notes.db")
    })
}

fn open_store(config: &Config) -> Result<NoteStore> {
    let path = db_path(config);
    if !path.exists() {
        return Err(Error::DatabaseNotFound { path });
    }
    Ok(NoteStore::open(&path)?)
}

fn create_store(config: &Config) -> Result<NoteStore> {
    let path = db_path(config);
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    Ok(NoteStore::open(&path)?)
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/notecaps"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("notecaps"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("notecaps"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None if Path::new(CONFIG_FILE).exists() => Path::new(CONFIG_FILE),
        None => {
            debug!("no {CONFIG_FILE}, using default roles");
            return Ok(Config::default_config());
        }
    };
    debug!(path = %path.display(), "loading config");
    Ok(Config::load(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::NoteCapability;

    fn args(user: u64, cap: NoteCapability, note: Option<u64>) -> CheckArgs {
        CheckArgs {
            user,
            cap: Capability::Note(cap),
            note,
        }
    }

    fn config_with_db(path: PathBuf) -> Config {
        Config {
            database: Some(path),
            ..Config::default_config()
        }
    }

    #[test]
    fn test_missing_database_denies_note_checks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let config = config_with_db(path.clone());

        let (_, required, _) =
            required_for(&config, &args(2, NoteCapability::Read, Some(5))).unwrap();
        assert_eq!(required, vec![Capability::DoNotAllow]);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_database_without_note_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_db(dir.path().join("missing.db"));

        let (_, required, _) =
            required_for(&config, &args(2, NoteCapability::Create, None)).unwrap();
        assert_eq!(required, vec![Capability::Note(NoteCapability::Create)]);
    }

    #[test]
    fn test_existing_database_expands_private_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");
        let note = NoteStore::open(&path)
            .unwrap()
            .insert(&NewNote::new(UserId(1), "secret").private())
            .unwrap();
        let config = config_with_db(path);

        let (_, required, _) =
            required_for(&config, &args(2, NoteCapability::Read, Some(note.id.0))).unwrap();
        assert_eq!(
            required,
            vec![
                Capability::Note(NoteCapability::Read),
                Capability::Note(NoteCapability::ReadOthersPrivate),
            ]
        );
    }
}
