//! Trellis CLI
//!
//! Command-line interface for Trellis - boards, cards and their blocks.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use trellis_core::{BlockStore, Config, SqliteStore, StoreError};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Trellis - block storage and board search")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Acting user (id, username or email)
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage blocks
    Block {
        #[command(subcommand)]
        command: BlockCommands,
    },
    /// Search boards by title or card property name
    Search {
        /// Search term (case-insensitive substring)
        term: String,
        /// Limit to one team
        #[arg(short, long)]
        team: Option<String>,
        /// Field to match: title or property_name
        #[arg(short, long)]
        field: Option<String>,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage team membership
    Team {
        #[command(subcommand)]
        command: TeamCommands,
    },
    /// Manage board membership
    Member {
        #[command(subcommand)]
        command: MemberCommands,
    },
    /// Read or write system settings
    Setting {
        #[command(subcommand)]
        command: SettingCommands,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum BlockCommands {
    /// Create or overwrite a block
    #[command(alias = "create")]
    Add {
        /// Block type (board, card, text, ...)
        block_type: String,
        /// Block ID (generated if omitted)
        #[arg(long)]
        id: Option<String>,
        /// Parent block ID
        #[arg(short, long)]
        parent: Option<String>,
        /// Team ID (root blocks only; children inherit their board's)
        #[arg(long)]
        team: Option<String>,
        /// Title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Fields as a JSON object
        #[arg(long)]
        fields: Option<String>,
    },
    /// Show a block
    Show { id: String },
    /// List blocks
    #[command(alias = "ls")]
    List {
        /// Only children of this block
        #[arg(short, long)]
        parent: Option<String>,
        /// Only blocks of this type
        #[arg(short = 't', long = "type")]
        block_type: Option<String>,
    },
    /// Show a block and its descendants
    Tree {
        id: String,
        /// Levels to include, counting the root
        #[arg(short, long, default_value_t = 3)]
        depth: usize,
    },
    /// Delete a block
    #[command(alias = "rm")]
    Delete {
        id: String,
        /// Also delete descendants
        #[arg(short, long)]
        recursive: bool,
        /// Levels to delete when recursive (unbounded if omitted)
        #[arg(short, long, requires = "recursive")]
        depth: Option<usize>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create an account
    Add {
        username: String,
        email: String,
        /// Create as a guest account
        #[arg(long)]
        guest: bool,
    },
    /// Show an account
    Show { user: String },
    /// Mark an account as guest or full member
    Guest {
        user: String,
        /// Clear the guest flag instead of setting it
        #[arg(long)]
        off: bool,
    },
}

#[derive(Subcommand)]
enum TeamCommands {
    /// Add a user to a team
    Join { team: String, user: String },
    /// Remove a user from a team
    Leave { team: String, user: String },
}

#[derive(Subcommand)]
enum MemberCommands {
    /// Add a user to a board
    Add {
        board: String,
        user: String,
        /// viewer, editor or admin
        #[arg(short, long, default_value = "editor")]
        role: String,
    },
    /// Remove a user from a board
    #[command(alias = "rm")]
    Remove { board: String, user: String },
    /// List board members
    #[command(alias = "ls")]
    List { board: String },
}

#[derive(Subcommand)]
enum SettingCommands {
    /// Show one setting, or all of them
    Get { key: Option<String> },
    /// Set a setting
    Set { key: String, value: String },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Print the config file path
    Path,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    if let Err(e) = run(cli, &output) {
        report_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    let config = Config::load()?;
    init_logging(&config);

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(&config, output),
            Some(ConfigCommands::Path) => commands::config::path(),
        };
    }

    let store = SqliteStore::open(&config)?;
    debug!("opened store at {:?}", config.sqlite_path());

    let principal = cli.user.or_else(|| config.default_user.clone());
    let result = dispatch(cli.command, &store, principal.as_deref(), output);

    finish(result, store.shutdown())
}

/// The command's own error wins over a failed shutdown
fn finish(result: Result<()>, shutdown: trellis_core::StoreResult<()>) -> Result<()> {
    match (result, shutdown) {
        (Err(e), Err(close_err)) => {
            warn!("failed to close store: {}", close_err);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), closed) => Ok(closed?),
    }
}

fn dispatch(
    command: Commands,
    store: &SqliteStore,
    principal: Option<&str>,
    output: &Output,
) -> Result<()> {
    match command {
        Commands::Block { command } => handle_block_command(command, store, principal, output),
        Commands::Search { term, team, field } => {
            let user = commands::require_principal(store, principal)?;
            commands::search::search(store, &user.id, term, team, field, output)
        }
        Commands::User { command } => match command {
            UserCommands::Add {
                username,
                email,
                guest,
            } => commands::user::add(store, username, email, guest, output),
            UserCommands::Show { user } => commands::user::show(store, &user, output),
            UserCommands::Guest { user, off } => {
                commands::user::set_guest(store, &user, !off, output)
            }
        },
        Commands::Team { command } => match command {
            TeamCommands::Join { team, user } => {
                commands::member::join_team(store, &team, &user, output)
            }
            TeamCommands::Leave { team, user } => {
                commands::member::leave_team(store, &team, &user, output)
            }
        },
        Commands::Member { command } => match command {
            MemberCommands::Add { board, user, role } => {
                commands::member::add_board_member(store, &board, &user, &role, output)
            }
            MemberCommands::Remove { board, user } => {
                commands::member::remove_board_member(store, &board, &user, output)
            }
            MemberCommands::List { board } => {
                commands::member::list_board_members(store, &board, output)
            }
        },
        Commands::Setting { command } => match command {
            SettingCommands::Get { key } => commands::setting::get(store, key, output),
            SettingCommands::Set { key, value } => {
                commands::setting::set(store, &key, &value, output)
            }
        },
        Commands::Status => commands::status::show(store, output),
        Commands::Config { .. } => Ok(()),
    }
}

fn handle_block_command(
    command: BlockCommands,
    store: &SqliteStore,
    principal: Option<&str>,
    output: &Output,
) -> Result<()> {
    match command {
        BlockCommands::Add {
            block_type,
            id,
            parent,
            team,
            title,
            fields,
        } => {
            let user_id = match principal {
                Some(ident) => Some(commands::resolve_user(store, ident)?.id),
                None => None,
            };
            let args = commands::block::AddArgs {
                block_type,
                id,
                parent,
                team,
                title,
                fields,
            };
            commands::block::add(store, args, user_id.as_deref(), output)
        }
        BlockCommands::Show { id } => commands::block::show(store, &id, output),
        BlockCommands::List { parent, block_type } => {
            commands::block::list(store, parent, block_type, output)
        }
        BlockCommands::Tree { id, depth } => commands::block::tree(store, &id, depth, output),
        BlockCommands::Delete {
            id,
            recursive,
            depth,
        } => commands::block::delete(store, &id, recursive, depth, output),
    }
}

/// Log to stderr; RUST_LOG wins over the configured level
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "trellis_core={level},trellis_cli={level},trellis={level}",
            level = config.log_level
        ))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn report_error(error: &anyhow::Error) {
    eprintln!("Error: {:#}", error);
    if let Some(hint) = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<StoreError>())
        .and_then(StoreError::recovery_suggestion)
    {
        eprintln!("Hint: {}", hint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_survives_failed_shutdown() {
        let err = finish(Err(anyhow::anyhow!("boom")), Err(StoreError::Closed)).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_shutdown_error_reported_after_success() {
        let err = finish(Ok(()), Err(StoreError::Closed)).unwrap_err();
        assert!(err.downcast_ref::<StoreError>().is_some());
        assert!(finish(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn test_cli_parses_search_flags() {
        let cli = Cli::try_parse_from([
            "trellis", "--user", "alice", "search", "road", "--team", "T1", "--field",
            "property_name",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("alice"));
        match cli.command {
            Commands::Search { term, team, field } => {
                assert_eq!(term, "road");
                assert_eq!(team.as_deref(), Some("T1"));
                assert_eq!(field.as_deref(), Some("property_name"));
            }
            _ => panic!("expected search"),
        }
    }
}
