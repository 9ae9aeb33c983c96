use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

use fileshare_manager::{FileManager, StorageConfig};

#[derive(Parser, Debug)]
#[command(name = "fileshare-manager")]
#[command(about = "Browse and manage folders on a remote file share")]
#[command(version)]
struct Cli {
    /// Path to a JSON storage config ({"type": ..., "options": {..}})
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// List the immediate children of a folder
    List {
        /// Folder path (default: share root)
        path: Option<String>,
    },
    /// Print every file below a folder
    Tree {
        /// Folder path (default: share root)
        path: Option<String>,
    },
    /// Create a folder and its missing ancestors
    Mkdir { path: Option<String> },
    /// Delete a folder recursively
    Rmdir { path: Option<String> },
    /// Show the metadata of one file
    Stat { path: Option<String> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = StorageConfig::from_json_file(&cli.config)?;
    info!(
        "Starting fileshare manager, storage type={}",
        config.storage_type_str()
    );
    let manager = FileManager::builder(config)
        .with_connection_validation(true)
        .build()
        .await?;

    let output = match cli.command {
        Commands::List { path } => {
            serde_json::to_string_pretty(&manager.list_objects(&path.unwrap_or_default()).await?)?
        }
        Commands::Tree { path } => serde_json::to_string_pretty(
            &manager.list_all_paths(&path.unwrap_or_default()).await?,
        )?,
        Commands::Mkdir { path } => {
            let path = path.unwrap_or_default();
            manager.create_folder(&path).await?;
            serde_json::to_string_pretty(&serde_json::json!({ "created": path }))?
        }
        Commands::Rmdir { path } => {
            let removed = manager.delete_folder(&path.unwrap_or_default()).await?;
            serde_json::to_string_pretty(&serde_json::json!({ "removed": removed }))?
        }
        Commands::Stat { path } => serde_json::to_string_pretty(
            &manager.get_file_metadata(&path.unwrap_or_default()).await?,
        )?,
    };
    println!("{}", output);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_with_path() {
        let cli = Cli::try_parse_from(["fileshare-manager", "share.json", "list", "/media"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("share.json"));
        assert_eq!(
            cli.command,
            Commands::List {
                path: Some("/media".to_string())
            }
        );
    }

    #[test]
    fn test_parse_path_is_optional() {
        let cli = Cli::try_parse_from(["fileshare-manager", "share.json", "tree"]).unwrap();
        assert_eq!(cli.command, Commands::Tree { path: None });
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["fileshare-manager", "share.json", "format"]).is_err());
        assert!(Cli::try_parse_from(["fileshare-manager"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
