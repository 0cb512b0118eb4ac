use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};

use semantix_core::managers::ImportMode;
use semantix_core::models::{
    FavoritePatch, NewFavorite, NewProject, ProjectPatch, Provider, Section,
};
use semantix_core::{CoreConfig, SemantixRuntime};

#[derive(Parser)]
#[command(name = "semantix-cli")]
#[command(about = "CLI interface for the semantix storage engine")]
struct Cli {
    /// Directory holding the store file (defaults to the platform data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Favorite conversations
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommand,
    },
    /// Projects
    Projects {
        #[command(subcommand)]
        command: ProjectsCommand,
    },
    /// Folder management for a section
    Folders {
        /// Section owning the folders (favorites, projects, memories, prompts)
        #[arg(long, short)]
        section: Section,
        #[command(subcommand)]
        command: FoldersCommand,
    },
    /// Dump the organized folder/item structure of a section
    Tree {
        #[arg(long, short)]
        section: Section,
    },
}

#[derive(Subcommand)]
enum FavoritesCommand {
    /// Add a conversation to favorites
    Add {
        /// Conversation id (unique key)
        id: String,
        title: String,
        /// Provider: chatgpt, claude or qwen
        #[arg(long, default_value = "chatgpt")]
        provider: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        tag: Vec<String>,
        /// Target folder id (omit to use the selected folder)
        #[arg(long)]
        folder: Option<String>,
    },
    /// List favorites, optionally scoped to one folder
    List {
        #[arg(long)]
        folder: Option<String>,
    },
    Remove {
        id: String,
    },
    /// Rename a favorite
    Rename {
        id: String,
        title: String,
    },
    /// Move a favorite into a folder (omit --folder for root)
    Move {
        id: String,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Select the default folder for new favorites (omit --folder to clear)
    Select {
        #[arg(long)]
        folder: Option<String>,
    },
    /// Print the favorites list as a JSON array
    Export,
    /// Import favorites from an exported JSON file
    Import {
        file: PathBuf,
        /// Overwrite the stored list instead of merging
        #[arg(long)]
        replace: bool,
    },
}

#[derive(Subcommand)]
enum ProjectsCommand {
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        folder: Option<String>,
    },
    List {
        #[arg(long)]
        folder: Option<String>,
    },
    Remove {
        id: String,
    },
    /// Update mutable project fields
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    Move {
        id: String,
        #[arg(long)]
        folder: Option<String>,
    },
}

#[derive(Subcommand)]
enum FoldersCommand {
    Create {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Print the folder tree
    List,
    Rename {
        id: String,
        name: String,
    },
    /// Recolor / re-icon a folder
    Update {
        id: String,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a folder and everything inside it
    Delete {
        id: String,
    },
}

fn parse_provider(s: &str) -> Result<Provider> {
    match s {
        "chatgpt" => Ok(Provider::Chatgpt),
        "claude" => Ok(Provider::Claude),
        "qwen" => Ok(Provider::Qwen),
        other => bail!("unknown provider: {other}"),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("semantix")
}

fn print_json(pretty: bool, value: &impl serde::Serialize) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let rt = SemantixRuntime::open(&CoreConfig::new(data_dir))?;
    let pretty = cli.pretty;

    match cli.command {
        Commands::Favorites { command } => run_favorites(&rt, command, pretty).await,
        Commands::Projects { command } => run_projects(&rt, command, pretty).await,
        Commands::Folders { section, command } => run_folders(&rt, section, command, pretty).await,
        Commands::Tree { section } => match section {
            Section::Favorites => {
                print_json(pretty, &rt.favorites().get_organized_structure().await)
            }
            Section::Projects => {
                print_json(pretty, &rt.projects().get_organized_structure().await)
            }
            other => print_json(pretty, &rt.folders(other).get_tree().await),
        },
    }
}

async fn run_favorites(rt: &SemantixRuntime, command: FavoritesCommand, pretty: bool) -> Result<()> {
    let favorites = rt.favorites();
    match command {
        FavoritesCommand::Add {
            id,
            title,
            provider,
            url,
            tag,
            folder,
        } => {
            let mut new = NewFavorite::new(id, title, parse_provider(&provider)?);
            new.url = url;
            if !tag.is_empty() {
                new.tags = Some(tag);
            }
            if let Some(folder) = folder {
                new.folder_id = Some(Some(folder));
            }
            let item = favorites
                .add(new)
                .await
                .ok_or_else(|| anyhow!("favorite refused (limit reached or invalid input)"))?;
            print_json(pretty, &item)
        }
        FavoritesCommand::List { folder } => match folder {
            Some(folder) => print_json(pretty, &favorites.get_by_folder(Some(&folder)).await),
            None => print_json(pretty, &favorites.get_all().await),
        },
        FavoritesCommand::Remove { id } => {
            if !favorites.remove(&id).await {
                bail!("no favorite with id {id}");
            }
            Ok(())
        }
        FavoritesCommand::Rename { id, title } => {
            let patch = FavoritePatch {
                title: Some(title),
                ..Default::default()
            };
            if !favorites.update(&id, patch).await {
                bail!("no favorite with id {id}");
            }
            Ok(())
        }
        FavoritesCommand::Move { id, folder } => {
            if !favorites.move_to_folder(&id, folder).await {
                bail!("move failed (unknown favorite or folder)");
            }
            Ok(())
        }
        FavoritesCommand::Select { folder } => {
            if !favorites.set_selected_folder(folder).await {
                bail!("no such folder");
            }
            Ok(())
        }
        FavoritesCommand::Export => {
            println!("{}", favorites.export_to_json().await);
            Ok(())
        }
        FavoritesCommand::Import { file, replace } => {
            let raw = std::fs::read_to_string(&file)?;
            let mode = if replace {
                ImportMode::Replace
            } else {
                ImportMode::Merge
            };
            let summary = favorites
                .import_from_json(&raw, mode)
                .await
                .ok_or_else(|| anyhow!("import payload is not a JSON array"))?;
            print_json(
                pretty,
                &serde_json::json!({
                    "imported": summary.imported,
                    "skipped": summary.skipped,
                }),
            )
        }
    }
}

async fn run_projects(rt: &SemantixRuntime, command: ProjectsCommand, pretty: bool) -> Result<()> {
    let projects = rt.projects();
    match command {
        ProjectsCommand::Add {
            name,
            description,
            folder,
        } => {
            let mut new = NewProject::new(name);
            new.description = description;
            if let Some(folder) = folder {
                new.folder_id = Some(Some(folder));
            }
            let item = projects
                .add(new)
                .await
                .ok_or_else(|| anyhow!("project refused (limit reached or invalid name)"))?;
            print_json(pretty, &item)
        }
        ProjectsCommand::List { folder } => match folder {
            Some(folder) => print_json(pretty, &projects.get_by_folder(Some(&folder)).await),
            None => print_json(pretty, &projects.get_all().await),
        },
        ProjectsCommand::Remove { id } => {
            if !projects.remove(&id).await {
                bail!("no project with id {id}");
            }
            Ok(())
        }
        ProjectsCommand::Update {
            id,
            name,
            description,
            color,
            icon,
        } => {
            let patch = ProjectPatch {
                name,
                description,
                color,
                icon,
                folder_id: None,
            };
            if !projects.update(&id, patch).await {
                bail!("update failed (unknown project or empty patch)");
            }
            Ok(())
        }
        ProjectsCommand::Move { id, folder } => {
            if !projects.move_to_folder(&id, folder).await {
                bail!("move failed (unknown project or folder)");
            }
            Ok(())
        }
    }
}

async fn run_folders(
    rt: &SemantixRuntime,
    section: Section,
    command: FoldersCommand,
    pretty: bool,
) -> Result<()> {
    let folders = rt.folders(section);
    match command {
        FoldersCommand::Create { name, parent } => {
            let folder = folders
                .create(&name, parent.as_deref())
                .await
                .ok_or_else(|| anyhow!("folder refused (limit, depth or unknown parent)"))?;
            print_json(pretty, &folder)
        }
        FoldersCommand::List => print_json(pretty, &folders.get_tree().await),
        FoldersCommand::Rename { id, name } => {
            if !folders.rename(&id, &name).await {
                bail!("rename failed");
            }
            Ok(())
        }
        FoldersCommand::Update { id, color, icon } => {
            if !folders.update(&id, color.as_deref(), icon.as_deref()).await {
                bail!("update failed");
            }
            Ok(())
        }
        FoldersCommand::Delete { id } => {
            let removed = rt.delete_folder_cascade(section, &id).await;
            if removed == 0 {
                bail!("no folder with id {id}");
            }
            print_json(pretty, &serde_json::json!({ "removedFolders": removed }))
        }
    }
}
