use anyhow::{Context, Result};
use branchline_application::Branchline;
use branchline_infrastructure::ConfigService;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "branchline")]
#[command(about = "Branchline - phantom overlays, forks and navigation for remote conversation trees", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the overlay view of a conversation
    View {
        conversation_id: String,
        /// Print the raw JSON instead of the tree outline
        #[arg(long)]
        json: bool,
    },
    /// Show the deepest leaf without moving the current leaf
    Deepest {
        conversation_id: String,
        /// Start below this message instead of the root
        #[arg(long)]
        from: Option<String>,
    },
    /// Select the deepest leaf of the whole conversation
    GotoDeepest { conversation_id: String },
    /// Select the deepest leaf below a message
    GotoLeaf {
        conversation_id: String,
        message_id: String,
    },
    /// Fork the history up to a message into a new conversation
    Fork {
        conversation_id: String,
        message_id: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// Manage phantom messages
    Phantoms {
        #[command(subcommand)]
        action: PhantomsAction,
    },
    /// Manage named bookmarks
    Bookmark {
        #[command(subcommand)]
        action: BookmarkAction,
    },
}

#[derive(Subcommand)]
enum PhantomsAction {
    /// Replace the phantoms of a conversation
    Set {
        conversation_id: String,
        /// JSON file holding an array of message objects
        #[arg(long, conflicts_with = "texts")]
        file: Option<std::path::PathBuf>,
        /// Message texts, alternating human and assistant
        texts: Vec<String>,
    },
    /// Remove the phantoms of a conversation
    Clear { conversation_id: String },
    /// Print the stored phantoms of a conversation
    Show { conversation_id: String },
    /// Move phantoms stored under the legacy key scheme
    Migrate {
        /// Only this conversation (all legacy entries if omitted)
        conversation_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum BookmarkAction {
    Add {
        conversation_id: String,
        name: String,
        message_id: String,
    },
    Remove {
        conversation_id: String,
        name: String,
    },
    List { conversation_id: String },
    /// Select the deepest leaf below a bookmarked message
    Go {
        conversation_id: String,
        name: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = ConfigService::new()?
        .get_config()
        .context("Failed to load configuration")?;
    let app = Branchline::from_config(&config)?;

    match cli.command {
        Commands::View {
            conversation_id,
            json,
        } => commands::view::run(&app, &conversation_id, json).await?,
        Commands::Deepest {
            conversation_id,
            from,
        } => commands::navigate::deepest(&app, &conversation_id, from.as_deref()).await?,
        Commands::GotoDeepest { conversation_id } => {
            commands::navigate::goto_deepest(&app, &conversation_id).await?
        }
        Commands::GotoLeaf {
            conversation_id,
            message_id,
        } => commands::navigate::goto_leaf(&app, &conversation_id, &message_id).await?,
        Commands::Fork {
            conversation_id,
            message_id,
            model,
        } => commands::fork::run(&app, &conversation_id, &message_id, model.as_deref()).await?,
        Commands::Phantoms { action } => match action {
            PhantomsAction::Set {
                conversation_id,
                file,
                texts,
            } => commands::phantoms::set(&app, &conversation_id, file.as_deref(), texts).await?,
            PhantomsAction::Clear { conversation_id } => {
                commands::phantoms::clear(&app, &conversation_id).await?
            }
            PhantomsAction::Show { conversation_id } => {
                commands::phantoms::show(&app, &conversation_id).await?
            }
            PhantomsAction::Migrate { conversation_id } => {
                commands::phantoms::migrate(&app, conversation_id.as_deref()).await?
            }
        },
        Commands::Bookmark { action } => match action {
            BookmarkAction::Add {
                conversation_id,
                name,
                message_id,
            } => commands::bookmark::add(&app, &conversation_id, &name, &message_id).await?,
            BookmarkAction::Remove {
                conversation_id,
                name,
            } => commands::bookmark::remove(&app, &conversation_id, &name).await?,
            BookmarkAction::List { conversation_id } => {
                commands::bookmark::list(&app, &conversation_id).await?
            }
            BookmarkAction::Go {
                conversation_id,
                name,
            } => commands::bookmark::go(&app, &conversation_id, &name).await?,
        },
    }

    Ok(())
}
