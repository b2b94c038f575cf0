use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use crmlink::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List catalog products with resolved EUR/CHF prices
    Products {
        /// Show top-level parent products only
        #[arg(long)]
        parents: bool,
        /// Show products flagged as new only
        #[arg(long, conflicts_with = "parents")]
        new: bool,
    },
    /// Download a product image to disk
    Image {
        /// Product record id
        product_id: String,
        /// Output file (defaults to <product-id>.jpg)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List the store's currencies
    Currencies,
}

impl From<Commands> for crmlink::AppCommand {
    fn from(cmd: Commands) -> crmlink::AppCommand {
        match cmd {
            Commands::Products { parents, new } => crmlink::AppCommand::Products {
                parents,
                new_only: new,
            },
            Commands::Image { product_id, output } => {
                crmlink::AppCommand::Image { product_id, output }
            }
            Commands::Currencies => crmlink::AppCommand::Currencies,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => crmlink::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = crmlink::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
store:
  base_url: "http://localhost:8080"

download:
  block_size: 4194304
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
