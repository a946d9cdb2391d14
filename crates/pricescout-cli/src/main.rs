//! pricescout: entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod config;
mod render;
mod search_cmd;

use pricescout::SortMode;
use search_cmd::SearchArgs;

#[derive(Parser)]
#[command(
    name = "pricescout",
    about = "pricescout: find the lowest marketplace price and see where your listing stands",
    version,
    after_help = "Run 'pricescout <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress the progress spinner
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the lowest-priced listing for a product
    Search {
        /// Product to search for
        term: String,

        /// Storefront region (UK, US, DE, FR, AU, CA). Unknown codes use UK.
        #[arg(long, short, default_value = "UK")]
        region: String,

        /// Seller name to look for among the results
        #[arg(long, short)]
        store: Option<String>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// How results are sorted by price (url, dropdown, auto)
        #[arg(long, default_value = "url")]
        sort: SortMode,

        /// Directory for saved browser sessions.
        /// Also reads PRICESCOUT_SESSION_DIR.
        #[arg(long)]
        session_dir: Option<String>,

        /// Chromium binary to launch.
        /// Also reads PRICESCOUT_CHROMIUM_PATH.
        #[arg(long)]
        chromium: Option<String>,

        /// How many result cards to scan for the store
        #[arg(long)]
        scan_limit: Option<usize>,
    },

    /// List the supported storefront regions
    Regions,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   pricescout completions bash > ~/.local/share/bash-completion/completions/pricescout
    ///   pricescout completions zsh > ~/.zfunc/_pricescout
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn init_logging(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json);

    match cli.command {
        Commands::Search {
            term,
            region,
            store,
            headless,
            sort,
            session_dir,
            chromium,
            scan_limit,
        } => {
            let config =
                config::build_config(session_dir.as_deref(), chromium.as_deref(), sort, scan_limit);
            let args = SearchArgs {
                term,
                region,
                store,
                headless,
                json: cli.json,
                quiet: cli.quiet,
            };
            if !search_cmd::run(args, config).await? {
                std::process::exit(1);
            }
        }

        Commands::Regions => {
            print!("{}", render::render_regions(cli.json)?);
            if cli.json {
                println!();
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "pricescout", &mut std::io::stdout());
        }
    }

    Ok(())
}
