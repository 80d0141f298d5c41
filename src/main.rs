//! pharc - packs a Phing checkout into a single self-executing `phing.phar`.
//!
//! - Own sources are added verbatim, vendored PHP is comment-stripped
//! - Line numbers inside stripped files are preserved
//! - The stub maps the archive by alias and boots the packaged runtime

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pharc::config::Config;
use pharc::logging;

#[derive(Parser)]
#[command(name = "pharc")]
#[command(about = "Phing phar compiler")]
#[command(
    after_help = "QUICK START:\n  pharc preflight       Check the project layout\n  pharc build           Write phing.phar\n  pharc verify FILE     Check an archive's signature\n  pharc list FILE       List archive entries"
)]
struct Cli {
    /// Log every added file
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project directory (default: PHARC_ROOT or the current directory)
    #[arg(short = 'C', long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the project into a phar
    Build {
        /// Output path (default: PHARC_OUTPUT or <root>/phing.phar)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that every input exists before building
    Preflight {
        /// Exit with an error if any check fails
        #[arg(long)]
        strict: bool,
    },

    /// Print a PHP file with comments and whitespace stripped
    Strip {
        file: PathBuf,
    },

    /// List the entries of a phar
    List {
        phar: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Verify a phar's signature and entry checksums
    Verify {
        phar: PathBuf,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
    /// Print the generated stub
    Stub,
    /// Show whether the stub would enable the colour logger here
    Terminal,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let base_dir = std::env::current_dir()?;
    let mut config = Config::load(&base_dir)?;
    if let Some(root) = cli.root {
        let root = base_dir.join(root);
        if config.output == config.project_root.join(pharc::layout::DEFAULT_ALIAS) {
            config.output = root.join(pharc::layout::DEFAULT_ALIAS);
        }
        config.project_root = root;
    }

    match cli.command {
        Commands::Build { output } => {
            commands::cmd_build(&config, output.as_deref())?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&config, strict)?;
        }

        Commands::Strip { file } => {
            commands::cmd_strip(&file)?;
        }

        Commands::List { phar, json } => {
            commands::cmd_list(&phar, json)?;
        }

        Commands::Verify { phar } => {
            commands::cmd_verify(&phar)?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Stub => commands::show::ShowTarget::Stub,
                ShowTarget::Terminal => commands::show::ShowTarget::Terminal,
            };
            commands::cmd_show(show_target, &config)?;
        }
    }

    Ok(())
}
