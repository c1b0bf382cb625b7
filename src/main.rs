use anyhow::Result;
use clap::Parser;
use pkgshim::commands::{self, Config, UpgradeOptions};
use pkgshim::runtime::RealRuntime;
use std::path::PathBuf;

/// pkgshim - package archive compatibility shim
///
/// Reads the installed and archive package snapshots, whatever descriptor
/// format they were written in, and lists, compares and upgrades packages.
///
/// Examples:
///   pkgshim outdated        # Show packages with a newer version available
///   pkgshim upgrade -y      # Upgrade all of them without asking
#[derive(Parser, Debug)]
#[command(author, version = env!("PKGSHIM_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (also via PKGSHIM_ROOT; defaults to the user data directory)
    #[arg(
        long = "root",
        short = 'r',
        env = "PKGSHIM_ROOT",
        value_name = "PATH",
        global = true
    )]
    root: Option<PathBuf>,

    /// Installed snapshot file (defaults to <root>/installed.json)
    #[arg(long, value_name = "PATH", global = true)]
    installed: Option<PathBuf>,

    /// Archive snapshot file (defaults to <root>/archive-contents.json)
    #[arg(long, value_name = "PATH", global = true)]
    available: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List installed packages
    List(ListArgs),

    /// Show details for a package
    Show(ShowArgs),

    /// List installed packages that have a newer version available
    Outdated,

    /// Upgrade installed packages
    Upgrade(UpgradeArgs),
}

#[derive(clap::Args, Debug)]
struct ListArgs {
    /// List the archive's packages instead of installed ones
    #[arg(long = "archive", short = 'a')]
    from_archive: bool,
}

#[derive(clap::Args, Debug)]
struct ShowArgs {
    /// Package name
    name: String,
}

#[derive(clap::Args, Debug)]
struct UpgradeArgs {
    /// Packages to upgrade (all when omitted)
    #[arg(value_name = "NAME")]
    names: Vec<String>,

    /// Keep the superseded versions installed
    #[arg(long)]
    keep_old: bool,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    yes: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;
    let config = Config::new(&runtime, cli.root, cli.installed, cli.available)?;

    match cli.command {
        Commands::List(args) => commands::list(&runtime, &config, args.from_archive)?,
        Commands::Show(args) => commands::show(&runtime, &config, &args.name)?,
        Commands::Outdated => commands::outdated(&runtime, &config)?,
        Commands::Upgrade(args) => commands::upgrade(
            &runtime,
            &config,
            args.names,
            UpgradeOptions {
                yes: args.yes,
                keep_old: args.keep_old,
            },
        )?,
    }
    Ok(())
}
