mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::EXIT_FAILURE;
use pkgplan_core::{install_signal_handler, ToolSelection};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "pkgplan",
    version,
    about = "Declarative, profile-driven package installer"
)]
struct Cli {
    /// Path to the package manifest (YAML or TOML).
    #[arg(
        long,
        env = "PKGPLAN_MANIFEST",
        default_value = "~/.dev/packages.yaml",
        global = true
    )]
    manifest: String,

    /// Profile selecting which packages to install.
    #[arg(long, env = "DOTFILES_PROFILE", default_value = "personal", global = true)]
    profile: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging and per-package detection details.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve the profile's packages and install the missing ones.
    Install {
        /// Print the plan without installing anything.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Only consider this source.
        #[arg(long)]
        source: Option<String>,
        /// Extra attempts for a failed install command.
        #[arg(long, default_value_t = 0)]
        retries: u32,
        /// Do not pass a GitHub token to install commands.
        #[arg(long, default_value_t = false)]
        no_github_token: bool,
    },
    /// Show what `install` would do (same as `install --dry-run`).
    Plan {
        /// Only consider this source.
        #[arg(long)]
        source: Option<String>,
    },
    /// List profiles and their source preference for this OS.
    Profiles,
    /// Probe the profile's sources and show their detection strategy.
    Sources,
    /// Install tools from the legacy tools.toml lists.
    Tools {
        /// Install cargo packages.
        #[arg(long, default_value_t = false)]
        cargo: bool,
        /// Install Go packages.
        #[arg(long, default_value_t = false)]
        go: bool,
        /// Install Python tools with uv.
        #[arg(long, default_value_t = false)]
        python: bool,
        /// Install every group.
        #[arg(long, default_value_t = false)]
        all: bool,
        /// Path to tools.toml.
        #[arg(long, default_value = "~/.dev/tools.toml")]
        tools_manifest: String,
        /// Extra attempts for a failed install command.
        #[arg(long, default_value_t = 0)]
        retries: u32,
        /// Do not pass a GitHub token to install commands.
        #[arg(long, default_value_t = false)]
        no_github_token: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PKGPLAN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    let manifest_path = expand_tilde(&cli.manifest);
    let output = commands::Output {
        json: cli.json,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Install {
            dry_run,
            source,
            retries,
            no_github_token,
        } => commands::install::run(
            &manifest_path,
            &commands::install::InstallArgs {
                profile: &cli.profile,
                source: source.as_deref(),
                dry_run,
                retries,
                github_token: !no_github_token,
            },
            output,
        ),
        Commands::Plan { source } => commands::install::run(
            &manifest_path,
            &commands::install::InstallArgs {
                profile: &cli.profile,
                source: source.as_deref(),
                dry_run: true,
                retries: 0,
                github_token: false,
            },
            output,
        ),
        Commands::Profiles => commands::profiles::run(&manifest_path, &cli.profile, output),
        Commands::Sources => commands::sources::run(&manifest_path, &cli.profile, output),
        Commands::Tools {
            cargo,
            go,
            python,
            all,
            tools_manifest,
            retries,
            no_github_token,
        } => {
            let selection = if all {
                ToolSelection::all()
            } else {
                ToolSelection { cargo, go, python }
            };
            commands::tools::run(
                &expand_tilde(&tools_manifest),
                selection,
                retries,
                !no_github_token,
                output,
            )
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
