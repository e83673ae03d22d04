//! mcp-get CLI

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use mcp_get::browse::{format_choice, install_messages, render_details, uninstall_messages};
use mcp_get::paths::REGISTRY_ENV;
use mcp_get::resolver::resolve_one;
use mcp_get::{
    check_registry, BrowseMode, Browser, CommandRunner, ConfigPaths, ConfigStore, HttpTelemetry,
    Installer, NoopTelemetry, ProcessEnv, Prompter, Registry, ResolvedPackage, Resolver,
    RestartPolicy, SystemRunner, TelemetrySink, TerminalPrompter,
};

#[derive(Parser)]
#[command(name = "mcp-get")]
#[command(version, about = "Install and manage MCP servers for the Claude desktop app")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Registry directory (per-package files or package-list.json)
    #[arg(long, global = true, env = REGISTRY_ENV)]
    registry: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse all packages
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse installed packages
    Installed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Install a package
    Install {
        /// Package name (e.g. @modelcontextprotocol/server-brave-search)
        name: String,

        /// Don't offer to restart the Claude desktop app
        #[arg(long)]
        no_restart: bool,
    },

    /// Uninstall a package
    Uninstall {
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Don't offer to restart the Claude desktop app
        #[arg(long)]
        no_restart: bool,
    },

    /// Search the registry by name, description or vendor
    Search {
        query: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show details for a package
    Info {
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the registry for malformed or conflicting packages
    Validate,

    /// Show resolved paths (for debugging)
    Paths,
}

const EXIT_FAILED: u8 = 1;
const EXIT_NOT_FOUND: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Long-lived services shared by every command.
struct App<'a> {
    store: &'a ConfigStore,
    registry: &'a Registry,
    runner: &'a dyn CommandRunner,
    telemetry: &'a dyn TelemetrySink,
}

impl<'a> App<'a> {
    fn installer(&self, prompter: &'a mut dyn Prompter, restart: RestartPolicy) -> Installer<'a> {
        Installer::new(self.store, self.registry, prompter, self.runner)
            .with_telemetry(self.telemetry)
            .with_restart(restart)
    }

    fn resolver(&self) -> Resolver<'a> {
        Resolver::new(self.registry, self.store)
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut paths = ConfigPaths::resolve();
    if let Some(dir) = cli.registry {
        paths = paths.with_registry_dir(dir);
    }
    let registry = Registry::from_paths(&paths);
    let store = ConfigStore::new(paths);

    let telemetry: Box<dyn TelemetrySink> = match HttpTelemetry::from_env(&ProcessEnv) {
        Some(Ok(sink)) => Box::new(sink),
        Some(Err(e)) => {
            warn!(error = %e, "analytics disabled");
            Box::new(NoopTelemetry)
        }
        None => Box::new(NoopTelemetry),
    };
    let runner = SystemRunner::current();
    let mut prompter = TerminalPrompter::new();
    let app = App {
        store: &store,
        registry: &registry,
        runner: &runner,
        telemetry: telemetry.as_ref(),
    };

    match cli.command {
        Commands::Paths => {
            let paths = store.paths();
            println!("Config file:      {}", paths.config_path().display());
            println!("Preferences:      {}", paths.preferences_path().display());
            println!("Registry dir:     {}", registry.dir().display());
            println!("Package list:     {}", registry.package_list_path().display());
            println!("Config exists:    {}", paths.config_path().exists());
            println!("Registry files:   {}", registry.package_files().len());
        }
        Commands::List { json } => browse(&app, &mut prompter, BrowseMode::All, json)?,
        Commands::Installed { json } => {
            browse(&app, &mut prompter, BrowseMode::InstalledOnly, json)?
        }
        Commands::Search { query, json } => {
            let matches = registry.search_packages(&query);
            let config = store.read_config();
            let results: Vec<ResolvedPackage> = matches
                .iter()
                .filter_map(|p| resolve_one(&matches, &config, &p.name))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No packages found matching \"{query}\".");
            } else {
                print_table(&results, true);
            }
        }
        Commands::Info { name, json } => {
            let Some(pkg) = app.resolver().resolve_package(&name) else {
                eprintln!("Package {name} not found.");
                return Ok(ExitCode::from(EXIT_NOT_FOUND));
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&pkg)?);
            } else {
                print!("{}", render_details(&pkg));
            }
        }
        Commands::Install { name, no_restart } => {
            let config_path = store.config_path().display().to_string();
            let outcome = app
                .installer(&mut prompter, restart_policy(no_restart))
                .install_by_name(&name);
            match outcome {
                Ok(outcome) => {
                    for line in install_messages(&outcome, &config_path) {
                        println!("{line}");
                    }
                }
                Err(e) => {
                    eprintln!("Failed to install {name}: {e}");
                    return Ok(ExitCode::from(EXIT_FAILED));
                }
            }
        }
        Commands::Uninstall {
            name,
            yes,
            no_restart,
        } => {
            let Some(resolved) = app.resolver().resolve_package(&name) else {
                eprintln!("Package {name} not found.");
                return Ok(ExitCode::from(EXIT_NOT_FOUND));
            };
            let mut installer = app.installer(&mut prompter, restart_policy(no_restart));
            let outcome = if yes {
                installer.uninstall_resolved(&resolved)
            } else {
                installer.uninstall_resolved_with_confirmation(&resolved)
            }
            .with_context(|| format!("failed to uninstall {name}"))?;

            for line in uninstall_messages(&name, &outcome) {
                println!("{line}");
            }
        }
        Commands::Validate => {
            let report = check_registry(&registry);
            for problem in &report.problems {
                println!("{problem}");
            }
            if !report.is_ok() {
                println!(
                    "{} problem(s) in {} package(s)",
                    report.problems.len(),
                    report.checked
                );
                return Ok(ExitCode::from(EXIT_FAILED));
            }
            println!("Checked {} package(s), no problems found.", report.checked);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Interactive browse on a terminal, a plain listing otherwise.
fn browse<'a>(
    app: &App<'a>,
    prompter: &'a mut dyn Prompter,
    mode: BrowseMode,
    json: bool,
) -> Result<()> {
    if !json && console::Term::stdout().is_term() {
        let mut browser = Browser::new(app.installer(prompter, RestartPolicy::Prompt), mode);
        browser.run()?;
        return Ok(());
    }

    let mut packages = app.resolver().resolve_packages();
    if mode == BrowseMode::InstalledOnly {
        packages.retain(|p| p.is_installed);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
    } else if packages.is_empty() {
        match mode {
            BrowseMode::All => println!("No packages found in the registry."),
            BrowseMode::InstalledOnly => println!("No MCP servers are currently installed."),
        }
    } else {
        print_table(&packages, mode == BrowseMode::All);
    }
    Ok(())
}

fn restart_policy(no_restart: bool) -> RestartPolicy {
    if no_restart {
        RestartPolicy::Skip
    } else {
        RestartPolicy::Prompt
    }
}

fn print_table(packages: &[ResolvedPackage], show_status: bool) {
    for pkg in packages {
        println!("{}", format_choice(pkg, show_status));
    }
    println!();
    println!("{} package(s)", packages.len());
}
