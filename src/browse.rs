//! Interactive browsing of resolved packages.
//!
//! The "pick a package, show it, act on it, show it again" loop is an
//! explicit state machine: [`BrowseState`] plus [`transition`]. Every prompt
//! is a point where the user can back out, and escaping one never recurses.

use std::io::{self, Write};

use console::{pad_str, style, Alignment};
use tracing::{debug, warn};

use crate::install::{InstallError, InstallOutcome, Installer, RestartStatus, UninstallOutcome};
use crate::models::ResolvedPackage;
use crate::prompt::PromptError;

/// Which packages the list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseMode {
    All,
    InstalledOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailAction {
    Install,
    Uninstall,
    Open,
    Back,
    Exit,
}

impl DetailAction {
    pub fn label(&self) -> &'static str {
        match self {
            DetailAction::Install => "Install package",
            DetailAction::Uninstall => "Uninstall package",
            DetailAction::Open => "Open source URL",
            DetailAction::Back => "Back to package list",
            DetailAction::Exit => "Exit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseState {
    List,
    /// Showing one package, by resolved name.
    Detail(String),
    Done,
}

/// Actions offered for a package.
pub fn available_actions(pkg: &ResolvedPackage) -> Vec<DetailAction> {
    let mut actions = Vec::with_capacity(4);
    if pkg.is_installed {
        actions.push(DetailAction::Uninstall);
    } else {
        actions.push(DetailAction::Install);
    }
    if !pkg.package.source_url.is_empty() {
        actions.push(DetailAction::Open);
    }
    actions.push(DetailAction::Back);
    actions.push(DetailAction::Exit);
    actions
}

/// Next state after `action` was carried out in `state`.
pub fn transition(state: &BrowseState, action: DetailAction) -> BrowseState {
    match (state, action) {
        (_, DetailAction::Exit) => BrowseState::Done,
        (BrowseState::Detail(_), DetailAction::Back) => BrowseState::List,
        (BrowseState::Detail(name), _) => BrowseState::Detail(name.clone()),
        (other, _) => other.clone(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error(transparent)]
    Install(#[from] InstallError),
    #[error("prompt failed: {0}")]
    Prompt(#[source] io::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl From<PromptError> for BrowseError {
    fn from(e: PromptError) -> Self {
        match e {
            PromptError::Cancelled => {
                BrowseError::Prompt(io::Error::new(io::ErrorKind::Interrupted, "cancelled"))
            }
            PromptError::Terminal(io) => BrowseError::Prompt(io),
        }
    }
}

/// Runs the browse loop on top of an [`Installer`].
pub struct Browser<'a, W: Write = io::Stdout> {
    installer: Installer<'a>,
    mode: BrowseMode,
    writer: W,
}

impl<'a> Browser<'a, io::Stdout> {
    pub fn new(installer: Installer<'a>, mode: BrowseMode) -> Self {
        Self::with_writer(installer, mode, io::stdout())
    }
}

impl<'a, W: Write> Browser<'a, W> {
    pub fn with_writer(installer: Installer<'a>, mode: BrowseMode, writer: W) -> Self {
        Self {
            installer,
            mode,
            writer,
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    pub fn run(&mut self) -> Result<(), BrowseError> {
        let mut state = BrowseState::List;
        loop {
            debug!(?state, "browse");
            state = match state {
                BrowseState::Done => return Ok(()),
                BrowseState::List => self.select_package()?,
                BrowseState::Detail(name) => self.show_detail(&name)?,
            };
        }
    }

    fn packages(&self) -> Vec<ResolvedPackage> {
        let all = self.installer.resolver().resolve_packages();
        match self.mode {
            BrowseMode::All => all,
            BrowseMode::InstalledOnly => all.into_iter().filter(|p| p.is_installed).collect(),
        }
    }

    fn select_package(&mut self) -> Result<BrowseState, BrowseError> {
        let packages = self.packages();
        if packages.is_empty() {
            let msg = match self.mode {
                BrowseMode::All => "No packages found in the registry.",
                BrowseMode::InstalledOnly => "No MCP servers are currently installed.",
            };
            writeln!(self.writer, "{}", style(msg).yellow())?;
            return Ok(BrowseState::Done);
        }

        writeln!(self.writer, "{}", list_header(packages.len(), self.mode))?;
        let show_status = self.mode == BrowseMode::All;
        let items: Vec<String> = packages.iter().map(|p| format_choice(p, show_status)).collect();

        match self
            .installer
            .prompter()
            .select("Search and select a package:", &items, 0)
        {
            Ok(i) => Ok(BrowseState::Detail(packages[i].name().to_string())),
            Err(PromptError::Cancelled) => Ok(BrowseState::Done),
            Err(e) => Err(e.into()),
        }
    }

    fn show_detail(&mut self, name: &str) -> Result<BrowseState, BrowseError> {
        let Some(pkg) = self.installer.resolver().resolve_package(name) else {
            debug!(package = name, "package no longer resolves");
            return Ok(BrowseState::List);
        };
        if self.mode == BrowseMode::InstalledOnly && !pkg.is_installed {
            return Ok(BrowseState::List);
        }

        write!(self.writer, "{}", render_details(&pkg))?;
        let actions = available_actions(&pkg);
        let labels: Vec<String> = actions.iter().map(|a| a.label().to_string()).collect();
        let action = match self
            .installer
            .prompter()
            .select("What would you like to do?", &labels, 0)
        {
            Ok(i) => actions[i],
            Err(PromptError::Cancelled) => DetailAction::Back,
            Err(e) => return Err(e.into()),
        };

        self.perform(&pkg, action)?;
        Ok(transition(&BrowseState::Detail(name.to_string()), action))
    }

    fn perform(&mut self, pkg: &ResolvedPackage, action: DetailAction) -> Result<(), BrowseError> {
        match action {
            DetailAction::Install => {
                writeln!(
                    self.writer,
                    "{}",
                    style(format!("Preparing to install {}...", pkg.name())).cyan()
                )?;
                let config_path = self.installer.config_path().display().to_string();
                let outcome = self.installer.install(&pkg.package)?;
                for line in install_messages(&outcome, &config_path) {
                    writeln!(self.writer, "{line}")?;
                }
            }
            DetailAction::Uninstall => {
                let outcome = self.installer.uninstall_resolved_with_confirmation(pkg)?;
                for line in uninstall_messages(pkg.name(), &outcome) {
                    writeln!(self.writer, "{line}")?;
                }
            }
            DetailAction::Open => {
                let url = &pkg.package.source_url;
                if url.is_empty() {
                    writeln!(self.writer, "No source URL available for this package")?;
                } else {
                    match self.installer.runner().open_url(url) {
                        Ok(()) => writeln!(self.writer, "Opened {url} in your browser")?,
                        Err(e) => {
                            warn!(error = %e, "failed to open url");
                            writeln!(self.writer, "Could not open {url}: {e}")?;
                        }
                    }
                }
            }
            DetailAction::Back | DetailAction::Exit => {}
        }
        Ok(())
    }
}

/// One line per package for the selection list.
pub fn format_choice(pkg: &ResolvedPackage, show_status: bool) -> String {
    let (prefix, name_width) = if show_status {
        (if pkg.is_installed { "✓ " } else { "  " }, 22)
    } else {
        ("", 24)
    };
    let description = &pkg.package.description;
    let description = if description.chars().count() > 47 {
        format!("{}...", description.chars().take(44).collect::<String>())
    } else {
        description.clone()
    };
    format!(
        "{prefix}{:<name_width$} │ {:<49} │ {:<19} │ {:<14}",
        pkg.name(),
        description,
        pkg.package.vendor,
        pkg.package.license
    )
}

fn list_header(count: usize, mode: BrowseMode) -> String {
    let (title, qualifier) = match mode {
        BrowseMode::All => ("Available Packages", ""),
        BrowseMode::InstalledOnly => ("Installed Packages", "installed "),
    };
    format!(
        "\n{}\n{}\n",
        style(format!("📦 {title}")).bold().cyan(),
        style(format!("Found {count} {qualifier}packages")).dim()
    )
}

/// Boxed detail view of one package.
pub fn render_details(pkg: &ResolvedPackage) -> String {
    const BOX_WIDTH: usize = 80;
    const LABEL_WIDTH: usize = 13;
    let inner = BOX_WIDTH - 2;
    let rule = "─".repeat(inner);
    let fit = |s: &str| pad_str(s, inner, Alignment::Left, Some("…")).into_owned();

    let status = match (pkg.is_installed, pkg.is_verified) {
        (true, true) => "Installed",
        (true, false) => "Installed (unverified)",
        (false, _) => "Not installed",
    };
    let runtime = pkg.runtime().to_string();
    let rows = [
        ("Description", pkg.package.description.as_str()),
        ("Vendor", pkg.package.vendor.as_str()),
        ("License", pkg.package.license.as_str()),
        ("Runtime", runtime.as_str()),
        ("Homepage", pkg.package.homepage.as_str()),
        ("Source", pkg.package.source_url.as_str()),
        ("Status", status),
    ];

    let mut out = String::new();
    out.push_str(&format!("{}\n", style(format!("┌{rule}┐")).dim()));
    out.push_str(&format!(
        "{}{}{}\n",
        style("│").dim(),
        style(fit(&format!("  {}", pkg.name()))).bold().green(),
        style("│").dim()
    ));
    out.push_str(&format!("{}\n", style(format!("├{rule}┤")).dim()));
    for (label, value) in rows.iter().filter(|(_, v)| !v.is_empty()) {
        let line = format!("  {:<LABEL_WIDTH$}{value}", format!("{label}:"));
        out.push_str(&format!("{}{}{}\n", style("│").dim(), fit(&line), style("│").dim()));
    }
    out.push_str(&format!("{}\n\n", style(format!("└{rule}┘")).dim()));
    out
}

/// User-facing lines for an install outcome.
pub fn install_messages(outcome: &InstallOutcome, config_path: &str) -> Vec<String> {
    match outcome {
        InstallOutcome::Cancelled { .. } => vec!["Installation cancelled.".to_string()],
        InstallOutcome::Installed(report) => {
            let mut lines = vec![
                "Updated Claude desktop configuration".to_string(),
                format!("Installed {}", report.package),
            ];
            if !report.missing_required.is_empty() {
                lines.push(format!(
                    "Note: Some required environment variables are not configured: {}",
                    report.missing_required.join(", ")
                ));
                lines.push("You can set them later by editing the config file at:".to_string());
                lines.push(config_path.to_string());
            }
            if let Some(launcher) = report.launcher_missing {
                lines.push(format!(
                    "Warning: `{launcher}` was not found. Install uv from https://astral.sh/uv before using this server."
                ));
            }
            lines.extend(restart_message(&report.restart));
            lines
        }
    }
}

/// User-facing lines for an uninstall outcome.
pub fn uninstall_messages(name: &str, outcome: &UninstallOutcome) -> Vec<String> {
    match outcome {
        UninstallOutcome::Uninstalled { restart, .. } => {
            let mut lines = vec![format!("Successfully uninstalled {name}")];
            lines.extend(restart_message(restart));
            lines
        }
        UninstallOutcome::NotInstalled => vec![format!("Package {name} is not installed.")],
        UninstallOutcome::Cancelled => vec!["Uninstallation cancelled.".to_string()],
    }
}

fn restart_message(restart: &RestartStatus) -> Option<String> {
    match restart {
        RestartStatus::Restarted => Some("Claude desktop app has been restarted.".to_string()),
        RestartStatus::Failed(reason) => Some(format!("Failed to restart Claude desktop app: {reason}")),
        RestartStatus::NotRequested => {
            Some("Note: Please restart Claude for the changes to take effect.".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Package, Runtime};

    fn resolved(installed: bool, source_url: &str) -> ResolvedPackage {
        ResolvedPackage {
            package: Package {
                name: "pkg-a".into(),
                description: "A package".into(),
                source_url: source_url.into(),
                runtime: Some(Runtime::Node),
                ..Default::default()
            },
            is_installed: installed,
            is_verified: true,
            server_key: installed.then(|| "pkg-a".to_string()),
        }
    }

    #[test]
    fn actions_depend_on_install_state_and_url() {
        assert_eq!(
            available_actions(&resolved(false, "https://example.com")),
            vec![
                DetailAction::Install,
                DetailAction::Open,
                DetailAction::Back,
                DetailAction::Exit
            ]
        );
        assert_eq!(
            available_actions(&resolved(true, "")),
            vec![DetailAction::Uninstall, DetailAction::Back, DetailAction::Exit]
        );
    }

    #[test]
    fn transition_table() {
        let detail = BrowseState::Detail("pkg-a".into());
        assert_eq!(transition(&detail, DetailAction::Back), BrowseState::List);
        assert_eq!(transition(&detail, DetailAction::Exit), BrowseState::Done);
        assert_eq!(transition(&detail, DetailAction::Install), detail);
        assert_eq!(transition(&detail, DetailAction::Uninstall), detail);
        assert_eq!(transition(&detail, DetailAction::Open), detail);
        assert_eq!(transition(&BrowseState::List, DetailAction::Exit), BrowseState::Done);
        assert_eq!(transition(&BrowseState::Done, DetailAction::Back), BrowseState::Done);
    }

    #[test]
    fn choice_truncates_long_descriptions() {
        let mut pkg = resolved(true, "");
        pkg.package.description = "x".repeat(60);
        let line = format_choice(&pkg, true);
        assert!(line.starts_with("✓ pkg-a"));
        assert!(line.contains(&format!("{}...", "x".repeat(44))));
    }

    #[test]
    fn details_skip_empty_fields() {
        let text = render_details(&resolved(false, ""));
        assert!(text.contains("pkg-a"));
        assert!(text.contains("Description:"));
        assert!(!text.contains("Source:"));
        assert!(text.contains("Not installed"));
    }

    #[test]
    fn outcome_categories_read_differently() {
        let cancelled = install_messages(
            &InstallOutcome::Cancelled {
                stage: crate::install::InstallStage::CollectingEnvVars,
            },
            "/cfg",
        );
        let not_installed = uninstall_messages("pkg-a", &UninstallOutcome::NotInstalled);
        assert_eq!(cancelled, vec!["Installation cancelled.".to_string()]);
        assert_eq!(not_installed, vec!["Package pkg-a is not installed.".to_string()]);
    }
}
