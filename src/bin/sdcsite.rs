// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use sdcsite::{
    config::Config,
    path::default_config_path,
    reconcile::{plan_memberships, GroupPlan},
    records::read_records,
    site::render,
    system::{CommandExecutor, SnapshotProvider},
    Mode, Roster, SiteMaker,
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use inquire::Confirm;
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "sdcsite [options] <sdcsite-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config = load_config(self.config)?;
        match self.command {
            Command::Make(opts) => run_make(config, opts),
            Command::Check(opts) => run_check(opts),
            Command::Plan(opts) => run_plan(config, opts),
            Command::Render(opts) => run_render(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Reconcile groups, provision directories, and write the index page.
    #[command(override_usage = "sdcsite make [options] --csv-file <csv_file>")]
    Make(MakeOptions),

    /// Validate roster file.
    #[command(override_usage = "sdcsite check --csv-file <csv_file>")]
    Check(RosterOptions),

    /// Show group and membership plans without changing anything.
    #[command(override_usage = "sdcsite plan --csv-file <csv_file>")]
    Plan(RosterOptions),

    /// Print generated index page to stdout.
    #[command(override_usage = "sdcsite render --csv-file <csv_file>")]
    Render(RosterOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RosterOptions {
    /// Roster file to read students and projects from.
    #[arg(short, long, value_name = "csv_file")]
    pub csv_file: PathBuf,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct MakeOptions {
    /// Roster file to read students and projects from.
    #[arg(short, long, value_name = "csv_file")]
    pub csv_file: PathBuf,

    /// Base directory of the site (web root).
    #[arg(short, long, value_name = "directory")]
    pub directory: Option<PathBuf>,

    /// Test mode. Report what would be done without doing it.
    #[arg(short, long)]
    pub test: bool,

    /// Do not ask for confirmation before changing anything.
    #[arg(short, long)]
    pub yes: bool,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let (path, explicit) = match path {
        Some(path) => (path, true),
        None => match default_config_path() {
            Ok(path) => (path, false),
            Err(_) => return Ok(Config::default()),
        },
    };

    if !explicit && !path.exists() {
        return Ok(Config::default());
    }

    let data = read_to_string(&path)
        .with_context(|| format!("failed to read configuration at {:?}", path.display()))?;
    let config = data
        .parse()
        .with_context(|| format!("invalid configuration at {:?}", path.display()))?;
    info!("loaded configuration from {:?}", path.display());

    Ok(config)
}

fn load_roster(csv_file: &Path) -> Result<Roster> {
    let rows = read_records(csv_file)?;
    Ok(Roster::from_rows(rows)?)
}

fn run_make(config: Config, opts: MakeOptions) -> Result<()> {
    let root = opts
        .directory
        .or_else(|| config.site.root.clone())
        .ok_or_else(|| anyhow!("no directory specified"))?;
    let mode = Mode::from_dry_run(opts.test);
    let roster = load_roster(&opts.csv_file)?;
    let snapshot = config.account_database().snapshot()?;

    if !mode.is_dry_run() && !opts.yes {
        let proceed = Confirm::new(&format!(
            "apply roster {:?} to {:?}?",
            opts.csv_file.display(),
            root.display()
        ))
        .with_default(false)
        .prompt()?;

        if !proceed {
            warn!("aborted, nothing was changed");
            return Ok(());
        }
    }

    let maker = SiteMaker::new(
        roster,
        snapshot,
        root,
        config.admin(),
        mode,
        CommandExecutor::new(),
    );
    maker.make()?;

    Ok(())
}

fn run_check(opts: RosterOptions) -> Result<()> {
    let roster = load_roster(&opts.csv_file)?;
    info!(
        "{} students and {} projects",
        roster.students().len(),
        roster.projects().len()
    );
    for term in roster.chronology() {
        info!(
            "{term}: {} students, {} projects",
            roster.students_in(*term).count(),
            roster.projects_in(*term).count()
        );
    }

    Ok(())
}

fn run_plan(config: Config, opts: RosterOptions) -> Result<()> {
    let roster = load_roster(&opts.csv_file)?;
    let snapshot = config.account_database().snapshot()?;

    let groups = GroupPlan::from_roster(&roster, &snapshot);
    for group in &groups.to_remove {
        info!("remove group {group}");
    }
    for group in &groups.to_add {
        info!("missing group {group} (not created)");
    }

    for plan in plan_memberships(&roster, &snapshot) {
        if plan.is_unchanged() {
            continue;
        }
        info!(
            "{}: add {:?}, remove {:?} (not applied)",
            plan.user_name, plan.to_add, plan.to_remove
        );
    }

    Ok(())
}

fn run_render(opts: RosterOptions) -> Result<()> {
    let roster = load_roster(&opts.csv_file)?;
    print!("{}", render(&roster).html);

    Ok(())
}
