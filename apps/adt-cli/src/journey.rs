//! The `journey` subcommand: the CLI's thin wrapper around the Workflow
//! Engine. Each leaf command owns its `clap::Args` and a `run` method,
//! mirroring how the host runtime's own CLI dispatches leaf subcommands.

use std::io::Write;

use adt_core::config::CliOverrides;
use adt_core::workflow::{ModuleStatus, WorkflowState, WorkflowStatus};
use anyhow::{bail, Context};
use clap::{Args, Subcommand};

use crate::context::build_engine;

#[derive(Args)]
pub struct JourneyArgs {
    #[command(subcommand)]
    command: JourneyCommand,
}

impl JourneyArgs {
    /// # Errors
    ///
    /// Returns an error if the selected `journey` subcommand fails.
    pub fn run(&self, cli_overrides: CliOverrides) -> anyhow::Result<()> {
        self.command.run(cli_overrides)
    }
}

#[derive(Subcommand)]
enum JourneyCommand {
    Start(StartArgs),
    Resume(ResumeArgs),
    Continue(ContinueArgs),
    Status(StatusArgs),
    List(ListArgs),
    Cleanup(CleanupArgs),
}

impl JourneyCommand {
    fn run(&self, cli_overrides: CliOverrides) -> anyhow::Result<()> {
        match self {
            JourneyCommand::Start(args) => args.run(cli_overrides),
            JourneyCommand::Resume(args) => args.run(cli_overrides),
            JourneyCommand::Continue(args) => args.run(cli_overrides),
            JourneyCommand::Status(args) => args.run(cli_overrides),
            JourneyCommand::List(args) => args.run(cli_overrides),
            JourneyCommand::Cleanup(args) => args.run(cli_overrides),
        }
    }
}

#[derive(Args)]
pub struct StartArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    directory: String,
}

impl StartArgs {
    fn run(&self, cli_overrides: CliOverrides) -> anyhow::Result<()> {
        let engine = build_engine(cli_overrides)?;
        let workflow = engine
            .start_workflow(&self.name, &self.directory)
            .with_context(|| format!("starting workflow `{}`", self.name))?;
        print_status(&workflow);
        Ok(())
    }
}

#[derive(Args)]
pub struct ResumeArgs {
    #[arg(long)]
    name: String,
}

impl ResumeArgs {
    fn run(&self, cli_overrides: CliOverrides) -> anyhow::Result<()> {
        let engine = build_engine(cli_overrides)?;
        let workflow = engine
            .resume_workflow(&self.name)
            .with_context(|| format!("resuming workflow `{}`", self.name))?;
        print_status(&workflow);
        Ok(())
    }
}

#[derive(Args)]
pub struct ContinueArgs {
    #[arg(long)]
    name: String,
}

impl ContinueArgs {
    fn run(&self, cli_overrides: CliOverrides) -> anyhow::Result<()> {
        let engine = build_engine(cli_overrides)?;
        let mut workflow = engine
            .resume_workflow(&self.name)
            .with_context(|| format!("resuming workflow `{}`", self.name))?;
        let result = engine
            .execute_next(&mut workflow)
            .with_context(|| format!("executing next step for workflow `{}`", self.name))?;
        println!("{}", result.message);
        print_status(&workflow);
        Ok(())
    }
}

#[derive(Args)]
pub struct StatusArgs {
    #[arg(long)]
    name: Option<String>,
}

impl StatusArgs {
    fn run(&self, cli_overrides: CliOverrides) -> anyhow::Result<()> {
        let engine = build_engine(cli_overrides)?;
        match &self.name {
            Some(name) => {
                let workflow = engine
                    .resume_workflow(name)
                    .with_context(|| format!("loading workflow `{name}`"))?;
                print_status(&workflow);
            }
            None => {
                for name in engine.store().list_names() {
                    if let Ok(workflow) = engine.resume_workflow(&name) {
                        print_status(&workflow);
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct ListArgs;

impl ListArgs {
    fn run(&self, cli_overrides: CliOverrides) -> anyhow::Result<()> {
        let engine = build_engine(cli_overrides)?;
        for name in engine.store().list_names() {
            println!("{name}");
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct CleanupArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    completed: bool,
    #[arg(long)]
    all: bool,
    /// Skip the interactive confirmation prompt.
    #[arg(long)]
    yes: bool,
}

impl CleanupArgs {
    fn run(&self, cli_overrides: CliOverrides) -> anyhow::Result<()> {
        let selected = [self.name.is_some(), self.completed, self.all]
            .iter()
            .filter(|set| **set)
            .count();
        if selected != 1 {
            bail!("specify exactly one of --name, --completed, or --all");
        }

        let engine = build_engine(cli_overrides)?;
        let confirmed = self.yes || confirm_destructive()?;

        if let Some(name) = &self.name {
            engine
                .cleanup_workflow(name, confirmed)
                .with_context(|| format!("cleaning up workflow `{name}`"))?;
            println!("removed workflow `{name}`");
        } else if self.completed {
            let removed = engine.cleanup_completed(confirmed).context("cleaning up completed workflows")?;
            println!("removed {} completed workflow(s)", removed.len());
        } else {
            let mut removed = Vec::new();
            for name in engine.store().list_names() {
                engine
                    .cleanup_workflow(&name, confirmed)
                    .with_context(|| format!("cleaning up workflow `{name}`"))?;
                removed.push(name);
            }
            println!("removed {} workflow(s)", removed.len());
        }
        Ok(())
    }
}

fn confirm_destructive() -> anyhow::Result<bool> {
    print!("This will permanently delete workflow state. Continue? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_status(workflow: &WorkflowState) {
    let report = adt_core::progress::progress(workflow);
    println!(
        "{} [{}] {:.1}% ({}/{} modules completed)",
        workflow.name,
        status_label(workflow.status),
        report.completion_percentage,
        report.completed_modules,
        report.total_modules
    );
    if let Some(current) = &report.current_module {
        println!("  next: {current}");
    }
    for (module_name, state) in &workflow.modules {
        println!("  {module_name}: {}", module_status_label(state.status));
    }
}

fn status_label(status: WorkflowStatus) -> &'static str {
    match status {
        WorkflowStatus::Active => "active",
        WorkflowStatus::Completed => "completed",
        WorkflowStatus::Failed => "failed",
        WorkflowStatus::Archived => "archived",
    }
}

fn module_status_label(status: ModuleStatus) -> &'static str {
    match status {
        ModuleStatus::Pending => "pending",
        ModuleStatus::Running => "running",
        ModuleStatus::Completed => "completed",
        ModuleStatus::Failed => "failed",
    }
}
