//! cli::commands::status
//!
//! Read-only and configuration verbs: `get_summary`, `print_status`,
//! `get_config`, `set_config`, `get_bad_states`, `check_state`, and shell
//! completion generation.

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::args::Cli;
use crate::cli::{open_engine, Ctx};
use crate::ui::output::{self, format_status_tree};

pub fn get_summary(ctx: &Ctx) -> Result<()> {
    let engine = open_engine(ctx)?;
    let head_id = engine.state().head_id.clone();
    let commit = engine.get_summary(&head_id)?;
    output::print(
        format!(
            "{} {} \"{}\" ({} snapshot(s))",
            commit.id,
            commit.hash.short(7),
            commit.description,
            commit.snapshots.len()
        ),
        ctx.verbosity,
    );
    Ok(())
}

pub fn print_status(ctx: &Ctx, full: bool) -> Result<()> {
    let engine = open_engine(ctx)?;
    output::print(format_status_tree(engine.state(), full), ctx.verbosity);
    Ok(())
}

pub fn get_config(ctx: &Ctx) -> Result<()> {
    let engine = open_engine(ctx)?;
    let config = &engine.state().config;
    output::print(
        format!(
            "remote_branch_prefix = {}\nrandomize_branches = {}\nverbose = {}\ncheck_commits_on_status = {}",
            config.remote_branch_prefix,
            config.randomize_branches,
            config.verbose,
            config.check_commits_on_status,
        ),
        ctx.verbosity,
    );
    Ok(())
}

pub fn set_config(ctx: &Ctx, key: &str, value: &str) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    engine.set_config(key, value)?;
    output::success(format!("{key} = {value}"), ctx.verbosity);
    Ok(())
}

pub fn get_bad_states(ctx: &Ctx) -> Result<()> {
    let engine = open_engine(ctx)?;
    let bad = engine.get_bad_states();
    if bad.is_empty() {
        output::success("no bad states found", ctx.verbosity);
        return Ok(());
    }
    for state in bad {
        match state.commit_id {
            Some(id) => output::warn(format!("{id}: {}", state.message), ctx.verbosity),
            None => output::warn(state.message, ctx.verbosity),
        }
    }
    Ok(())
}

pub fn check_state(ctx: &Ctx) -> Result<()> {
    let engine = open_engine(ctx)?;
    engine.check_state()?;
    output::success("state is clean", ctx.verbosity);
    Ok(())
}

pub fn completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}
