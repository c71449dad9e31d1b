//! cli::commands::rebase
//!
//! The commit-graph-mutating verbs that only ever touch the local
//! repository: `commit`, `amend`, `evolve`, `update`, `rebase`,
//! `rebase_continue`, `squash`, `drop`, `patch`.

use anyhow::Result;

use crate::cli::{open_engine, Ctx};
use crate::ui::output;

pub fn commit(ctx: &Ctx, message: &str) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    let id = engine.commit(message, true)?;
    output::success(format!("created {id}"), ctx.verbosity);
    Ok(())
}

pub fn amend(ctx: &Ctx, message: Option<&str>) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    engine.amend(message, true)?;
    report_conflict_or(&engine, ctx, "amended");
    Ok(())
}

pub fn evolve(ctx: &Ctx) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    engine.evolve()?;
    report_conflict_or(&engine, ctx, "evolved");
    Ok(())
}

pub fn update(ctx: &Ctx, id: &str) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    engine.update(id)?;
    output::success(format!("now on {id}"), ctx.verbosity);
    Ok(())
}

pub fn rebase(ctx: &Ctx, src: &str, dst: &str) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    engine.rebase(src, dst)?;
    report_conflict_or(&engine, ctx, &format!("rebased {src} onto {dst}"));
    Ok(())
}

pub fn rebase_continue(ctx: &Ctx) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    engine.rebase_continue()?;
    report_conflict_or(&engine, ctx, "resumed");
    Ok(())
}

pub fn squash(ctx: &Ctx, src: &str, dst: &str) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    engine.squash(src, dst)?;
    output::success(format!("squashed {src} into {dst}"), ctx.verbosity);
    Ok(())
}

pub fn drop(ctx: &Ctx, id: &str) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    engine.drop_commit(id)?;
    output::success(format!("dropped {id}"), ctx.verbosity);
    Ok(())
}

pub fn patch(ctx: &Ctx, remote_branch: &str) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    let id = engine.patch(remote_branch)?;
    output::success(format!("adopted {remote_branch} as {id}"), ctx.verbosity);
    Ok(())
}

/// After an operation that may have left a conflict pending, print either
/// the success message or the conflicted files and how to resolve them.
fn report_conflict_or(engine: &crate::engine::Engine, ctx: &Ctx, success_message: &str) {
    match &engine.state().merge_conflict_state {
        Some(conflict) => {
            output::warn(
                format!(
                    "conflict while merging {} into {}",
                    conflict.incoming_id, conflict.current_id
                ),
                ctx.verbosity,
            );
            for file in &conflict.files {
                output::warn(format!("  {file}"), ctx.verbosity);
            }
            output::warn(
                "resolve the conflicts, then run `gg rebase-continue`",
                ctx.verbosity,
            );
        }
        None => output::success(success_message, ctx.verbosity),
    }
}
