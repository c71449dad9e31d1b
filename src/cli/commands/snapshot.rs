//! cli::commands::snapshot
//!
//! `snapshot` and `restore_snapshot`.

use anyhow::Result;

use crate::cli::{open_engine, Ctx};
use crate::ui::output;

pub fn snapshot(ctx: &Ctx, message: Option<&str>) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    engine.snapshot(message)?;
    output::success("snapshot recorded", ctx.verbosity);
    Ok(())
}

pub fn restore_snapshot(ctx: &Ctx, hash: &str) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    engine.restore_snapshot(hash)?;
    output::success(format!("restored snapshot {hash}"), ctx.verbosity);
    Ok(())
}
