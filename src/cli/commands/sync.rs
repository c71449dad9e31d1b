//! cli::commands::sync
//!
//! `sync` and `upload`: the two verbs that talk to the hosted-repo
//! provider, hence the only ones that need a Tokio runtime.

use anyhow::Result;

use crate::cli::{open_engine, Ctx};
use crate::ui::output;

pub fn sync(ctx: &Ctx, all: bool) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    tokio::runtime::Runtime::new()?.block_on(engine.sync(all))?;
    output::success("sync complete", ctx.verbosity);
    Ok(())
}

pub fn upload(ctx: &Ctx, id: Option<&str>, all: bool) -> Result<()> {
    let mut engine = open_engine(ctx)?;
    let rt = tokio::runtime::Runtime::new()?;
    if all {
        rt.block_on(engine.upload_all())?;
        output::success("uploaded every eligible commit", ctx.verbosity);
    } else {
        let id = id
            .map(ToString::to_string)
            .unwrap_or_else(|| engine.state().head_id.clone());
        rt.block_on(engine.upload(&id))?;
        output::success(format!("uploaded {id}"), ctx.verbosity);
    }
    Ok(())
}
