//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each handler opens (or bootstraps) an [`Engine`], calls exactly the
//! operations its command needs, and renders the result through
//! [`crate::ui::output`]. Handlers never mutate Git or the state store
//! directly.
//!
//! # Async commands
//!
//! `sync` and `upload` talk to the hosted-repo provider over the network,
//! so they're the only handlers that need a Tokio runtime; `dispatch`
//! spins one up just for those two.

mod init;
mod rebase;
mod snapshot;
mod status;
mod sync;

use anyhow::Result;

use crate::cli::args::Command;
use crate::cli::Ctx;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Ctx) -> Result<()> {
    match command {
        Command::Init => init::init(ctx),
        Command::Clone { url, local_path } => init::clone(ctx, &url, local_path),

        Command::Commit { message } => rebase::commit(ctx, &message),
        Command::Amend { message } => rebase::amend(ctx, message.as_deref()),
        Command::Evolve => rebase::evolve(ctx),
        Command::Update { id } => rebase::update(ctx, &id),
        Command::Rebase { src, dst } => rebase::rebase(ctx, &src, &dst),
        Command::RebaseContinue => rebase::rebase_continue(ctx),
        Command::Squash { src, dst } => rebase::squash(ctx, &src, &dst),
        Command::Drop { id } => rebase::drop(ctx, &id),
        Command::Patch { remote_branch } => rebase::patch(ctx, &remote_branch),

        Command::Sync { all } => sync::sync(ctx, all),
        Command::Upload { id, all } => sync::upload(ctx, id.as_deref(), all),

        Command::Snapshot { message } => snapshot::snapshot(ctx, message.as_deref()),
        Command::RestoreSnapshot { hash } => snapshot::restore_snapshot(ctx, &hash),

        Command::GetSummary => status::get_summary(ctx),
        Command::PrintStatus { full } => status::print_status(ctx, full),
        Command::GetConfig => status::get_config(ctx),
        Command::SetConfig { key, value } => status::set_config(ctx, &key, &value),
        Command::GetBadStates => status::get_bad_states(ctx),
        Command::CheckState => status::check_state(ctx),

        Command::Completions { shell } => status::completions(shell),
    }
}
