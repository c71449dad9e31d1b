//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Does NOT perform repository mutations directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! the [`crate::engine`]. All repository state changes flow through the
//! engine's validated methods; the CLI never touches `git` or the state
//! store itself.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::paths::GitGudPaths;
use crate::engine::Engine;
use crate::forge::fake::FakeProvider;
use crate::forge::github::GitHubProvider;
use crate::forge::HostedRepoProvider;
use crate::ui::output::Verbosity;

/// Process-wide execution context built from global CLI flags.
pub struct Ctx {
    pub repo_dir: PathBuf,
    pub paths: GitGudPaths,
    pub verbosity: Verbosity,
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let repo_dir = cli
        .cwd
        .clone()
        .map(Ok)
        .unwrap_or_else(std::env::current_dir)
        .context("could not determine the current directory")?;
    let paths = GitGudPaths::discover().context("could not resolve gg's config directory")?;
    let ctx = Ctx {
        repo_dir,
        paths,
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Load the engine for an already-tracked repository, picking a hosted-repo
/// provider based on whatever `repo_metadata` was recorded for it.
pub(crate) fn open_engine(ctx: &Ctx) -> Result<Engine> {
    let state = crate::core::state::load(&ctx.paths.configs_root, &ctx.repo_dir)
        .context("this directory is not tracked by gg; run `gg init` first")?;
    let provider = provider_for(state.repo_metadata.as_ref());
    Ok(Engine::load(&ctx.repo_dir, ctx.paths.clone(), provider)?)
}

/// Build a hosted-repo provider from recorded `owner`/`repo` metadata,
/// falling back to an in-memory fake when credentials or metadata are
/// unavailable. Only `sync`/`upload` ever exercise it over the network;
/// every other command works fine against the fake.
pub(crate) fn provider_for(
    metadata: Option<&crate::core::model::RepoMetadata>,
) -> Box<dyn HostedRepoProvider> {
    if let Some(meta) = metadata {
        if let (Some(owner), Some(repo)) = (&meta.owner, &meta.repo) {
            if let Ok(provider) = GitHubProvider::from_env(owner.clone(), repo.clone()) {
                return Box::new(provider);
            }
        }
    }
    Box::new(FakeProvider::new())
}
