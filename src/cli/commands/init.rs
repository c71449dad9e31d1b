//! cli::commands::init
//!
//! `init` / `clone`: the two verbs that create a repository's tracked
//! state rather than operating on an existing one.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::cli::{provider_for, Ctx};
use crate::core::config::load_global_defaults;
use crate::core::model::RepoMetadata;
use crate::engine::Engine;
use crate::forge::github::parse_github_url;
use crate::git::Git;
use crate::ui::output;

pub fn init(ctx: &Ctx) -> Result<()> {
    if crate::core::state::load(&ctx.paths.configs_root, &ctx.repo_dir).is_ok() {
        bail!("{} is already tracked by gg", ctx.repo_dir.display());
    }

    let config = load_global_defaults(&ctx.paths.global_config_file)?;
    let remote_metadata = remote_metadata(&ctx.repo_dir);
    let provider = provider_for(remote_metadata.as_ref());
    let mut engine = Engine::bootstrap(&ctx.repo_dir, ctx.paths.clone(), provider, config)?;
    if let Some(metadata) = remote_metadata {
        engine.set_repo_metadata(metadata)?;
    }

    output::success(
        format!("now tracking {}", ctx.repo_dir.display()),
        ctx.verbosity,
    );
    Ok(())
}

pub fn clone(ctx: &Ctx, url: &str, local_path: Option<PathBuf>) -> Result<()> {
    let dest = local_path.unwrap_or_else(|| PathBuf::from(default_clone_dir(url)));
    let owner_repo = parse_github_url(url);
    let metadata = owner_repo.clone().map(|(owner, repo)| RepoMetadata {
        remote_url: Some(url.to_string()),
        owner: Some(owner),
        repo: Some(repo),
    });
    let provider = provider_for(metadata.as_ref());
    let config = load_global_defaults(&ctx.paths.global_config_file)?;

    let mut engine = Engine::clone_remote(url, &dest, ctx.paths.clone(), provider, config)?;
    if let Some(metadata) = metadata {
        engine.set_repo_metadata(metadata)?;
    }

    output::success(format!("cloned into {}", dest.display()), ctx.verbosity);
    Ok(())
}

/// Last path component of `url`, stripped of a trailing `.git`, matching
/// plain `git clone`'s destination-inference rule.
fn default_clone_dir(url: &str) -> String {
    url.trim_end_matches('/')
        .trim_end_matches(".git")
        .rsplit('/')
        .next()
        .unwrap_or("repo")
        .to_string()
}

/// Best-effort `repo_metadata` for a repository `gg init` is run inside,
/// read from its `origin` remote if one is configured.
fn remote_metadata(repo_dir: &Path) -> Option<RepoMetadata> {
    let git = Git::open(repo_dir).ok()?;
    let remote_url = git.remote_url("origin").ok()?;
    let (owner, repo) = parse_github_url(&remote_url)?;
    Some(RepoMetadata {
        remote_url: Some(remote_url),
        owner: Some(owner),
        repo: Some(repo),
    })
}
