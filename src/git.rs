//! # Git Command Execution
//!
//! Thin wrapper around the command-line `git` binary used to populate seed
//! repositories. All repository mutation goes through these helpers so the
//! population sequence in the GitOps bootstrap phase stays readable.
//!
//! We shell out instead of linking an in-process git implementation to
//! avoid OpenSSL dependency issues; the controller image ships a git
//! binary.

use crate::error::{Error, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Run `git` with the given arguments inside `dir`, capturing output.
/// Returns stdout on success and a [`Error::Git`] carrying stderr on a
/// non-zero exit.
pub async fn run(dir: &Path, args: &[&str]) -> Result<String> {
    debug!("running git {} in {}", args.join(" "), dir.display());

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(Error::Git {
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Clone `url` into `dir`. Fails on an empty remote with no branches;
/// callers fall back to [`init`].
pub async fn clone(dir: &Path, url: &str) -> Result<String> {
    run(dir, &["clone", url, "."]).await
}

/// Initialise a fresh working tree on the canonical default branch
pub async fn init(dir: &Path, branch: &str) -> Result<String> {
    run(dir, &["init", "--initial-branch", branch]).await
}

/// Checkout `branch`, creating it if it does not exist yet
pub async fn checkout(dir: &Path, branch: &str) -> Result<String> {
    if run(dir, &["checkout", branch]).await.is_ok() {
        return Ok(String::new());
    }
    run(dir, &["checkout", "-b", branch]).await
}

/// Set the repository-local commit identity
pub async fn set_identity(dir: &Path, name: &str, email: &str) -> Result<()> {
    run(dir, &["config", "user.name", name]).await?;
    run(dir, &["config", "user.email", email]).await?;
    Ok(())
}

/// Stage everything and commit. A "nothing to commit" outcome is benign:
/// the tree already matches the embedded content.
pub async fn commit_all(dir: &Path, message: &str) -> Result<()> {
    run(dir, &["add", "--all"]).await?;
    match run(dir, &["commit", "-m", message]).await {
        Ok(_) => Ok(()),
        Err(Error::Git { ref stderr, .. }) if is_nothing_to_commit(stderr) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Point `origin` at `url`, adding the remote if it is not set yet
pub async fn set_origin(dir: &Path, url: &str) -> Result<()> {
    if run(dir, &["remote", "set-url", "origin", url]).await.is_ok() {
        return Ok(());
    }
    run(dir, &["remote", "add", "origin", url]).await?;
    Ok(())
}

/// Push `branch` to origin with upstream tracking
pub async fn push(dir: &Path, branch: &str) -> Result<String> {
    run(dir, &["push", "--set-upstream", "origin", branch]).await
}

/// Git prints "nothing to commit" variants on stdout or stderr depending
/// on version; `commit_all` routes stderr here.
pub fn is_nothing_to_commit(output: &str) -> bool {
    output.contains("nothing to commit")
        || output.contains("nothing added to commit")
        || output.contains("working tree clean")
}
