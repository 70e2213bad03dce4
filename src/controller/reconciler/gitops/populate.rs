//! # Seed Repository Population
//!
//! Replaces a seed repository's content with the embedded snapshot and
//! pushes it to the git server. Population is full content replacement,
//! so re-running it converges to the same tree and the second commit is
//! empty.
//!
//! All steps for one repository run under that repository's lock;
//! concurrent pushes to the same repository are not allowed.

use super::Reconciler;
use crate::constants;
use crate::error::Result;
use crate::git;
use crate::gitea::GiteaClient;
use crate::observability;
use crate::packages::RepositoryDescriptor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Populate one seed repository from its embedded source tree
pub async fn populate(
    ctx: &Reconciler,
    gitea: &GiteaClient,
    repository: &RepositoryDescriptor,
) -> Result<()> {
    let lock = ctx.repo_lock(repository.name);
    let _guard = lock.lock().await;

    let scratch = scratch_dir(repository.name);
    if scratch.exists() {
        std::fs::remove_dir_all(&scratch)?;
    }
    std::fs::create_dir_all(&scratch)?;

    let remote = gitea.authenticated_clone_url(repository.name);
    if let Err(e) = git::clone(&scratch, &remote).await {
        // A fresh repository has no branches to clone; start from scratch
        debug!("clone of {} failed ({e}), initialising empty tree", repository.name);
        git::init(&scratch, constants::DEFAULT_BRANCH).await?;
    }
    git::checkout(&scratch, constants::DEFAULT_BRANCH).await?;

    clear_working_tree(&scratch)?;
    write_seed_tree(&scratch, repository)?;

    git::set_identity(
        &scratch,
        constants::GIT_AUTHOR_NAME,
        constants::GIT_AUTHOR_EMAIL,
    )
    .await?;
    git::commit_all(&scratch, constants::GIT_COMMIT_MESSAGE).await?;
    git::set_origin(&scratch, &remote).await?;
    git::push(&scratch, constants::DEFAULT_BRANCH).await?;

    observability::metrics::increment_git_pushes();
    info!("populated repository {}", repository.name);
    Ok(())
}

/// Scratch working directory for one repository
fn scratch_dir(repository: &str) -> PathBuf {
    std::env::temp_dir().join("platform-bootstrap").join(repository)
}

/// Remove everything in the working tree except the .git directory
fn clear_working_tree(dir: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Write the embedded snapshot into the working tree, applying the
/// descriptor's copy rule
fn write_seed_tree(dir: &Path, repository: &RepositoryDescriptor) -> std::io::Result<()> {
    for (embedded_path, content) in repository.files {
        let Some(relative) = target_path(repository, embedded_path) else {
            continue;
        };
        let target = dir.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, content)?;
    }
    Ok(())
}

/// Path a seed file lands at inside the repository. The packages
/// repository strips one leading component so the application-set's path
/// references align; the environments repository copies as-is.
fn target_path<'a>(
    repository: &RepositoryDescriptor,
    embedded_path: &'a str,
) -> Option<&'a str> {
    if !repository.strip_first_component {
        return Some(embedded_path);
    }
    match embedded_path.split_once('/') {
        Some((_, rest)) if !rest.is_empty() => Some(rest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::SEED_REPOSITORIES;

    fn repo(name: &'static str) -> &'static RepositoryDescriptor {
        SEED_REPOSITORIES
            .iter()
            .find(|r| r.name == name)
            .expect("descriptor")
    }

    #[test]
    fn packages_repository_strips_one_component() {
        let packages = repo("platform-packages");
        assert_eq!(
            target_path(packages, "packages/monitoring/kustomization.yaml"),
            Some("monitoring/kustomization.yaml")
        );
        // A bare top-level entry has nothing left after the strip
        assert_eq!(target_path(packages, "packages"), None);
    }

    #[test]
    fn environments_repository_copies_as_is() {
        let environments = repo("platform-environments");
        assert_eq!(
            target_path(environments, "environments/dev/cluster.yaml"),
            Some("environments/dev/cluster.yaml")
        );
        assert_eq!(target_path(environments, "README.md"), Some("README.md"));
    }

    #[test]
    fn seed_tree_lands_under_the_copy_rule() {
        let dir = tempfile::tempdir().unwrap();
        write_seed_tree(dir.path(), repo("platform-packages")).unwrap();
        assert!(dir.path().join("monitoring/kustomization.yaml").exists());
        assert!(dir.path().join("cert-manager/issuer.yaml").exists());
        assert!(!dir.path().join("packages").exists());
    }

    #[test]
    fn writing_twice_yields_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let environments = repo("platform-environments");
        write_seed_tree(dir.path(), environments).unwrap();
        let first = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
        write_seed_tree(dir.path(), environments).unwrap();
        let second = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn clear_keeps_git_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::create_dir_all(dir.path().join("sub/dir")).unwrap();
        std::fs::write(dir.path().join("file.txt"), "x").unwrap();
        std::fs::write(dir.path().join("sub/dir/y.txt"), "y").unwrap();

        clear_working_tree(dir.path()).unwrap();

        assert!(dir.path().join(".git").exists());
        assert!(!dir.path().join("file.txt").exists());
        assert!(!dir.path().join("sub").exists());
    }
}
