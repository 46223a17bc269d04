//! External sources from git repositories.

use std::path::Path;

use anyhow::{bail, Context, Result};
use git2::build::CheckoutBuilder;
use git2::{FetchOptions, Oid, Repository};

/// Make `directory` a checkout of `url` at `version`, or at the latest
/// commit of the remote's branch when no version is given.
///
/// An existing checkout of the same URL is reused. Anything else in the
/// way is replaced.
pub fn download_sources(
    url: &str,
    directory: &Path,
    version: Option<&str>,
    recursive: bool,
) -> Result<()> {
    if directory.is_file() {
        bail!(
            "Tried to download '{}' to '{}', but '{}' is a file.",
            url,
            directory.display(),
            directory.display()
        );
    }

    if is_non_empty_dir(directory) {
        match Repository::open(directory) {
            Ok(repo) if origin_url(&repo).as_deref() == Some(url) => {
                tracing::info!("External sources found in '{}'", directory.display());
                match version {
                    Some(version) => checkout_version(&repo, version)?,
                    None => pull_latest(&repo)?,
                }
                if recursive {
                    update_submodules(&repo)?;
                }
                return Ok(());
            }
            _ => {
                tracing::warn!(
                    "'{}' does not hold a checkout of '{}'. Downloading again.",
                    directory.display(),
                    url
                );
                std::fs::remove_dir_all(directory).with_context(|| {
                    format!("failed to remove '{}'", directory.display())
                })?;
            }
        }
    }

    tracing::info!("Downloading external sources to '{}'", directory.display());
    if let Some(parent) = directory.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let repo = Repository::clone(url, directory)
        .with_context(|| format!("failed to clone {}", url))?;

    if let Some(version) = version {
        checkout_version(&repo, version)?;
    }
    if recursive {
        update_submodules(&repo)?;
    }

    tracing::info!("External sources downloaded");
    Ok(())
}

fn is_non_empty_dir(directory: &Path) -> bool {
    std::fs::read_dir(directory)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn origin_url(repo: &Repository) -> Option<String> {
    let remote = repo.find_remote("origin").ok()?;
    remote.url().map(str::to_string)
}

fn fetch_origin(repo: &Repository) -> Result<()> {
    let mut remote = repo.find_remote("origin")?;
    let mut options = FetchOptions::new();
    options.download_tags(git2::AutotagOption::All);
    remote
        .fetch(&["+refs/heads/*:refs/remotes/origin/*"], Some(&mut options), None)
        .context("failed to fetch from origin")?;
    Ok(())
}

/// Check out a branch, tag or commit, detaching HEAD.
fn checkout_version(repo: &Repository, version: &str) -> Result<()> {
    tracing::info!("Checking out version '{}'", version);
    fetch_origin(repo)?;

    let candidates = [
        format!("origin/{}", version),
        format!("refs/tags/{}", version),
        version.to_string(),
    ];
    let object = candidates
        .iter()
        .find_map(|spec| repo.revparse_single(spec).ok())
        .with_context(|| format!("version '{}' not found", version))?;
    let commit = object
        .peel_to_commit()
        .with_context(|| format!("version '{}' is not a commit", version))?;

    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
    repo.set_head_detached(commit.id())?;
    Ok(())
}

/// Fast-forward the checked out branch to the remote's.
///
/// Local commits and uncommitted edits are kept: a branch that diverged
/// from the remote is left alone, and the checkout fails instead of
/// overwriting modified files.
fn pull_latest(repo: &Repository) -> Result<()> {
    let head = repo.head()?;
    let Some(branch) = head.shorthand().filter(|_| head.is_branch()).map(str::to_string) else {
        tracing::info!("Checkout is not on a branch, not pulling");
        return Ok(());
    };

    tracing::info!("Pulling latest changes of '{}'", branch);
    fetch_origin(repo)?;

    let remote_ref = format!("refs/remotes/origin/{}", branch);
    let target: Oid = repo
        .refname_to_id(&remote_ref)
        .with_context(|| format!("remote branch '{}' not found", branch))?;
    let incoming = repo.find_annotated_commit(target)?;
    let (analysis, _) = repo.merge_analysis(&[&incoming])?;

    if analysis.is_up_to_date() {
        tracing::debug!("'{}' is up to date", branch);
        return Ok(());
    }
    if !analysis.is_fast_forward() {
        tracing::warn!(
            "Local branch '{}' has diverged from origin, leaving it as it is",
            branch
        );
        return Ok(());
    }

    let commit = repo.find_commit(target)?;
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))
        .with_context(|| {
            format!(
                "could not fast-forward '{}' without losing local changes",
                branch
            )
        })?;
    let mut local = repo.find_reference(&format!("refs/heads/{}", branch))?;
    local.set_target(target, "clang-build: fast-forward")?;
    Ok(())
}

fn update_submodules(repo: &Repository) -> Result<()> {
    for mut submodule in repo.submodules()? {
        submodule
            .update(true, None)
            .with_context(|| format!("failed to update submodule {}", submodule.path().display()))?;
        let sub_repo = submodule.open()?;
        update_submodules(&sub_repo)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// A repository with one commit per file, tagged `v<n>`.
    fn upstream(tmp: &TempDir, files: &[&str]) -> (Repository, String) {
        let path = tmp.path().join("upstream");
        let repo = Repository::init(&path).unwrap();
        for (n, file) in files.iter().enumerate() {
            commit_file(&repo, file);
            let head = repo.head().unwrap().peel_to_commit().unwrap();
            repo.tag_lightweight(&format!("v{}", n + 1), head.as_object(), false)
                .unwrap();
        }
        let url = path.to_string_lossy().into_owned();
        (repo, url)
    }

    fn commit_file(repo: &Repository, file: &str) {
        let workdir = repo.workdir().unwrap().to_path_buf();
        std::fs::write(workdir.join(file), file).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(&PathBuf::from(file)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::now("test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, file, &tree, &parents)
            .unwrap();
    }

    #[test]
    fn test_clone_and_checkout_version() {
        let tmp = TempDir::new().unwrap();
        let (_repo, url) = upstream(&tmp, &["a.cpp", "b.cpp"]);
        let checkout = tmp.path().join("build/external_sources");

        download_sources(&url, &checkout, Some("v1"), false).unwrap();
        assert!(checkout.join("a.cpp").exists());
        assert!(!checkout.join("b.cpp").exists());

        // Reused checkout moves to another version
        download_sources(&url, &checkout, Some("v2"), false).unwrap();
        assert!(checkout.join("b.cpp").exists());
    }

    #[test]
    fn test_pull_latest() {
        let tmp = TempDir::new().unwrap();
        let (repo, url) = upstream(&tmp, &["a.cpp"]);
        let checkout = tmp.path().join("checkout");

        download_sources(&url, &checkout, None, false).unwrap();
        assert!(!checkout.join("c.cpp").exists());

        commit_file(&repo, "c.cpp");
        download_sources(&url, &checkout, None, false).unwrap();
        assert!(checkout.join("c.cpp").exists());
    }

    #[test]
    fn test_pull_keeps_local_work() {
        let tmp = TempDir::new().unwrap();
        let (repo, url) = upstream(&tmp, &["a.cpp"]);
        let checkout = tmp.path().join("checkout");
        download_sources(&url, &checkout, None, false).unwrap();

        let local = Repository::open(&checkout).unwrap();
        commit_file(&local, "local.cpp");
        std::fs::write(checkout.join("a.cpp"), "edited").unwrap();
        commit_file(&repo, "c.cpp");

        download_sources(&url, &checkout, None, false).unwrap();
        assert!(checkout.join("local.cpp").exists());
        assert_eq!(std::fs::read_to_string(checkout.join("a.cpp")).unwrap(), "edited");
        // Diverged branches are not merged
        assert!(!checkout.join("c.cpp").exists());
    }

    #[test]
    fn test_fast_forward_keeps_uncommitted_edits() {
        let tmp = TempDir::new().unwrap();
        let (repo, url) = upstream(&tmp, &["a.cpp"]);
        let checkout = tmp.path().join("checkout");
        download_sources(&url, &checkout, None, false).unwrap();

        std::fs::write(checkout.join("a.cpp"), "edited").unwrap();
        commit_file(&repo, "c.cpp");

        download_sources(&url, &checkout, None, false).unwrap();
        assert!(checkout.join("c.cpp").exists());
        assert_eq!(std::fs::read_to_string(checkout.join("a.cpp")).unwrap(), "edited");
    }

    #[test]
    fn test_foreign_directory_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let (_repo, url) = upstream(&tmp, &["a.cpp"]);
        let checkout = tmp.path().join("checkout");
        std::fs::create_dir_all(&checkout).unwrap();
        std::fs::write(checkout.join("stale.txt"), "").unwrap();

        download_sources(&url, &checkout, None, false).unwrap();
        assert!(checkout.join("a.cpp").exists());
        assert!(!checkout.join("stale.txt").exists());
    }

    #[test]
    fn test_file_in_the_way() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("sources");
        std::fs::write(&file, "").unwrap();

        let err = download_sources("https://example.com/repo.git", &file, None, true).unwrap_err();
        let dir = file.display();
        assert_eq!(
            err.to_string(),
            format!(
                "Tried to download 'https://example.com/repo.git' to '{}', but '{}' is a file.",
                dir, dir
            )
        );
    }
}
