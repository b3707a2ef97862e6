//! Git publisher: clone a repository into a temporary directory, add
//! captured artifacts, commit and push.
//!
//! Everything goes through the `git` executable, so credentials embedded in
//! the URL and the user's git configuration apply unchanged.

use std::path::Path;
use std::process::Stdio;

use log::{debug, info};
use tempfile::TempDir;
use tokio::process::Command;

use crate::error::{Error, GitError, Result};

/// A temporary clone of a remote repository.
///
/// The clone is deleted by [`GitRepo::remove`], or when the value is dropped.
#[derive(Debug)]
pub struct GitRepo {
    dir: TempDir,
    owner: String,
    repository: String,
}

impl GitRepo {
    /// Clone `url` into a fresh temporary directory.
    pub async fn clone(url: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("ncc-clone-")
            .tempdir()
            .map_err(GitError::TempDir)?;
        let (owner, repository) = owner_and_repository(url);

        let target = dir.path().to_string_lossy().into_owned();
        run_git(None, &["clone", "--quiet", url, &target], "clone").await?;
        info!("Cloned {}/{} to {}", owner, repository, dir.path().display());

        Ok(Self {
            dir,
            owner,
            repository,
        })
    }

    /// Root of the working tree.
    pub fn local_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Owner part of the clone URL (`YangModels` in
    /// `https://github.com/YangModels/yang.git`).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository part of the clone URL, without `.git`.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Stage every new, modified and deleted file.
    pub async fn add_all(&self) -> Result<()> {
        self.git(&["add", "--all"]).await.map(drop)
    }

    /// Commit all staged and tracked changes.
    pub async fn commit_all(&self, message: &str) -> Result<()> {
        self.git(&["commit", "--all", "--quiet", "-m", message])
            .await
            .map(drop)
    }

    /// Push the current branch to `origin` under the same name.
    pub async fn push(&self) -> Result<()> {
        self.git(&["push", "--quiet", "origin", "HEAD"]).await.map(drop)
    }

    /// Delete the clone.
    pub fn remove(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| Error::io(path, e))
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        run_git(Some(self.dir.path()), args, args[0]).await
    }
}

/// Run git, returning stdout on success.
///
/// `label` names the command in errors and logs so that URLs with
/// credentials are never echoed.
async fn run_git(cwd: Option<&Path>, args: &[&str], label: &str) -> Result<String> {
    let mut command = Command::new("git");
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    command
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null());

    debug!("git {}", label);
    let output = command.output().await.map_err(GitError::Spawn)?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        return Err(GitError::Command {
            command: label.to_string(),
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(stdout)
}

/// Split a clone URL into (owner, repository).
///
/// Handles `https://host/owner/repo(.git)` as well as scp-like
/// `git@host:owner/repo.git`.
pub fn owner_and_repository(url: &str) -> (String, String) {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let mut parts = trimmed.rsplit(['/', ':']);
    let repository = parts.next().unwrap_or_default().to_string();
    let owner = parts.next().unwrap_or_default().to_string();
    (owner, repository)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::process::Command as StdCommand;

    fn run(dir: &Path, args: &[&str]) -> String {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    fn configure_identity(dir: &Path) {
        run(dir, &["config", "user.name", "test-user"]);
        run(dir, &["config", "user.email", "test@example.com"]);
    }

    /// A bare repository with one commit, cloned from a scratch work tree.
    fn make_remote() -> (TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("work");
        std::fs::create_dir(&work).unwrap();
        run(&work, &["init", "--quiet"]);
        configure_identity(&work);
        std::fs::write(work.join("README.md"), "models\n").unwrap();
        run(&work, &["add", "README.md"]);
        run(&work, &["commit", "--quiet", "-m", "initial"]);

        let bare = root.path().join("yang.git");
        run(
            root.path(),
            &["clone", "--quiet", "--bare", "work", "yang.git"],
        );
        (root, bare)
    }

    #[test]
    fn test_owner_and_repository() {
        assert_eq!(
            owner_and_repository("https://user:pw@github.com/YangModels/yang.git"),
            ("YangModels".to_string(), "yang".to_string())
        );
        assert_eq!(
            owner_and_repository("git@github.com:YangModels/yang.git"),
            ("YangModels".to_string(), "yang".to_string())
        );
        assert_eq!(
            owner_and_repository("https://github.com/einarnn/ncc/"),
            ("einarnn".to_string(), "ncc".to_string())
        );
    }

    #[tokio::test]
    async fn test_clone_commit_push() {
        let (_root, bare) = make_remote();
        let repo = GitRepo::clone(bare.to_str().unwrap()).await.unwrap();
        configure_identity(repo.local_dir());
        assert!(repo.local_dir().join("README.md").exists());

        let target = repo.local_dir().join("vendor/cisco/xr/651");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("REPORT.md"), "# report\n").unwrap();

        repo.add_all().await.unwrap();
        repo.commit_all("Push version 6.5.1 models.").await.unwrap();
        repo.push().await.unwrap();

        let log = run(&bare, &["log", "--format=%s"]);
        assert!(log.starts_with("Push version 6.5.1 models."));

        let clone_dir = repo.local_dir().to_path_buf();
        repo.remove().unwrap();
        assert!(!clone_dir.exists());
    }

    #[tokio::test]
    async fn test_commit_with_nothing_to_commit_fails() {
        let (_root, bare) = make_remote();
        let repo = GitRepo::clone(bare.to_str().unwrap()).await.unwrap();
        configure_identity(repo.local_dir());

        let err = repo.commit_all("empty").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Git(GitError::Command { ref command, .. }) if command == "commit"
        ));
    }

    #[tokio::test]
    async fn test_clone_failure_hides_url() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.git");
        let err = GitRepo::clone(missing.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Git(GitError::Command { ref command, .. }) if command == "clone"
        ));
    }
}
