use crate::domain::ports::{GitOutput, GitRunner};
use crate::error::Result;
use async_trait::async_trait;
use tokio::process::Command;

/// Runs the system `git` binary in the current working directory.
#[derive(Debug, Default, Clone)]
pub struct ProcessGitRunner;

#[async_trait]
impl GitRunner for ProcessGitRunner {
    async fn run(&self, args: &[String]) -> Result<GitOutput> {
        let output = Command::new("git").args(args).output().await?;
        Ok(GitOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
