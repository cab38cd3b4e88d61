use super::{Digest, ResolveError, Resolver};
use crate::errors::*;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Resolves tags by listing them with `gcloud container images list-tags`
pub struct CommandResolver {
    program: String,
    leading_args: Vec<String>,
    repository: String,
}

impl CommandResolver {
    /// `command` is split on whitespace, the first word is the binary to execute
    pub fn new(command: &str, repository: &str) -> Self {
        let mut words = command.split_whitespace().map(String::from);
        let program = words.next().unwrap_or_else(|| "gcloud".to_string());
        CommandResolver {
            program,
            leading_args: words.collect(),
            repository: repository.trim_end_matches('/').to_string(),
        }
    }

    pub fn args(&self, tag: &str, image_name: &str) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend([
            "container".to_string(),
            "images".to_string(),
            "list-tags".to_string(),
            format!("{}/{}", self.repository, image_name),
            format!("--filter=tags:{tag}"),
            "--limit=1".to_string(),
            "--format=get(digest)".to_string(),
        ]);
        args
    }
}

/// Parse the complete lookup output as a single `<algorithm>:<hash>` token
pub fn parse_output(out: &[u8]) -> Result<Digest, ResolveError> {
    let out = String::from_utf8_lossy(out);
    let out = out.trim();
    if out.contains(char::is_whitespace) {
        return Err(ResolveError::UnknownDigest(out.to_string()));
    }
    Digest::parse(out).ok_or_else(|| ResolveError::UnknownDigest(out.to_string()))
}

#[async_trait]
impl Resolver for CommandResolver {
    async fn resolve(
        &self,
        _repository: &str,
        tag: &str,
        image_name: &str,
    ) -> Result<Digest, ResolveError> {
        let args = self.args(tag, image_name);

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("Spawning child process: {:?} {:?}", self.program, args);
        let out = cmd.output().await.map_err(|source| ResolveError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        debug!("Lookup command exited: {:?}", out.status);

        if !out.status.success() {
            let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
            output.push_str(&String::from_utf8_lossy(&out.stderr));
            return Err(ResolveError::Command {
                args,
                status: out.status,
                output: output.trim().to_string(),
            });
        }

        parse_output(&out.stdout)
    }
}
