pub mod command;
pub mod http;

use crate::config::Backend;
use crate::errors::*;
use async_trait::async_trait;
use std::fmt;
use std::process::ExitStatus;

/// A content digest like `sha256:<hash>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub algorithm: String,
    pub hash: String,
}

impl Digest {
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(algorithm), Some(hash), None) => Some(Digest {
                algorithm: algorithm.to_string(),
                hash: hash.to_string(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hash)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Failed to send resolver request to {url:?}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected resolver status code {status} for {url:?}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("Unknown resolver format: {0:?}")]
    UnknownFormat(String),
    #[error("Unknown digest format: {0:?}")]
    UnknownDigest(String),
    #[error("Could not resolve {0}")]
    NotFound(String),
    #[error("Failed to execute {program:?}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Lookup command ({args:?}) failed with {status}: {output}")]
    Command {
        args: Vec<String>,
        status: ExitStatus,
        output: String,
    },
}

/// Source of truth for turning an image tag into a digest
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `tag` of `repository`, `image_name` is the last path segment of the repository
    async fn resolve(
        &self,
        repository: &str,
        tag: &str,
        image_name: &str,
    ) -> Result<Digest, ResolveError>;
}

pub fn from_backend(backend: &Backend, client: &crate::http::Client) -> Box<dyn Resolver> {
    match backend {
        Backend::Http { url } => {
            debug!("Resolving tags with http resolver: {url:?}");
            Box::new(http::HttpResolver::new(client.clone(), url))
        }
        Backend::Command {
            repository,
            program,
        } => {
            debug!("Resolving tags with {program:?} below {repository:?}");
            Box::new(command::CommandResolver::new(program, repository))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_digest() {
        assert_eq!(
            Digest::parse("sha256:deadbeef"),
            Some(Digest {
                algorithm: "sha256".to_string(),
                hash: "deadbeef".to_string(),
            })
        );
        assert_eq!(Digest::parse("deadbeef"), None);
        assert_eq!(Digest::parse("sha256:dead:beef"), None);
        assert_eq!(Digest::parse(""), None);
    }

    #[test]
    fn test_digest_display() {
        let digest = Digest {
            algorithm: "sha256".to_string(),
            hash: "abc".to_string(),
        };
        assert_eq!(digest.to_string(), "sha256:abc");
    }
}
