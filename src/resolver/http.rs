use super::{Digest, ResolveError, Resolver};
use crate::errors::*;
use crate::http::Client;
use async_trait::async_trait;

/// Resolves tags with `GET <base>/<image>/<tag>`, answered by lines of `<repository>@<algorithm>:<hash>`
pub struct HttpResolver {
    client: Client,
    base: String,
}

impl HttpResolver {
    pub fn new(client: Client, base: &str) -> Self {
        HttpResolver {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, image_name: &str, tag: &str) -> String {
        format!("{}/{}/{}", self.base, image_name, tag)
    }
}

/// Pick the digest of the first line whose repository is a prefix of `repository`
pub fn find_digest(body: &str, repository: &str) -> Result<Digest, ResolveError> {
    for line in body.lines() {
        let mut parts = line.split('@');
        let (Some(line_repo), Some(digest), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ResolveError::UnknownFormat(line.to_string()));
        };
        let digest =
            Digest::parse(digest).ok_or_else(|| ResolveError::UnknownDigest(digest.to_string()))?;

        if repository.starts_with(line_repo) {
            trace!("Matched resolver line {line:?} for {repository:?}");
            return Ok(digest);
        }
        trace!("Skipping resolver line {line:?}");
    }
    Err(ResolveError::NotFound(repository.to_string()))
}

#[async_trait]
impl Resolver for HttpResolver {
    async fn resolve(
        &self,
        repository: &str,
        tag: &str,
        image_name: &str,
    ) -> Result<Digest, ResolveError> {
        let url = self.url(image_name, tag);
        let http_err = |source: reqwest::Error| ResolveError::Http {
            url: url.clone(),
            source,
        };

        let response = self.client.get(&url).await.map_err(http_err)?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ResolveError::Status {
                url: url.clone(),
                status,
            });
        }
        let body = response.text().await.map_err(http_err)?;
        debug!("Resolver returned {} lines for {url:?}", body.lines().count());

        find_digest(&body, repository)
    }
}
