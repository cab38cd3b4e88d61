use crate::errors::*;
use crate::http;
use crate::strvals;
use crate::values;
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Url;
use serde_yaml::{Mapping, Value};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{self, AsyncReadExt};

/// Retrieves the raw bytes of a value source for a given url scheme
#[async_trait]
pub trait Getter: Send + Sync {
    async fn get(&self, url: &Url) -> Result<Vec<u8>>;
}

#[async_trait]
impl Getter for http::Client {
    async fn get(&self, url: &Url) -> Result<Vec<u8>> {
        self.fetch(url.as_str()).await
    }
}

pub struct FileGetter;

#[async_trait]
impl Getter for FileGetter {
    async fn get(&self, url: &Url) -> Result<Vec<u8>> {
        let path = url
            .to_file_path()
            .map_err(|_| anyhow!("Not a local file url: {url}"))?;
        let buf = fs::read(&path)
            .await
            .with_context(|| anyhow!("Failed to read file: {path:?}"))?;
        Ok(buf)
    }
}

pub struct Getters {
    schemes: IndexMap<String, Arc<dyn Getter>>,
}

impl Getters {
    pub fn new(client: &http::Client) -> Self {
        let client: Arc<dyn Getter> = Arc::new(client.clone());
        let mut getters = Getters {
            schemes: IndexMap::new(),
        };
        getters.register("http", client.clone());
        getters.register("https", client);
        getters.register("file", Arc::new(FileGetter));
        getters
    }

    pub fn register(&mut self, scheme: &str, getter: Arc<dyn Getter>) {
        self.schemes.insert(scheme.to_string(), getter);
    }

    pub fn by_scheme(&self, scheme: &str) -> Option<&dyn Getter> {
        self.schemes.get(scheme).map(|g| g.as_ref())
    }

    /// Read a value source, urls with a known scheme go through their getter and
    /// everything else is read from the local filesystem
    pub async fn read(&self, source: &str) -> Result<Vec<u8>> {
        if let Ok(url) = Url::parse(source) {
            if let Some(getter) = self.by_scheme(url.scheme()) {
                debug!("Reading values with {:?} getter: {source:?}", url.scheme());
                return getter.get(&url).await;
            }
        }
        debug!("Reading values from file: {source:?}");
        let buf = fs::read(source)
            .await
            .with_context(|| anyhow!("Failed to read values file: {source:?}"))?;
        Ok(buf)
    }
}

pub fn parse_values(buf: &[u8]) -> Result<Mapping> {
    let value = serde_yaml::from_slice::<Value>(buf)?;
    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(map) => Ok(map),
        other => bail!("Expected a mapping at the top level, found: {other:?}"),
    }
}

/// Merge all value sources in order, then apply the `--set` overrides on top
pub async fn load_values(getters: &Getters, files: &[String], set: &[String]) -> Result<Mapping> {
    let mut sources = Vec::with_capacity(files.len());
    for source in files {
        let buf = if source.trim() == "-" {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("Failed to read values from stdin")?;
            buf
        } else {
            getters.read(source).await?
        };
        let current =
            parse_values(&buf).with_context(|| anyhow!("Failed to parse {source}"))?;
        sources.push(current);
    }

    let mut base = values::merge_all(sources);

    for value in set {
        strvals::parse_into(value, &mut base).context("Failed parsing --set data")?;
    }

    Ok(base)
}
