use crate::errors::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::io::{self, Write};
use std::path::Path;
use tokio::fs;

pub const HEADER: &str = r#"# Values will be overwritten by helm hashtag.
# To follow a new tag, add an entry matching provided values such as:
#
#    app-chart:
#        yourImage: null
#
# and it will automatically be populated with the hash that app-chart.yourImage.tag
# points to.

"#;

/// A resolved image override, `repository` carries the digest algorithm suffix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub repository: String,
    pub tag: String,
}

impl Pin {
    pub fn new(repository: &str, algorithm: &str, hash: &str) -> Self {
        Pin {
            repository: format!("{repository}@{algorithm}"),
            tag: hash.to_string(),
        }
    }
}

/// Charts mapped to their tracked image references, kept in document order
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagFile {
    charts: IndexMap<String, Value>,
}

impl TagFile {
    pub fn deserialize(buf: &str) -> Result<Self> {
        let value =
            serde_yaml::from_str::<Value>(buf).context("Failed to load tag file from yaml")?;
        if value.is_null() {
            return Ok(Self::default());
        }
        let tags = serde_yaml::from_value(value).context("Tag file must be a mapping of charts")?;
        Ok(tags)
    }

    pub fn serialize(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(format!("{HEADER}{yaml}"))
    }

    /// Load the tag file, a file that doesn't exist yet is treated as empty
    pub async fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path).await {
            Ok(buf) => {
                let tags = Self::deserialize(&buf)
                    .with_context(|| anyhow!("Failed to parse tag file: {path:?}"))?;
                debug!("Loaded {} charts from tag file: {path:?}", tags.charts.len());
                Ok(tags)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("Tag file {path:?} does not exist yet, starting empty");
                Ok(Self::default())
            }
            Err(err) => Err(err).with_context(|| anyhow!("Failed to read tag file: {path:?}")),
        }
    }

    /// Write the tag file through a temporary file in the same directory
    pub fn write(&self, path: &Path) -> Result<()> {
        let buf = self.serialize()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut builder = tempfile::Builder::new();
        builder.prefix(".hashtags.");
        // new files are created 0666 minus umask instead of the 0600 tempfile default
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let mut file = builder
            .tempfile_in(dir)
            .with_context(|| anyhow!("Failed to create temporary file in {dir:?}"))?;
        file.write_all(buf.as_bytes())?;

        match std::fs::metadata(path) {
            Ok(metadata) => {
                debug!("Keeping permissions of existing tag file: {path:?}");
                file.as_file()
                    .set_permissions(metadata.permissions())
                    .context("Failed to copy permissions of existing tag file")?;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => (),
            Err(err) => {
                return Err(err).with_context(|| anyhow!("Failed to stat tag file: {path:?}"))
            }
        }

        file.persist(path)
            .with_context(|| anyhow!("Failed to write tag file: {path:?}"))?;
        debug!("Updated tag file: {path:?}");
        Ok(())
    }

    pub fn charts(&self) -> impl Iterator<Item = &str> {
        self.charts.keys().map(String::as_str)
    }

    /// List the image references tracked for a chart, in document order
    pub fn image_refs(&self, chart: &str) -> Result<Vec<String>> {
        match self.charts.get(chart) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Mapping(refs)) => refs
                .keys()
                .map(|key| match key {
                    Value::String(key) => Ok(key.clone()),
                    other => bail!("Malformed tag file: image reference {other:?} of chart {chart:?} is not a string"),
                })
                .collect(),
            Some(other) => bail!(
                "Malformed tag file: expected a mapping of image references for chart {chart:?}, found: {other:?}"
            ),
        }
    }

    pub fn get(&self, chart: &str, image_ref: &str) -> Option<&Value> {
        self.charts.get(chart)?.as_mapping()?.get(image_ref)
    }

    /// Record a resolved pin, replacing whatever was stored for this reference
    pub fn pin(&mut self, chart: &str, image_ref: &str, pin: Pin) -> Result<()> {
        let entry = self
            .charts
            .entry(chart.to_string())
            .or_insert(Value::Null);
        if entry.is_null() {
            *entry = Value::Mapping(Default::default());
        }
        let refs = entry.as_mapping_mut().with_context(|| {
            anyhow!("Malformed tag file: chart {chart:?} is not a mapping of image references")
        })?;
        refs.insert(Value::String(image_ref.to_string()), serde_yaml::to_value(pin)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagfile() -> Result<()> {
        let tags = TagFile::deserialize(
            r#"# comment
app:
  web: null
  worker:
    repository: gcr.io/proj/worker@sha256
    tag: abcdef
db:
"#,
        )?;
        assert_eq!(tags.charts().collect::<Vec<_>>(), vec!["app", "db"]);
        assert_eq!(tags.image_refs("app")?, vec!["web", "worker"]);
        assert_eq!(tags.image_refs("db")?, Vec::<String>::new());
        assert_eq!(tags.get("app", "web"), Some(&Value::Null));
        Ok(())
    }

    #[test]
    fn test_empty_tagfile() -> Result<()> {
        assert_eq!(TagFile::deserialize("")?, TagFile::default());
        assert_eq!(TagFile::deserialize(HEADER)?, TagFile::default());
        Ok(())
    }

    #[test]
    fn test_malformed_chart_entry() -> Result<()> {
        let tags = TagFile::deserialize("app: [web]\n")?;
        assert!(tags.image_refs("app").is_err());
        assert!(TagFile::deserialize("- app\n").is_err());
        Ok(())
    }

    #[test]
    fn test_pin_roundtrip() -> Result<()> {
        let mut tags = TagFile::deserialize("app:\n  web: null\n")?;
        tags.pin("app", "web", Pin::new("gcr.io/proj/web", "sha256", "deadbeef"))?;

        let buf = tags.serialize()?;
        assert!(buf.starts_with(HEADER));
        assert_eq!(
            &buf[HEADER.len()..],
            "app:\n  web:\n    repository: gcr.io/proj/web@sha256\n    tag: deadbeef\n"
        );

        let tags = TagFile::deserialize(&buf)?;
        let pin = serde_yaml::from_value::<Pin>(
            tags.get("app", "web").cloned().context("Missing pin")?,
        )?;
        assert_eq!(
            pin,
            Pin {
                repository: "gcr.io/proj/web@sha256".to_string(),
                tag: "deadbeef".to_string(),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let tags = TagFile::load(&dir.path().join("hashtags.yaml")).await?;
        assert_eq!(tags, TagFile::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_write_and_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("hashtags.yaml");

        let mut tags = TagFile::default();
        tags.pin("app", "web", Pin::new("r", "sha256", "aaa"))?;
        tags.write(&path)?;

        let loaded = TagFile::load(&path).await?;
        assert_eq!(loaded, tags);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path)?.permissions().mode() & 0o777;
            assert_eq!(mode & 0o600, 0o600);
            assert_eq!(mode & !0o666, 0);
        }
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_keeps_existing_permissions() -> Result<()> {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("hashtags.yaml");
        fs::write(&path, "app:\n  web: null\n").await?;
        std::fs::set_permissions(&path, Permissions::from_mode(0o640))?;

        let mut tags = TagFile::load(&path).await?;
        tags.pin("app", "web", Pin::new("r", "sha256", "aaa"))?;
        tags.write(&path)?;

        let mode = std::fs::metadata(&path)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
        assert_eq!(TagFile::load(&path).await?, tags);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("hashtags.yaml");
        fs::write(&path, "app: [unclosed\n").await?;
        assert!(TagFile::load(&path).await.is_err());
        Ok(())
    }
}
