use crate::args::Args;
use crate::errors::*;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    /// Query `GET <url>/<image>/<tag>`
    Http { url: String },
    /// List tags below `<repository>/<image>` with an external command
    Command { repository: String, program: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub tagfile: PathBuf,
    pub values: Vec<String>,
    pub set: Vec<String>,
    pub backend: Backend,
    pub dry_run: bool,
}

impl TryFrom<&Args> for Config {
    type Error = Error;

    fn try_from(args: &Args) -> Result<Self> {
        let backend = match (&args.resolver, &args.registry) {
            (Some(url), None) => Backend::Http {
                url: url.trim_end_matches('/').to_string(),
            },
            (None, Some(repository)) => Backend::Command {
                repository: repository.trim_end_matches('/').to_string(),
                program: args.lookup_command.clone(),
            },
            (None, None) => bail!(
                "A resolver must be set: either --resolver <URL> serving GET <url>/<image>/<tag>, or --registry <REPO> to list image tags"
            ),
            (Some(_), Some(_)) => bail!("Only one of --resolver or --registry can be used"),
        };

        let values = args
            .values
            .iter()
            .flat_map(|v| v.split(','))
            .map(String::from)
            .collect();

        Ok(Config {
            tagfile: args.tagfile.clone(),
            values,
            set: args.set.clone(),
            backend,
            dry_run: args.dry_run,
        })
    }
}
