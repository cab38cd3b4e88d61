use crate::errors::*;
use clap::{ArgAction, ArgGroup, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, args_conflicts_with_subcommands = true)]
#[command(group(ArgGroup::new("backend").args(["resolver", "registry"])))]
pub struct Args {
    /// Increase logging output (can be used multiple times)
    #[arg(short, long, global = true, action(ArgAction::Count))]
    pub verbose: u8,
    /// Change the current directory to this path before executing
    #[arg(short = 'C', long)]
    pub context: Option<PathBuf>,
    /// Specify values in a YAML file or a URL (can specify multiple)
    #[arg(short = 'f', long = "values", value_name = "FILE")]
    pub values: Vec<String>,
    /// Set values on the command line (can specify multiple or separate values with commas: key1=val1,key2=val2)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
    /// The hash tag value file to use for repository overrides
    #[arg(long, default_value = "hashtags.yaml")]
    pub tagfile: PathBuf,
    /// The source of truth for resolving docker tags into digest hashes, serving GET <url>/<image>/<tag>
    #[arg(long, value_name = "URL")]
    pub resolver: Option<String>,
    /// Resolve tags by listing images below this registry repository (e.g. gcr.io/my-project)
    #[arg(long, value_name = "REPO")]
    pub registry: Option<String>,
    /// The binary used to list image tags when resolving with --registry
    #[arg(long, value_name = "PATH", default_value = "gcloud")]
    pub lookup_command: String,
    /// Print the updated tag file to stdout instead of writing it
    #[arg(long)]
    pub dry_run: bool,
    #[command(subcommand)]
    pub subcommand: Option<SubCommand>,
}

#[derive(Debug, Subcommand)]
pub enum SubCommand {
    Completions(Completions),
}

/// Generate shell completions
#[derive(Debug, Parser)]
pub struct Completions {
    pub shell: Shell,
}

impl Completions {
    pub fn generate<W: io::Write>(&self, mut w: W) -> Result<()> {
        clap_complete::generate(self.shell, &mut Args::command(), "helm-hashtag", &mut w);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zsh_completions() {
        Completions { shell: Shell::Zsh }
            .generate(io::sink())
            .unwrap();
    }

    #[test]
    fn test_parse_repeated_flags() {
        let args = Args::parse_from([
            "helm-hashtag",
            "-f",
            "a.yaml,b.yaml",
            "--values",
            "c.yaml",
            "--set",
            "app.web.tag=v2",
            "--resolver",
            "https://resolver.example.com",
        ]);
        assert_eq!(args.values, vec!["a.yaml,b.yaml", "c.yaml"]);
        assert_eq!(args.set, vec!["app.web.tag=v2"]);
        assert_eq!(args.tagfile, PathBuf::from("hashtags.yaml"));
        assert_eq!(
            args.resolver.as_deref(),
            Some("https://resolver.example.com")
        );
        assert!(args.subcommand.is_none());
    }

    #[test]
    fn test_backends_conflict() {
        let res = Args::try_parse_from([
            "helm-hashtag",
            "--resolver",
            "https://resolver.example.com",
            "--registry",
            "gcr.io/proj",
        ]);
        assert!(res.is_err());
    }
}
