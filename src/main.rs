use clap::Parser;
use env_logger::Env;
use helm_hashtag::args::{Args, SubCommand};
use helm_hashtag::config::Config;
use helm_hashtag::errors::*;
use helm_hashtag::fetch::{self, Getters};
use helm_hashtag::http;
use helm_hashtag::resolver;
use helm_hashtag::tagfile::TagFile;
use helm_hashtag::update;
use std::env;
use std::io::{self, Write};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::init_from_env(Env::default().default_filter_or(log_level));

    if let Some(path) = &args.context {
        debug!("Changing current directory to {path:?}...");
        env::set_current_dir(path)
            .with_context(|| anyhow!("Failed to switch to directory {path:?}"))?;
    }

    if let Some(SubCommand::Completions(completions)) = &args.subcommand {
        return completions.generate(io::stdout());
    }

    let config = Config::try_from(&args)?;
    debug!("Using configuration: {config:?}");

    let mut tags = TagFile::load(&config.tagfile).await?;

    let client = http::Client::new()?;
    let getters = Getters::new(&client);
    let values = fetch::load_values(&getters, &config.values, &config.set).await?;
    trace!("Merged values: {values:?}");

    let resolver = resolver::from_backend(&config.backend, &client);
    update::update(&mut tags, &values, resolver.as_ref()).await?;

    if config.dry_run {
        let buf = tags.serialize()?;
        io::stdout().write_all(buf.as_bytes())?;
    } else {
        debug!("Updating tag file: {:?}", config.tagfile);
        tags.write(&config.tagfile)?;
    }

    Ok(())
}
