use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mayonk")]
#[command(about = "A Discord bot with a prefix and slash command dispatcher.")]
#[command(version)]
pub struct Cli {
    /// Let Discord decide how many shards to run.
    #[arg(long)]
    pub shard: bool,
    /// Log at debug level.
    #[arg(long)]
    pub debug: bool,
    /// Run the startup checks and exit.
    #[arg(long)]
    pub test: bool,
    /// Start in maintenance mode. Only owners can run commands.
    #[arg(long)]
    pub maintenance: bool,
    /// Print the loaded commands and exit.
    #[arg(long)]
    pub stats: bool,
    /// Configuration file to use instead of the default location.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from(["mayonk", "--shard", "--debug", "--config", "bot.toml"])
            .unwrap();
        assert!(cli.shard);
        assert!(cli.debug);
        assert!(!cli.test);
        assert_eq!(cli.config, Some(PathBuf::from("bot.toml")));

        let cli = Cli::try_parse_from(["mayonk"]).unwrap();
        assert!(!cli.shard && !cli.maintenance && !cli.stats);
        assert!(cli.config.is_none());
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Cli::try_parse_from(["mayonk", "--turbo"]).is_err());
    }
}
