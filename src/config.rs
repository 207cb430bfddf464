use anyhow::{anyhow, bail, Result};
use serenity::all::{GuildId, RoleId, UserId};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/mayonk/config.toml";

/// Longest accepted rate limit window or cooldown, one day.
const MAX_PERIOD_SECS: u64 = 86_400;

/// Bot configuration
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub roles: Roles,
    pub rate_limit: RateLimit,
    pub cooldowns: Cooldowns,
    pub timeouts: Timeouts,
    pub blacklist: Blacklist,
    pub commands: Commands,
    pub messages: Messages,
    pub logging: Logging,
    pub status: Status,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct General {
    pub discord_token: String,
    pub command_prefix: String,
    /// Users that bypass every permission check.
    pub owners: Vec<UserId>,
    pub allow_dm: bool,
    pub maintenance: bool,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Roles {
    pub admin_roles: Vec<RoleId>,
    pub mod_roles: Vec<RoleId>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RateLimit {
    pub enabled: bool,
    pub window_ms: u64,
    pub max_per_window: usize,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Cooldowns {
    pub enabled: bool,
    pub default_seconds: u64,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub command_ms: u64,
    pub shutdown_grace_ms: u64,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Blacklist {
    pub users: Vec<UserId>,
    pub guilds: Vec<GuildId>,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Commands {
    /// Commands that stay resolvable but refuse to run.
    pub disabled: Vec<String>,
    /// Extra aliases per canonical command name.
    pub aliases: HashMap<String, Vec<String>>,
}

/// User facing reply templates.
///
/// `{time}` is replaced by remaining seconds, `{command}` by the command name and `{error}` by
/// the handler's error message.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Messages {
    pub error: String,
    pub no_permission: String,
    pub command_disabled: String,
    pub rate_limited: String,
    pub cooldown: String,
    pub maintenance: String,
    pub timeout: String,
    /// Answer to a slash command that is not registered.
    pub unknown_command: String,
    /// Answer to a slash command used in a direct message while `allow_dm` is off.
    pub direct_messages: String,
    pub shutting_down: String,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Logging {
    pub directory: PathBuf,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Status {
    /// Presence text. `{prefix}` and `{version}` are substituted.
    pub activity: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            command_prefix: ".".to_owned(),
            owners: Vec::new(),
            allow_dm: true,
            maintenance: false,
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 60_000,
            max_per_window: 30,
        }
    }
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self {
            enabled: false,
            default_seconds: 3,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command_ms: 30_000,
            shutdown_grace_ms: 10_000,
        }
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            error: "❌ An error occurred while running `{command}`: {error}".to_owned(),
            no_permission: "🚫 You don't have permission to use this command.".to_owned(),
            command_disabled: "🔒 This command is currently disabled.".to_owned(),
            rate_limited: "⏳ You're being rate limited. Try again in {time} seconds.".to_owned(),
            cooldown: "⏰ Please wait {time} seconds before using this command again.".to_owned(),
            maintenance: "🔧 The bot is currently under maintenance.".to_owned(),
            timeout: "⌛ `{command}` took too long and was stopped.".to_owned(),
            unknown_command: "❓ That command doesn't exist.".to_owned(),
            direct_messages: "📭 Commands are not available in direct messages.".to_owned(),
            shutting_down: "👋 The bot is restarting, try again in a moment.".to_owned(),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self {
            activity: "{prefix}help | v{version}".to_owned(),
        }
    }
}

impl RateLimit {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Cooldowns {
    /// Cooldown applied to commands that do not declare their own.
    pub fn default_cooldown(&self) -> Option<Duration> {
        match self.enabled && self.default_seconds > 0 {
            true => Some(Duration::from_secs(self.default_seconds)),
            false => None,
        }
    }
}

impl Timeouts {
    pub fn command(&self) -> Duration {
        Duration::from_millis(self.command_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    /// Load the configuration from `path`, or from the default location.
    ///
    /// A missing file is replaced by a default one, but startup still fails so the operator can
    /// fill in the token first.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            Self::default().save(&path).await?;
            bail!(
                "No configuration found, wrote defaults to `{}`. Edit it and restart.",
                path.to_string_lossy()
            );
        }

        let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
            anyhow!(
                "Could not open configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).await.map_err(|e| {
            anyhow!(
                "Could not read configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        Self::parse(&contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Could not serialize configuration: {}", e))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                anyhow!(
                    "Could not create directory `{}`: {}",
                    parent.to_string_lossy(),
                    e
                )
            })?;
        }

        tokio::fs::write(path, contents).await.map_err(|e| {
            anyhow!(
                "Could not write configuration to `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })
    }

    /// Apply environment overrides, typically populated from `.env`.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            if !token.trim().is_empty() {
                self.general.discord_token = token.trim().to_owned();
            }
        }
        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            if !prefix.trim().is_empty() {
                self.general.command_prefix = prefix.trim().to_owned();
            }
        }
    }

    /// Fatal configuration problems. An empty list means the bot can start.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.general.discord_token.trim().is_empty() {
            problems.push("general.discord_token is empty and DISCORD_TOKEN is not set".to_owned());
        }
        if self.general.command_prefix.is_empty() {
            problems.push("general.command_prefix must not be empty".to_owned());
        }
        if self.general.command_prefix.chars().any(char::is_whitespace) {
            problems.push("general.command_prefix must not contain whitespace".to_owned());
        }
        if self.rate_limit.enabled && self.rate_limit.window_ms == 0 {
            problems.push("rate_limit.window_ms must be positive".to_owned());
        }
        if self.rate_limit.window_ms > MAX_PERIOD_SECS * 1000 {
            problems.push(format!(
                "rate_limit.window_ms must be at most {}",
                MAX_PERIOD_SECS * 1000
            ));
        }
        if self.cooldowns.default_seconds > MAX_PERIOD_SECS {
            problems.push(format!(
                "cooldowns.default_seconds must be at most {}",
                MAX_PERIOD_SECS
            ));
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.general.command_prefix, ".");
        assert_eq!(cfg.rate_limit.window_ms, 60_000);
        assert_eq!(cfg.rate_limit.max_per_window, 30);
        assert_eq!(cfg.timeouts.command(), Duration::from_secs(30));
        assert!(cfg.general.allow_dm);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = Config::parse(
            r#"
            [general]
            discord_token = "abc"
            owners = [42]

            [rate_limit]
            max_per_window = 3

            [commands]
            disabled = ["ping"]
            aliases = { help = ["?"] }
            "#,
        )
        .unwrap();

        assert_eq!(cfg.general.discord_token, "abc");
        assert_eq!(cfg.general.owners, vec![UserId::new(42)]);
        assert_eq!(cfg.general.command_prefix, ".");
        assert_eq!(cfg.rate_limit.max_per_window, 3);
        assert_eq!(cfg.rate_limit.window_ms, 60_000);
        assert_eq!(cfg.commands.disabled, vec!["ping".to_owned()]);
        assert_eq!(cfg.commands.aliases["help"], vec!["?".to_owned()]);
    }

    #[test]
    fn default_cooldown_respects_toggle() {
        let mut cooldowns = Cooldowns::default();
        assert_eq!(cooldowns.default_cooldown(), None);
        cooldowns.enabled = true;
        assert_eq!(cooldowns.default_cooldown(), Some(Duration::from_secs(3)));
        cooldowns.default_seconds = 0;
        assert_eq!(cooldowns.default_cooldown(), None);
    }

    #[test]
    fn missing_token_is_a_problem() {
        let cfg = Config::default();
        assert_eq!(cfg.problems().len(), 1);

        let mut cfg = Config::default();
        cfg.general.discord_token = "token".to_owned();
        assert!(cfg.problems().is_empty());
    }

    #[test]
    fn oversized_periods_are_problems() {
        let mut cfg = Config::default();
        cfg.general.discord_token = "token".to_owned();
        cfg.cooldowns.default_seconds = u64::MAX;
        cfg.rate_limit.window_ms = u64::MAX;
        let problems = cfg.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].starts_with("rate_limit.window_ms"));
        assert!(problems[1].starts_with("cooldowns.default_seconds"));

        cfg.cooldowns.default_seconds = MAX_PERIOD_SECS;
        cfg.rate_limit.window_ms = MAX_PERIOD_SECS * 1000;
        assert!(cfg.problems().is_empty());
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let written = toml::to_string_pretty(&Config::default()).unwrap();
        let cfg = Config::parse(&written).unwrap();
        assert_eq!(cfg.messages.cooldown, Messages::default().cooldown);
    }
}
