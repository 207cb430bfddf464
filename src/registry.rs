//! Command lookup by name or alias.
//!
//! The registry is filled once during startup and only read afterwards, so lookups need no
//! locking.

use crate::{command::Command, config, permission::Requirement};
use std::{collections::HashMap, time::Duration};
use thiserror::Error;

/// What a command declares about itself.
#[derive(Clone, Debug)]
pub struct Meta {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    /// Argument synopsis, e.g. `[command]`.
    pub usage: Option<String>,
    pub requirement: Requirement,
    pub enabled: bool,
    /// Overrides the configured default cooldown.
    pub cooldown: Option<Duration>,
    /// Also exposed as a slash command.
    pub slash: bool,
}

impl Meta {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            aliases: Vec::new(),
            description: String::new(),
            usage: None,
            requirement: Requirement::Anyone,
            enabled: true,
            cooldown: None,
            slash: false,
        }
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases
            .extend(aliases.iter().map(|alias| (*alias).to_owned()));
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    pub fn usage(mut self, usage: &str) -> Self {
        self.usage = Some(usage.to_owned());
        self
    }

    pub fn require(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn slash(mut self) -> Self {
        self.slash = true;
        self
    }
}

/// A registered command.
pub struct Descriptor {
    pub name: String,
    pub category: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub usage: Option<String>,
    pub requirement: Requirement,
    pub enabled: bool,
    pub cooldown: Option<Duration>,
    pub slash: bool,
    handler: Box<dyn Command>,
}

impl Descriptor {
    pub fn handler(&self) -> &dyn Command {
        self.handler.as_ref()
    }

    /// `name` followed by its usage synopsis, if any.
    pub fn synopsis(&self) -> String {
        match &self.usage {
            Some(usage) => format!("{} {}", self.name, usage),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command in `{category}` has no name")]
    MissingName { category: String },
    #[error("command name `{0}` contains whitespace")]
    InvalidName(String),
    #[error("`{0}` is already registered")]
    Duplicate(String),
    #[error("alias `{alias}` of `{command}` is invalid or already taken")]
    InvalidAlias { command: String, alias: String },
}

/// Result of loading a whole manifest.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub rejected: Vec<RegistryError>,
    /// Aliases that were dropped while their command was still registered.
    pub dropped_aliases: Vec<RegistryError>,
}

#[derive(Default)]
pub struct Registry {
    commands: Vec<Descriptor>,
    by_name: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under `category` with the metadata it declares.
    pub fn register(
        &mut self,
        category: &str,
        handler: Box<dyn Command>,
    ) -> Result<&Descriptor, RegistryError> {
        let meta = handler.meta();
        self.insert(category, meta, handler, &mut Vec::new())
    }

    fn insert(
        &mut self,
        category: &str,
        meta: Meta,
        handler: Box<dyn Command>,
        dropped: &mut Vec<RegistryError>,
    ) -> Result<&Descriptor, RegistryError> {
        let name = meta.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(RegistryError::MissingName {
                category: category.to_owned(),
            });
        }
        if name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidName(name));
        }
        if self.is_taken(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        let index = self.commands.len();
        self.by_name.insert(name.clone(), index);

        // First registration wins; colliding aliases are dropped, the command is kept.
        let mut aliases = Vec::new();
        for alias in meta.aliases {
            let alias = alias.trim().to_lowercase();
            if alias.is_empty() || alias.chars().any(char::is_whitespace) || self.is_taken(&alias)
            {
                let error = RegistryError::InvalidAlias {
                    command: name.clone(),
                    alias,
                };
                log::warn!("{}", error);
                dropped.push(error);
                continue;
            }
            self.by_alias.insert(alias.clone(), index);
            aliases.push(alias);
        }

        self.commands.push(Descriptor {
            name,
            category: category.to_owned(),
            aliases,
            description: meta.description,
            usage: meta.usage,
            requirement: meta.requirement,
            enabled: meta.enabled,
            cooldown: meta.cooldown,
            slash: meta.slash,
            handler,
        });
        Ok(&self.commands[index])
    }

    fn is_taken(&self, token: &str) -> bool {
        self.by_name.contains_key(token) || self.by_alias.contains_key(token)
    }

    /// Register every entry of `manifest`, applying configured aliases and disabled commands.
    ///
    /// Entries that fail validation are logged and skipped.
    pub fn load(
        &mut self,
        manifest: Vec<(&'static str, Box<dyn Command>)>,
        cfg: &config::Commands,
    ) -> LoadReport {
        let mut report = LoadReport::default();

        for (category, handler) in manifest {
            let mut meta = handler.meta();
            let key = meta.name.trim().to_lowercase();
            if let Some(extra) = cfg.aliases.get(&key) {
                meta.aliases.extend(extra.iter().cloned());
            }
            if cfg.disabled.iter().any(|d| d.eq_ignore_ascii_case(&key)) {
                meta.enabled = false;
            }

            match self.insert(category, meta, handler, &mut report.dropped_aliases) {
                Ok(descriptor) => {
                    log::debug!("Loaded `{}` ({})", descriptor.name, descriptor.category);
                    report.loaded += 1;
                }
                Err(error) => {
                    log::warn!("Skipping command: {}", error);
                    report.rejected.push(error);
                }
            }
        }

        for name in cfg.disabled.iter().chain(cfg.aliases.keys()) {
            if self.get(&name.to_lowercase()).is_none() {
                log::warn!("Configuration names unknown command `{}`", name);
            }
        }

        report
    }

    /// Find a command by name, then by alias. Case-insensitive.
    pub fn resolve(&self, token: &str) -> Option<&Descriptor> {
        let token = token.to_lowercase();
        self.by_name
            .get(&token)
            .or_else(|| self.by_alias.get(&token))
            .map(|index| &self.commands[*index])
    }

    /// Find a command by its exact registered name.
    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.by_name.get(name).map(|index| &self.commands[*index])
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.commands.iter()
    }

    /// Distinct categories in registration order.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for descriptor in &self.commands {
            if !categories.contains(&descriptor.category.as_str()) {
                categories.push(&descriptor.category);
            }
        }
        categories
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CommandContext;
    use anyhow::Result;

    struct Stub(Meta);

    #[serenity::async_trait]
    impl Command for Stub {
        fn meta(&self) -> Meta {
            self.0.clone()
        }

        async fn execute(&self, _ctx: &CommandContext<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn stub(meta: Meta) -> Box<dyn Command> {
        Box::new(Stub(meta))
    }

    #[test]
    fn resolves_names_then_aliases() {
        let mut registry = Registry::new();
        registry
            .register("utility", stub(Meta::new("ping").aliases(&["p", "test"])))
            .unwrap();

        assert_eq!(registry.resolve("ping").unwrap().name, "ping");
        assert_eq!(registry.resolve("P").unwrap().name, "ping");
        assert_eq!(registry.resolve("test").unwrap().name, "ping");
        assert!(registry.resolve("pi").is_none());
        assert!(registry.resolve("pong").is_none());
    }

    #[test]
    fn alias_collision_keeps_first_registration() {
        let mut registry = Registry::new();
        registry
            .register("utility", stub(Meta::new("alpha").aliases(&["x"])))
            .unwrap();
        let beta = registry
            .register("utility", stub(Meta::new("beta").aliases(&["x", "b"])))
            .unwrap();
        assert_eq!(beta.aliases, vec!["b".to_owned()]);

        assert_eq!(registry.resolve("x").unwrap().name, "alpha");
        assert_eq!(registry.resolve("b").unwrap().name, "beta");
        // Losing an alias does not cost the command its own name.
        assert_eq!(registry.resolve("beta").unwrap().name, "beta");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn alias_cannot_shadow_a_name() {
        let mut registry = Registry::new();
        registry.register("a", stub(Meta::new("help"))).unwrap();
        registry
            .register("b", stub(Meta::new("halp").aliases(&["help"])))
            .unwrap();
        assert_eq!(registry.resolve("help").unwrap().name, "help");
    }

    #[test]
    fn invalid_and_duplicate_names_are_rejected() {
        let mut registry = Registry::new();
        registry.register("a", stub(Meta::new("ping"))).unwrap();

        assert_eq!(
            registry.register("a", stub(Meta::new("  "))).err(),
            Some(RegistryError::MissingName {
                category: "a".to_owned()
            })
        );
        assert_eq!(
            registry.register("a", stub(Meta::new("two words"))).err(),
            Some(RegistryError::InvalidName("two words".to_owned()))
        );
        assert_eq!(
            registry.register("b", stub(Meta::new("PING"))).err(),
            Some(RegistryError::Duplicate("ping".to_owned()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_only_matches_names() {
        let mut registry = Registry::new();
        registry
            .register("utility", stub(Meta::new("help").aliases(&["h"])))
            .unwrap();
        assert!(registry.get("help").is_some());
        assert!(registry.get("h").is_none());
    }

    #[test]
    fn load_applies_configuration() {
        let mut cfg = config::Commands::default();
        cfg.disabled = vec!["Ping".to_owned()];
        cfg.aliases
            .insert("help".to_owned(), vec!["?".to_owned(), "p".to_owned()]);

        let manifest = vec![
            ("utility", stub(Meta::new("ping").aliases(&["p"]))),
            ("utility", stub(Meta::new("help"))),
            ("owner", stub(Meta::new("ping"))),
            ("owner", stub(Meta::new("reload"))),
        ];

        let mut registry = Registry::new();
        let report = registry.load(manifest, &cfg);

        assert_eq!(report.loaded, 3);
        assert_eq!(
            report.rejected,
            vec![RegistryError::Duplicate("ping".to_owned())]
        );
        assert_eq!(report.dropped_aliases.len(), 1);
        assert!(!registry.resolve("ping").unwrap().enabled);
        assert!(registry.resolve("help").unwrap().enabled);
        assert_eq!(registry.resolve("?").unwrap().name, "help");
        assert_eq!(registry.resolve("p").unwrap().name, "ping");
        assert_eq!(registry.categories(), vec!["utility", "owner"]);
    }
}
