//! Logging to the terminal with colors

use crate::dispatch::{Author, Inbound};
use log::{Level, LevelFilter};
use serenity::all::{ChannelId, GuildId};
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::sync::LazyLock;

const DEFAULT: &str = "\x1b[0m";
const FG_BLUE: &str = "\x1b[38;5;33m";
const FG_CYAN: &str = "\x1b[36m";
const FG_GRAY: &str = "\x1b[90m";
const FG_GREEN: &str = "\x1b[32m";
const FG_MAGENTA: &str = "\x1b[35m";
const FG_RED: &str = "\x1b[31m";
const FG_YELLOW: &str = "\x1b[33m";

pub const EVENT_TARGET: &str = "mayonk::event";
pub const INTERNAL_TARGET: &str = "mayonk::internal";

pub enum Color {
    Default,
    Event,
    Internal,
    Warn,
    Error,
    User,
    Channel,
    Guild,
    Glue,
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Only print colors when printing to a terminal
        //
        // This won't change during the program's execution, so we can cache it.
        static STDOUT_IS_TERMINAL: LazyLock<bool> =
            LazyLock::new(|| std::io::stdout().is_terminal());

        if !*STDOUT_IS_TERMINAL {
            return Ok(());
        }

        write!(
            f,
            "{}",
            match self {
                Color::Default => DEFAULT,
                Color::Event => FG_YELLOW,
                Color::Internal => FG_MAGENTA,
                Color::Warn => FG_YELLOW,
                Color::Error => FG_RED,
                Color::User => FG_GREEN,
                Color::Channel => FG_CYAN,
                Color::Guild => FG_BLUE,
                Color::Glue => FG_GRAY,
            }
        )
    }
}

#[macro_export]
macro_rules! log_event {
    ($($args:tt)+) => {{
        ::log::info!(target: $crate::logging::EVENT_TARGET, $($args)+)
    }};
}

#[macro_export]
macro_rules! log_internal {
    ($($args:tt)+) => {{
        ::log::info!(target: $crate::logging::INTERNAL_TARGET, $($args)+)
    }};
}

/// Glyph and color prefixed to a record.
fn marker(level: Level, target: &str) -> (Color, char) {
    match level {
        Level::Error => (Color::Error, 'x'),
        Level::Warn => (Color::Warn, '!'),
        _ if target == EVENT_TARGET => (Color::Event, '*'),
        _ if target == INTERNAL_TARGET => (Color::Internal, '+'),
        Level::Info => (Color::Internal, '+'),
        Level::Debug | Level::Trace => (Color::Glue, '.'),
    }
}

/// Install the global logger.
///
/// `RUST_LOG` takes precedence over the `debug` flag.
pub fn init(debug: bool) {
    let level = match debug {
        true => LevelFilter::Debug,
        false => LevelFilter::Info,
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module("mayonk", level)
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            let (color, glyph) = marker(record.level(), record.target());
            writeln!(buf, "{}{}{} {}", color, glyph, Color::Default, record.args())
        });

    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    // Tests and tools may have installed a logger already.
    let _ = builder.try_init();
}

/// Log panics and append them to `<directory>/panics.log`.
///
/// Panics inside a dispatch are contained by the dispatcher, tokio contains panics in other
/// tasks, so the process keeps running; the hook only makes sure they are not lost.
pub fn install_panic_hook(directory: &Path) {
    let path = directory.join("panics.log");
    std::panic::set_hook(Box::new(move |info| {
        let thread = std::thread::current();
        let line = format!(
            "[{}] thread '{}' {}",
            chrono::Utc::now().to_rfc3339(),
            thread.name().unwrap_or("<unnamed>"),
            info
        );
        log::error!("{}", line);
        if let Err(e) = append_line(&path, &line) {
            log::error!("Could not record panic in `{}`: {}", path.to_string_lossy(), e);
        }
    }));
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}\n", line)
}

pub trait PrintColor {
    fn color(&self) -> String;
}

// Field separator
pub struct Glue;
impl PrintColor for Glue {
    fn color(&self) -> String {
        format!("{}{}{}", Color::Glue, ":", Color::Default)
    }
}

impl PrintColor for Author {
    fn color(&self) -> String {
        format!("{}{}{}", Color::User, self.name.as_str(), Color::Default)
    }
}

impl PrintColor for ChannelId {
    fn color(&self) -> String {
        format!("{}#{}{}", Color::Channel, self, Color::Default)
    }
}

impl PrintColor for Option<GuildId> {
    fn color(&self) -> String {
        match self {
            Some(guild_id) => format!("{}{}{}", Color::Guild, guild_id, Color::Default),
            None => format!("{}<direct-message>{}", Color::Guild, Color::Default),
        }
    }
}

impl PrintColor for Inbound {
    /// `guild:channel:user`, the location prefix used by every dispatch log line.
    fn color(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.guild_id.color(),
            Glue.color(),
            self.channel_id.color(),
            Glue.color(),
            self.author.color(),
        )
    }
}
