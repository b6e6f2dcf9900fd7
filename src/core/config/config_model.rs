// Bot configuration, matching the original config.json shape.
//
// The file uses a few polymorphic unions (a delay can be a number of
// milliseconds, a duration string, `false`, or an `{ auto, manual }` split).
// Those are deserialized into `RawDelay` and resolved exactly once at load
// time; nothing downstream re-parses the union shape per event.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid delay for {field}: {reason}")]
    InvalidDelay { field: &'static str, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// A delay value as written in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDelay {
    Millis(i64),
    Text(String),
    Flag(bool),
    Split {
        auto: Box<RawDelay>,
        manual: Box<RawDelay>,
    },
}

/// A delay policy after load-time resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelaySetting {
    Disabled,
    After(Duration),
}

impl RawDelay {
    /// Resolve a single-valued delay. `false` disables the feature; a split
    /// value is rejected for fields that don't support one.
    pub fn resolve(&self, field: &'static str) -> Result<DelaySetting, ConfigError> {
        match self {
            RawDelay::Millis(ms) if *ms >= 0 => {
                Ok(DelaySetting::After(Duration::from_millis(*ms as u64)))
            }
            RawDelay::Millis(ms) => Err(ConfigError::InvalidDelay {
                field,
                reason: format!("negative delay {ms}"),
            }),
            RawDelay::Text(text) => parse_duration_str(text)
                .map(DelaySetting::After)
                .ok_or_else(|| ConfigError::InvalidDelay {
                    field,
                    reason: format!("unparsable duration {text:?}"),
                }),
            RawDelay::Flag(false) => Ok(DelaySetting::Disabled),
            RawDelay::Flag(true) => Err(ConfigError::InvalidDelay {
                field,
                reason: "`true` is not a delay".to_string(),
            }),
            RawDelay::Split { .. } => Err(ConfigError::InvalidValue {
                field,
                reason: "auto/manual split is not supported for this field".to_string(),
            }),
        }
    }

    /// Resolve a delay that may carry an `{ auto, manual }` split. A single
    /// value applies to both kinds.
    pub fn resolve_split(
        &self,
        field: &'static str,
    ) -> Result<(DelaySetting, DelaySetting), ConfigError> {
        match self {
            RawDelay::Split { auto, manual } => {
                Ok((auto.resolve(field)?, manual.resolve(field)?))
            }
            other => {
                let single = other.resolve(field)?;
                Ok((single, single))
            }
        }
    }

    /// Resolve a time window: `Some(duration)`, or `None` when disabled.
    pub fn resolve_window(&self, field: &'static str) -> Result<Option<Duration>, ConfigError> {
        match self.resolve(field)? {
            DelaySetting::After(d) => Ok(Some(d)),
            DelaySetting::Disabled => Ok(None),
        }
    }
}

/// Parse a duration string like "500ms", "30s", "5m", "2 hours" or a bare
/// number of milliseconds.
pub fn parse_duration_str(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    // Bare digits are milliseconds, matching the numeric form.
    if input.chars().all(|c| c.is_ascii_digit()) && !input.is_empty() {
        return input.parse().ok().map(Duration::from_millis);
    }

    if let Some(duration) = parse_compact_format(&input) {
        return Some(duration);
    }

    parse_verbose_format(&input)
}

/// Parse compact formats like "500ms", "30s", "5m", "2h", "1d", "1w".
fn parse_compact_format(input: &str) -> Option<Duration> {
    let (num_str, unit_ms) = if let Some(rest) = input.strip_suffix("ms") {
        (rest.trim(), 1u64)
    } else if let Some(rest) = input.strip_suffix('s') {
        (rest.trim(), 1_000)
    } else if let Some(rest) = input.strip_suffix('m') {
        (rest.trim(), 60_000)
    } else if let Some(rest) = input.strip_suffix('h') {
        (rest.trim(), 3_600_000)
    } else if let Some(rest) = input.strip_suffix('d') {
        (rest.trim(), 86_400_000)
    } else if let Some(rest) = input.strip_suffix('w') {
        (rest.trim(), 604_800_000)
    } else {
        return None;
    };

    if num_str.is_empty() || !num_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let number: u64 = num_str.parse().ok()?;
    Some(Duration::from_millis(number.checked_mul(unit_ms)?))
}

/// Parse verbose formats like "30 seconds", "5 minutes", "2 hours".
fn parse_verbose_format(input: &str) -> Option<Duration> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.len() != 2 {
        return None;
    }

    let number: u64 = parts[0].parse().ok()?;
    let unit_ms = match parts[1] {
        "millisecond" | "milliseconds" | "ms" => 1,
        "second" | "seconds" | "sec" | "secs" => 1_000,
        "minute" | "minutes" | "min" | "mins" => 60_000,
        "hour" | "hours" | "hr" | "hrs" => 3_600_000,
        "day" | "days" => 86_400_000,
        "week" | "weeks" => 604_800_000,
        _ => return None,
    };

    Some(Duration::from_millis(number.checked_mul(unit_ms)?))
}

/// Identity of a master: numeric user id or username.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MasterId {
    Id(i64),
    Username(String),
}

/// One master or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MasterList {
    One(MasterId),
    Many(Vec<MasterId>),
}

impl MasterList {
    fn iter(&self) -> impl Iterator<Item = &MasterId> {
        match self {
            MasterList::One(one) => std::slice::from_ref(one).iter(),
            MasterList::Many(many) => many.iter(),
        }
    }

    pub fn contains_id(&self, id: i64) -> bool {
        self.iter()
            .any(|m| matches!(m, MasterId::Id(master) if *master == id))
    }

    pub fn contains_username(&self, username: &str) -> bool {
        let username = username.trim_start_matches('@');
        self.iter().any(|m| match m {
            MasterId::Username(name) => {
                name.trim_start_matches('@').eq_ignore_ascii_case(username)
            }
            MasterId::Id(_) => false,
        })
    }
}

/// A notification target chat, or `false` to disable the feature.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum ChatTarget {
    Chat(i64),
    Disabled(bool),
}

impl ChatTarget {
    pub fn id(&self) -> Option<i64> {
        match self {
            ChatTarget::Chat(id) => Some(*id),
            ChatTarget::Disabled(_) => None,
        }
    }
}

impl Default for ChatTarget {
    fn default() -> Self {
        ChatTarget::Disabled(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTargets {
    #[serde(default)]
    pub presence_log: ChatTarget,

    #[serde(default)]
    pub report: ChatTarget,
}

/// Which command messages get deleted. Defaults to `own`: leave commands
/// meant for other bots alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteCommandsMode {
    All,
    #[default]
    Own,
    None,
}

/// Length-triggered deletion, independent of the category policies.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeleteCustom {
    pub longer_than: u64,
    pub after: RawDelay,
}

/// Whitelisted links and usernames, or `false` to disable whitelisting.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExcludeLinks {
    List(Vec<String>),
    Flag(bool),
}

impl ExcludeLinks {
    pub fn entries(&self) -> &[String] {
        match self {
            ExcludeLinks::List(list) => list,
            ExcludeLinks::Flag(_) => &[],
        }
    }
}

impl Default for ExcludeLinks {
    fn default() -> Self {
        ExcludeLinks::List(Vec::new())
    }
}

/// The whole config file. Read once at startup, treated as an immutable
/// value object from then on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub master: MasterList,

    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub chats: ChatTargets,

    #[serde(default)]
    pub delete_commands: DeleteCommandsMode,

    #[serde(default)]
    pub delete_custom: Option<RawDeleteCustom>,

    #[serde(default)]
    pub delete_joins_after: Option<RawDelay>,

    #[serde(default)]
    pub delete_warns_after: Option<RawDelay>,

    #[serde(default)]
    pub delete_bans_after: Option<RawDelay>,

    #[serde(default)]
    pub blacklisted_domains: Vec<String>,

    #[serde(default)]
    pub exclude_links: ExcludeLinks,

    #[serde(default)]
    pub expire_warns_after: Option<RawDelay>,

    pub number_of_warns_to_ban: u32,

    // Plugin loading is out of scope; the field is carried so existing
    // config files round-trip.
    #[serde(default)]
    pub plugins: Vec<String>,

    // Attached to the /groups reply by the original bot; carried for config
    // compatibility.
    #[allow(dead_code)]
    #[serde(default)]
    pub groups_inline_keyboard: Option<serde_json::Value>,

    #[serde(default)]
    pub warn_inline_keyboard: Option<serde_json::Value>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config: Config = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve every delay eagerly so a bad value fails at startup rather
    /// than on the first event that needs it.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.number_of_warns_to_ban == 0 {
            return Err(ConfigError::InvalidValue {
                field: "numberOfWarnsToBan",
                reason: "must be at least 1".to_string(),
            });
        }

        if let Some(raw) = &self.delete_joins_after {
            raw.resolve("deleteJoinsAfter")?;
        }
        if let Some(raw) = &self.delete_warns_after {
            raw.resolve_split("deleteWarnsAfter")?;
        }
        if let Some(raw) = &self.delete_bans_after {
            raw.resolve("deleteBansAfter")?;
        }
        if let Some(custom) = &self.delete_custom {
            custom.after.resolve("deleteCustom.after")?;
        }
        self.expire_warns_after()?;

        Ok(())
    }

    /// Warning expiry window; `None` means warnings never expire.
    pub fn expire_warns_after(&self) -> Result<Option<Duration>, ConfigError> {
        match &self.expire_warns_after {
            Some(raw) => raw.resolve_window("expireWarnsAfter"),
            None => Ok(None),
        }
    }
}
