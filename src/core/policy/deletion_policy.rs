// Deletion policy resolution - maps an event category to an effective delay.
//
// The polymorphic config values are flattened into this table once at
// startup. `resolve` is pure and read-only after that; the moderation engine
// never schedules a timer for a category that resolves to Disabled.

use crate::core::config::{Config, ConfigError, DelaySetting, DeleteCommandsMode};
use std::time::Duration;

/// Whether a command message was addressed to this bot or to another bot
/// (`/cmd@OtherBot`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandScope {
    ThisBot,
    OtherBot,
}

/// Event categories subject to auto-deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteCategory {
    Command(CommandScope),
    Join,
    Leave,
    WarnAuto,
    WarnManual,
    Ban,
}

#[derive(Debug, Clone, Copy)]
struct CustomDeletion {
    longer_than: usize,
    after: Duration,
}

/// Flat per-category delay table.
#[derive(Debug, Clone)]
pub struct DeletionPolicies {
    command_mode: DeleteCommandsMode,
    join: DelaySetting,
    leave: DelaySetting,
    warn_auto: DelaySetting,
    warn_manual: DelaySetting,
    ban: DelaySetting,
    custom: Option<CustomDeletion>,
}

impl DeletionPolicies {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        // deleteJoinsAfter covers both join and leave service messages.
        let join_leave = match &config.delete_joins_after {
            Some(raw) => raw.resolve("deleteJoinsAfter")?,
            None => DelaySetting::Disabled,
        };

        let (warn_auto, warn_manual) = match &config.delete_warns_after {
            Some(raw) => raw.resolve_split("deleteWarnsAfter")?,
            None => (DelaySetting::Disabled, DelaySetting::Disabled),
        };

        let ban = match &config.delete_bans_after {
            Some(raw) => raw.resolve("deleteBansAfter")?,
            None => DelaySetting::Disabled,
        };

        let custom = match &config.delete_custom {
            Some(raw) => match raw.after.resolve("deleteCustom.after")? {
                DelaySetting::After(after) => Some(CustomDeletion {
                    longer_than: raw.longer_than as usize,
                    after,
                }),
                DelaySetting::Disabled => None,
            },
            None => None,
        };

        Ok(Self {
            command_mode: config.delete_commands,
            join: join_leave,
            leave: join_leave,
            warn_auto,
            warn_manual,
            ban,
            custom,
        })
    }

    /// Effective delay for an event category.
    pub fn resolve(&self, category: DeleteCategory) -> DelaySetting {
        match category {
            DeleteCategory::Command(scope) => match (self.command_mode, scope) {
                (DeleteCommandsMode::All, _) => DelaySetting::After(Duration::ZERO),
                (DeleteCommandsMode::Own, CommandScope::ThisBot) => {
                    DelaySetting::After(Duration::ZERO)
                }
                (DeleteCommandsMode::Own, CommandScope::OtherBot) => DelaySetting::Disabled,
                (DeleteCommandsMode::None, _) => DelaySetting::Disabled,
            },
            DeleteCategory::Join => self.join,
            DeleteCategory::Leave => self.leave,
            DeleteCategory::WarnAuto => self.warn_auto,
            DeleteCategory::WarnManual => self.warn_manual,
            DeleteCategory::Ban => self.ban,
        }
    }

    /// Length-triggered deletion, independent of the category policies.
    /// Returns the delay when the message's character count strictly exceeds
    /// the configured threshold.
    pub fn custom_delay(&self, text: &str) -> Option<Duration> {
        let custom = self.custom.as_ref()?;
        (text.chars().count() > custom.longer_than).then_some(custom.after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    fn policies(json: &str) -> DeletionPolicies {
        let config: Config = serde_json::from_str(json).unwrap();
        DeletionPolicies::from_config(&config).unwrap()
    }

    #[test]
    fn disabled_iff_configured_false() {
        let table = policies(
            r#"{
                "master": 1,
                "numberOfWarnsToBan": 3,
                "deleteJoinsAfter": false,
                "deleteWarnsAfter": 5000,
                "deleteBansAfter": false
            }"#,
        );

        assert_eq!(table.resolve(DeleteCategory::Join), DelaySetting::Disabled);
        assert_eq!(table.resolve(DeleteCategory::Leave), DelaySetting::Disabled);
        assert_eq!(table.resolve(DeleteCategory::Ban), DelaySetting::Disabled);
        assert_eq!(
            table.resolve(DeleteCategory::WarnAuto),
            DelaySetting::After(Duration::from_secs(5))
        );
        assert_eq!(
            table.resolve(DeleteCategory::WarnManual),
            DelaySetting::After(Duration::from_secs(5))
        );
    }

    #[test]
    fn warn_split_overrides_per_kind() {
        let table = policies(
            r#"{
                "master": 1,
                "numberOfWarnsToBan": 3,
                "deleteWarnsAfter": { "auto": 1000, "manual": false }
            }"#,
        );

        assert_eq!(
            table.resolve(DeleteCategory::WarnAuto),
            DelaySetting::After(Duration::from_secs(1))
        );
        assert_eq!(
            table.resolve(DeleteCategory::WarnManual),
            DelaySetting::Disabled
        );
    }

    #[test]
    fn command_mode_own_spares_other_bots() {
        let table = policies(r#"{ "master": 1, "numberOfWarnsToBan": 3 }"#);

        assert_eq!(
            table.resolve(DeleteCategory::Command(CommandScope::ThisBot)),
            DelaySetting::After(Duration::ZERO)
        );
        assert_eq!(
            table.resolve(DeleteCategory::Command(CommandScope::OtherBot)),
            DelaySetting::Disabled
        );
    }

    #[test]
    fn command_mode_all_and_none() {
        let all = policies(
            r#"{ "master": 1, "numberOfWarnsToBan": 3, "deleteCommands": "all" }"#,
        );
        assert_eq!(
            all.resolve(DeleteCategory::Command(CommandScope::OtherBot)),
            DelaySetting::After(Duration::ZERO)
        );

        let none = policies(
            r#"{ "master": 1, "numberOfWarnsToBan": 3, "deleteCommands": "none" }"#,
        );
        assert_eq!(
            none.resolve(DeleteCategory::Command(CommandScope::ThisBot)),
            DelaySetting::Disabled
        );
    }

    #[test]
    fn unconfigured_categories_default_to_disabled() {
        let table = policies(r#"{ "master": 1, "numberOfWarnsToBan": 3 }"#);

        for category in [
            DeleteCategory::Join,
            DeleteCategory::Leave,
            DeleteCategory::WarnAuto,
            DeleteCategory::WarnManual,
            DeleteCategory::Ban,
        ] {
            assert_eq!(table.resolve(category), DelaySetting::Disabled);
        }
    }

    #[test]
    fn custom_policy_is_strictly_greater_than() {
        let table = policies(
            r#"{
                "master": 1,
                "numberOfWarnsToBan": 3,
                "deleteCustom": { "longerThan": 5, "after": 2000 }
            }"#,
        );

        assert_eq!(table.custom_delay("12345"), None);
        assert_eq!(
            table.custom_delay("123456"),
            Some(Duration::from_secs(2))
        );
        // Multi-byte characters count as one.
        assert_eq!(table.custom_delay("ääääää"), Some(Duration::from_secs(2)));
        assert_eq!(table.custom_delay("äääää"), None);
    }

    #[test]
    fn custom_policy_absent_or_disabled_never_fires() {
        let absent = policies(r#"{ "master": 1, "numberOfWarnsToBan": 3 }"#);
        assert_eq!(absent.custom_delay(&"x".repeat(10_000)), None);

        let disabled = policies(
            r#"{
                "master": 1,
                "numberOfWarnsToBan": 3,
                "deleteCustom": { "longerThan": 5, "after": false }
            }"#,
        );
        assert_eq!(disabled.custom_delay(&"x".repeat(10_000)), None);
    }
}
