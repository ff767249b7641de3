//! Конфигурация геймплея.
//!
//! - `GameplayConfig`: runtime флаги (tick rate, debug drawing, log level)
//! - `WeaponDefinitions`: шаблоны оружия (hardcoded defaults + JSON)
//!
//! Ошибки возникают только на границе загрузки (`ConfigError`), дальше по
//! геймплею ходят уже провалидированные значения.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::logger::{set_log_level, LogLevel};

pub mod definitions;

pub use definitions::{WeaponDefinition, WeaponDefinitions};

/// Ошибки загрузки/валидации конфигурации
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("weapon '{weapon}': {field} = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        weapon: String,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("duplicate weapon definition '{0}'")]
    Duplicate(String),

    #[error("unknown weapon definition '{0}'")]
    UnknownWeapon(String),

    #[error("loadout has {0} weapons, at most 3 slots available")]
    LoadoutTooLarge(usize),
}

/// Runtime конфигурация (Resource)
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Частота FixedUpdate (GameplayTick)
    pub tick_rate_hz: f64,
    /// Debug-сферы взрывов и трассеров (вместо глобальной console variable)
    pub debug_weapon_drawing: bool,
    pub log_level: LogLevel,
    /// Оружие, которое получает каждый новый персонаж
    pub default_loadout: Vec<String>,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            debug_weapon_drawing: false,
            log_level: LogLevel::Info,
            default_loadout: vec![
                "assault_rifle".to_string(),
                "shotgun".to_string(),
                "grenade_launcher".to_string(),
            ],
        }
    }
}

impl GameplayConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Проверяет, что default loadout ссылается на существующие шаблоны
    pub fn validate(&self, definitions: &WeaponDefinitions) -> Result<(), ConfigError> {
        if self.default_loadout.len() > crate::loadout::LOADOUT_SLOTS {
            return Err(ConfigError::LoadoutTooLarge(self.default_loadout.len()));
        }

        match self
            .default_loadout
            .iter()
            .find(|id| definitions.get(id).is_none())
        {
            Some(missing) => Err(ConfigError::UnknownWeapon(missing.clone())),
            None => Ok(()),
        }
    }

    pub fn apply_logging(&self) {
        set_log_level(self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameplayConfig::default();
        assert!(config.validate(&WeaponDefinitions::default()).is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GameplayConfig::from_json(r#"{ "debug_weapon_drawing": true }"#).expect("valid json");
        assert!(config.debug_weapon_drawing);
        assert_eq!(config.tick_rate_hz, 60.0);
        assert_eq!(config.default_loadout.len(), 3);
    }

    #[test]
    fn test_unknown_loadout_weapon_rejected() {
        let config = GameplayConfig {
            default_loadout: vec!["railgun".to_string()],
            ..Default::default()
        };

        let err = config.validate(&WeaponDefinitions::default()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownWeapon(id) if id == "railgun"));
    }

    #[test]
    fn test_oversized_loadout_rejected() {
        let config = GameplayConfig {
            default_loadout: vec!["assault_rifle".to_string(); 4],
            ..Default::default()
        };

        assert!(matches!(
            config.validate(&WeaponDefinitions::default()),
            Err(ConfigError::LoadoutTooLarge(4))
        ));
    }

    #[test]
    fn test_broken_json_is_parse_error() {
        assert!(matches!(
            GameplayConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
