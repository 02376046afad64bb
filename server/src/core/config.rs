// tag_arena/server/src/core/config.rs
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use super::constants::*;
use super::error::{SimError, SimResult};
use super::types::RadiusClass;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub half_width: f64,
    pub half_height: f64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        VisionConfig {
            half_width: VISION_HALF_WIDTH,
            half_height: VISION_HALF_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub margin: f64,
    /// Classes built at map load. Classes first seen later are built on demand.
    pub radius_classes: Vec<u8>,
    pub max_radius_class: u8,
}

impl Default for NavConfig {
    fn default() -> Self {
        NavConfig {
            margin: WAYPOINT_MARGIN,
            radius_classes: vec![RadiusClass::for_radius(CHARACTER_RADIUS).0],
            max_radius_class: MAX_RADIUS_CLASS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub stuck_limit_ms: u64,
    pub arrive_radius: f64,
    pub too_close_radius: f64,
    pub block_check_distance: f64,
    pub flee_extrapolation: f64,
    pub count: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            stuck_limit_ms: BOT_STUCK_LIMIT_MS,
            arrive_radius: BOT_ARRIVE_RADIUS,
            too_close_radius: BOT_TOO_CLOSE_RADIUS,
            block_check_distance: BOT_BLOCK_CHECK_DISTANCE,
            flee_extrapolation: BOT_FLEE_EXTRAPOLATION,
            count: DEFAULT_BOT_COUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub ready_delay_ms: u64,
    pub prop_respawn_ms: u64,
    pub move_force: f64,
    pub character_radius: f64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            ready_delay_ms: READY_DELAY_MS,
            prop_respawn_ms: PROP_RESPAWN_MS,
            move_force: CHARACTER_MOVE_FORCE,
            character_radius: CHARACTER_RADIUS,
        }
    }
}

/// Debug overlay toggles. They only gate transient records; decisions never read them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugToggles {
    pub show_pathing: bool,
    pub show_exploration: bool,
    pub show_sightlines: bool,
    pub show_lost: bool,
}

impl DebugToggles {
    pub fn any(&self) -> bool {
        self.show_pathing || self.show_exploration || self.show_sightlines || self.show_lost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_rate: u64,
    pub seed: u64,
    pub vision: VisionConfig,
    pub nav: NavConfig,
    pub bots: BotConfig,
    pub rules: RulesConfig,
    pub debug: DebugToggles,
    pub metrics_listen: Option<SocketAddr>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            tick_rate: SERVER_TICK_RATE,
            seed: 0x7a6_a7e,
            vision: VisionConfig::default(),
            nav: NavConfig::default(),
            bots: BotConfig::default(),
            rules: RulesConfig::default(),
            debug: DebugToggles::default(),
            metrics_listen: None,
        }
    }
}

impl SimConfig {
    pub fn from_yaml_str(text: &str) -> SimResult<Self> {
        let config: SimConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.tick_rate == 0 {
            return Err(SimError::Config("tick_rate must be positive".into()));
        }
        if self.vision.half_width <= 0.0 || self.vision.half_height <= 0.0 {
            return Err(SimError::Config("vision extents must be positive".into()));
        }
        if self.nav.margin < 0.0 {
            return Err(SimError::Config("nav.margin must not be negative".into()));
        }
        if self.nav.max_radius_class == 0 || self.nav.max_radius_class > MAX_RADIUS_CLASS {
            return Err(SimError::Config(format!(
                "nav.max_radius_class must be within 1..={}",
                MAX_RADIUS_CLASS
            )));
        }
        if self.rules.character_radius <= 1.0 {
            return Err(SimError::Config("rules.character_radius must exceed 1".into()));
        }
        Ok(())
    }

    pub fn tick_seconds(&self) -> f64 {
        1.0 / self.tick_rate as f64
    }

    pub fn tick_millis(&self) -> u64 {
        (1000 / self.tick_rate).max(1)
    }

    /// Bucket an agent radius, honouring the configured cap.
    pub fn radius_class(&self, radius: f64) -> RadiusClass {
        let class = RadiusClass::for_radius(radius);
        RadiusClass(class.0.min(self.nav.max_radius_class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_fills_defaults() {
        let config = SimConfig::from_yaml_str(
            "tick_rate: 30\ndebug:\n  show_pathing: true\nbots:\n  count: 2\n",
        )
        .unwrap();
        assert_eq!(config.tick_rate, 30);
        assert!(config.debug.show_pathing);
        assert!(!config.debug.show_lost);
        assert_eq!(config.bots.count, 2);
        assert_eq!(config.bots.flee_extrapolation, BOT_FLEE_EXTRAPOLATION);
        assert_eq!(config.vision, VisionConfig::default());
    }

    #[test]
    fn rejects_zero_tick_rate() {
        assert!(matches!(
            SimConfig::from_yaml_str("tick_rate: 0\n"),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn radius_class_respects_configured_cap() {
        let mut config = SimConfig::default();
        config.nav.max_radius_class = 20;
        assert_eq!(config.radius_class(35.0), RadiusClass(20));
        assert_eq!(config.radius_class(CHARACTER_RADIUS), RadiusClass(16));
    }
}
