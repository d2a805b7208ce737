//! Game-mode configuration.
//!
//! Everything here is plain data with serde defaults, so a config file may
//! name only the values it changes. Load with [`ModeConfig::from_json`],
//! which parses, validates and clamps in one go.

use std::time::Duration;

use outbreak_protocol::{Buttons, Color, Gender};
use outbreak_round::RoundConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Top-level configuration for the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    pub round: RoundConfig,
    pub respawn: RespawnConfig,
    pub rewards: RewardConfig,
    pub economy: EconomyConfig,
    pub leveling: LevelingConfig,
    pub classes: ClassConfig,
    pub input: InputConfig,
    pub ambience: AmbienceConfig,
    /// Timer resolution of the actor loop.
    pub frame_rate_hz: u32,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            round: RoundConfig::default(),
            respawn: RespawnConfig::default(),
            rewards: RewardConfig::default(),
            economy: EconomyConfig::default(),
            leveling: LevelingConfig::default(),
            classes: ClassConfig::default(),
            input: InputConfig::default(),
            ambience: AmbienceConfig::default(),
            frame_rate_hz: 10,
        }
    }
}

impl ModeConfig {
    /// Parses, validates and clamps a JSON config.
    ///
    /// # Errors
    /// - [`ConfigError::Parse`] — malformed JSON or wrong field types
    /// - any error [`validate`](Self::validate) reports
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config.validated())
    }

    /// Rejects configs the controller can't run with.
    ///
    /// # Errors
    /// - [`ConfigError::EmptyClassList`] — no human or no zombie class
    /// - [`ConfigError::EmptyWeaponPool`] — a survivor pool is empty or
    ///   carries no weight
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.classes.humans.is_empty() {
            return Err(ConfigError::EmptyClassList("humans"));
        }
        if self.classes.zombies.is_empty() {
            return Err(ConfigError::EmptyClassList("zombies"));
        }
        for (field, pool) in [
            ("survivor_weapons.humans", &self.classes.survivor_weapons.humans),
            ("survivor_weapons.bots", &self.classes.survivor_weapons.bots),
        ] {
            if pool.iter().map(|w| w.weight).sum::<u32>() == 0 {
                return Err(ConfigError::EmptyWeaponPool(field));
            }
        }
        Ok(())
    }

    /// Clamps out-of-range values, logging each one. A NaN falls back to
    /// the field's default.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.respawn.delay_secs.is_nan() {
            tracing::warn!("respawn.delay_secs is NaN, using default");
            self.respawn.delay_secs = defaults.respawn.delay_secs;
        } else if self.respawn.delay_secs < 0.1 {
            tracing::warn!(value = self.respawn.delay_secs, "respawn.delay_secs clamped to 0.1");
            self.respawn.delay_secs = 0.1;
        }
        if self.leveling.xp_per_level == 0 {
            tracing::warn!("leveling.xp_per_level clamped to 1");
            self.leveling.xp_per_level = 1;
        }
        for (field, ratio, default) in [
            ("health_ratio", &mut self.leveling.health_ratio, defaults.leveling.health_ratio),
            ("speed_ratio", &mut self.leveling.speed_ratio, defaults.leveling.speed_ratio),
            ("gravity_ratio", &mut self.leveling.gravity_ratio, defaults.leveling.gravity_ratio),
        ] {
            if ratio.is_nan() {
                tracing::warn!(field, "leveling ratio is NaN, using default");
                *ratio = default;
            } else if *ratio < 0.0 {
                tracing::warn!(field, value = *ratio, "leveling ratio clamped to 0");
                *ratio = 0.0;
            }
        }
        for (field, secs, default) in [
            (
                "ambience.interval_secs",
                &mut self.ambience.interval_secs,
                defaults.ambience.interval_secs,
            ),
            (
                "ambience.moan_interval_secs",
                &mut self.ambience.moan_interval_secs,
                defaults.ambience.moan_interval_secs,
            ),
            (
                "input.leap_cooldown_secs",
                &mut self.input.leap_cooldown_secs,
                defaults.input.leap_cooldown_secs,
            ),
        ] {
            if secs.is_nan() {
                tracing::warn!(field, "interval is NaN, using default");
                *secs = default;
            } else if *secs < 1.0 {
                tracing::warn!(field, value = *secs, "interval clamped to 1s");
                *secs = 1.0;
            }
        }
        if self.classes.first_zombie_health_multiplier.is_nan()
            || self.classes.first_zombie_health_multiplier < 0.0
        {
            tracing::warn!(
                value = self.classes.first_zombie_health_multiplier,
                "classes.first_zombie_health_multiplier reset to default"
            );
            self.classes.first_zombie_health_multiplier =
                defaults.classes.first_zombie_health_multiplier;
        }
        if self.round.multi_ratio.is_nan() {
            tracing::warn!("round.multi_ratio is NaN, using default");
            self.round.multi_ratio = defaults.round.multi_ratio;
        } else if !(0.0..=1.0).contains(&self.round.multi_ratio) {
            let clamped = self.round.multi_ratio.clamp(0.0, 1.0);
            tracing::warn!(value = self.round.multi_ratio, clamped, "round.multi_ratio clamped");
            self.round.multi_ratio = clamped;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Respawn
// ---------------------------------------------------------------------------

/// Which role a revived player comes back as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deathmatch {
    /// Dead players stay dead until the next round.
    Disabled,
    Human,
    #[default]
    Zombie,
    /// Coin flip per revival.
    Random,
    /// Zombie while zombies are under half of the alive players.
    Balance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RespawnConfig {
    pub deathmatch: Deathmatch,
    pub delay_secs: f32,
    /// Revivals allowed per player per round. Also caps kill rewards.
    pub limit: u32,
    /// Revive players killed by the world (falls, triggers, suicide).
    pub on_world_kill: bool,
    pub zombie: bool,
    pub human: bool,
    pub nemesis: bool,
    pub survivor: bool,
    /// Revive even when only one human is left alive.
    pub after_last_human: bool,
}

impl Default for RespawnConfig {
    fn default() -> Self {
        Self {
            deathmatch: Deathmatch::default(),
            delay_secs: 5.0,
            limit: 5,
            on_world_kill: true,
            zombie: true,
            human: true,
            nemesis: false,
            survivor: false,
            after_last_human: true,
        }
    }
}

impl RespawnConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f32(self.delay_secs.max(0.0))
    }
}

// ---------------------------------------------------------------------------
// Rewards
// ---------------------------------------------------------------------------

/// What the killer earns for one kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Reward {
    pub money: u32,
    pub experience: u32,
}

impl Reward {
    pub const fn new(money: u32, experience: u32) -> Self {
        Self { money, experience }
    }
}

/// Kill rewards by victim kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub nemesis_kill: Reward,
    pub zombie_kill: Reward,
    pub survivor_kill: Reward,
    pub human_kill: Reward,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            nemesis_kill: Reward::new(1000, 30),
            zombie_kill: Reward::new(300, 10),
            survivor_kill: Reward::new(1000, 30),
            human_kill: Reward::new(300, 10),
        }
    }
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Keep balances above the engine ceiling in the controller and show
    /// them on a HUD overlay. Off: every balance goes straight to the engine.
    pub cap_enabled: bool,
    /// Balance given on connect.
    pub starting_balance: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            cap_enabled: true,
            starting_balance: 800,
        }
    }
}

// ---------------------------------------------------------------------------
// Leveling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelingConfig {
    pub enabled: bool,
    pub xp_per_level: u32,
    pub max_level: u32,
    /// Extra human health per level, as a fraction of the class value.
    pub health_ratio: f32,
    pub speed_ratio: f32,
    /// Gravity reduction per level.
    pub gravity_ratio: f32,
}

impl Default for LevelingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            xp_per_level: 100,
            max_level: 50,
            health_ratio: 0.02,
            speed_ratio: 0.005,
            gravity_ratio: 0.005,
        }
    }
}

impl LevelingConfig {
    /// Level reached with `experience`, capped at `max_level`.
    pub fn level_for(&self, experience: u32) -> u32 {
        (experience / self.xp_per_level.max(1)).min(self.max_level)
    }
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanClass {
    pub name: String,
    pub model: String,
    pub health: i32,
    pub armor: i32,
    pub speed: f32,
    pub gravity: f32,
    #[serde(default)]
    pub gender: Gender,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZombieClass {
    pub name: String,
    pub model: String,
    pub health: i32,
    pub speed: f32,
    pub gravity: f32,
    #[serde(default)]
    pub gender: Gender,
    /// Health regained per second. `0` disables regeneration.
    #[serde(default)]
    pub regen_per_sec: i32,
}

/// Stats of the nemesis or the survivor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialClass {
    pub model: String,
    pub health: i32,
    pub speed: f32,
    pub gravity: f32,
    pub glow: bool,
    pub glow_color: Color,
}

impl Default for SpecialClass {
    fn default() -> Self {
        Self {
            model: String::new(),
            health: 5000,
            speed: 1.1,
            gravity: 0.5,
            glow: true,
            glow_color: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedItem {
    pub item: String,
    pub weight: u32,
}

impl WeightedItem {
    pub fn new(item: &str, weight: u32) -> Self {
        Self {
            item: item.to_string(),
            weight,
        }
    }
}

/// Survivor weapons, drawn by weight. Bots use their own pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponPools {
    pub humans: Vec<WeightedItem>,
    pub bots: Vec<WeightedItem>,
}

impl Default for WeaponPools {
    fn default() -> Self {
        Self {
            humans: vec![
                WeightedItem::new("weapon_m249", 3),
                WeightedItem::new("weapon_xm1014", 1),
            ],
            bots: vec![WeightedItem::new("weapon_m249", 1)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassConfig {
    pub humans: Vec<HumanClass>,
    pub zombies: Vec<ZombieClass>,
    pub nemesis: SpecialClass,
    pub survivor: SpecialClass,
    pub survivor_weapons: WeaponPools,
    /// The only item a zombie carries.
    pub zombie_weapon: String,
    /// Health multiplier of the first zombie of an infection round.
    pub first_zombie_health_multiplier: f32,
}

impl Default for ClassConfig {
    fn default() -> Self {
        Self {
            humans: vec![HumanClass {
                name: "Civilian".to_string(),
                model: "models/player/outbreak/civilian.mdl".to_string(),
                health: 100,
                armor: 0,
                speed: 1.0,
                gravity: 1.0,
                gender: Gender::Male,
            }],
            zombies: vec![ZombieClass {
                name: "Classic".to_string(),
                model: "models/player/outbreak/classic.mdl".to_string(),
                health: 2000,
                speed: 1.0,
                gravity: 1.0,
                gender: Gender::Male,
                regen_per_sec: 10,
            }],
            nemesis: SpecialClass {
                model: "models/player/outbreak/nemesis.mdl".to_string(),
                glow_color: Color::RED,
                ..SpecialClass::default()
            },
            survivor: SpecialClass {
                model: "models/player/outbreak/survivor.mdl".to_string(),
                health: 1000,
                speed: 1.0,
                gravity: 1.0,
                glow_color: Color::BLUE,
                ..SpecialClass::default()
            },
            survivor_weapons: WeaponPools::default(),
            zombie_weapon: "weapon_knife".to_string(),
            first_zombie_health_multiplier: 2.0,
        }
    }
}

impl ClassConfig {
    /// The human class at `index`, falling back to the first one.
    pub fn human(&self, index: usize) -> Option<&HumanClass> {
        self.humans.get(index).or_else(|| self.humans.first())
    }

    /// The zombie class at `index`, falling back to the first one.
    pub fn zombie(&self, index: usize) -> Option<&ZombieClass> {
        self.zombies.get(index).or_else(|| self.zombies.first())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Opens the main menu. Empty disables the binding.
    pub menu_button: Buttons,
    pub leap_enabled: bool,
    /// Nemesis may leap too.
    pub leap_nemesis: bool,
    pub leap_force: f32,
    pub leap_height: f32,
    pub leap_cooldown_secs: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            menu_button: Buttons::ALT1,
            leap_enabled: true,
            leap_nemesis: true,
            leap_force: 500.0,
            leap_height: 300.0,
            leap_cooldown_secs: 5.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Ambience
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbienceConfig {
    pub enabled: bool,
    /// Length of the ambience loop.
    pub interval_secs: f32,
    pub moan_interval_secs: f32,
    /// Zombie regeneration, per the class `regen_per_sec`.
    pub regen_enabled: bool,
}

impl Default for AmbienceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 17.0,
            moan_interval_secs: 12.0,
            regen_enabled: true,
        }
    }
}
