//! # Outbreak
//!
//! Server-side controller for an infection game mode: one side starts as
//! zombies, everyone they kill comes back as one of them, and humans win
//! by holding out until the round clock runs down.
//!
//! The controller reacts to [`HostEvent`](outbreak_protocol::HostEvent)s
//! reported by the game server and drives it back through the
//! [`Engine`](outbreak_host::Engine) and
//! [`Presentation`](outbreak_host::Presentation) traits. All state lives in
//! one [`Controller`]; run it directly or inside the Tokio actor from
//! [`spawn_controller`].
//!
//! ## Quick Start
//!
//! ```rust
//! use outbreak::prelude::*;
//!
//! let mut host = SimHost::new(32, 1024);
//! host.add_client(Slot(1), false);
//!
//! let mut controller = Controller::new(ModeConfig::default(), host, SimPresentation::default());
//! controller
//!     .dispatch(HostEvent::Connect { slot: Slot(1), user: UserId(1), bot: false })
//!     .unwrap();
//! assert_eq!(controller.player(UserId(1)).unwrap().balance, 800);
//! ```

mod actor;
mod config;
mod controller;
mod economy;
mod error;
mod handlers;
mod job;
mod lifecycle;
mod mode;

pub use actor::{ControllerHandle, DEFAULT_CHANNEL_SIZE, spawn_controller};
pub use config::{
    AmbienceConfig, ClassConfig, Deathmatch, EconomyConfig, HumanClass, InputConfig,
    LevelingConfig, ModeConfig, RespawnConfig, Reward, RewardConfig, SpecialClass, WeaponPools,
    WeightedItem, ZombieClass,
};
pub use controller::{Controller, ControllerSnapshot, PlayerSnapshot};
pub use economy::{BalanceWrite, CASH_AWARDS_CONVAR, CASH_CEILING, EconomyRegulator};
pub use error::{ConfigError, OutbreakError};
pub use handlers::{DeathOutcome, InputOutcome};
pub use job::{Job, PlayerJob};
pub use lifecycle::{KillReward, ZombieKind};

pub mod prelude {
    pub use crate::{
        BalanceWrite, CASH_CEILING, Controller, ControllerHandle, ControllerSnapshot,
        DeathOutcome, Deathmatch, InputOutcome, ModeConfig, OutbreakError, ZombieKind,
        spawn_controller,
    };
    pub use outbreak_host::{Engine, Presentation};
    #[cfg(feature = "sim")]
    pub use outbreak_host::{SimHost, SimPresentation};
    pub use outbreak_protocol::{
        Buttons, Codec, HostEvent, JsonCodec, Role, RoundMode, Slot, Team, UserId,
    };
    pub use outbreak_round::{RoundPhase, SkipReason, Step};
}
