//! Currency regulation.
//!
//! Stock engines store money in a field that can't show more than
//! [`CASH_CEILING`]. Balances above it stay in the controller: the client
//! stops receiving native cash awards (so the engine never overwrites the
//! field) and a once-per-second HUD overlay shows the real value instead.
//!
//! ```text
//!            balance ≤ ceiling                 balance > ceiling
//!  ┌──────────────────────────────┐   ┌─────────────────────────────────┐
//!  │ engine field = balance       │   │ engine field = 0                │
//!  │ cash awards on               │──→│ cash awards off                 │
//!  │ no overlay timer             │←──│ overlay timer every second      │
//!  └──────────────────────────────┘   └─────────────────────────────────┘
//! ```
//!
//! [`EconomyRegulator::set_balance`] is the only writer of
//! `Player::balance`. It clamps at zero, picks the side of the ceiling and
//! arms or cancels the overlay timer in the same call, so the timer handle
//! and the balance never disagree. [`EconomyRegulator::reapply`] re-runs the
//! policy after every role or class change. The overlay tick itself re-checks the
//! balance and stops its timer once the player has dropped back under the
//! ceiling or left the server.

use std::time::Duration;

use outbreak_host::{Attr, Engine, Presentation};
use outbreak_protocol::Color;
use outbreak_registry::Player;
use outbreak_round::{SkipReason, Step};
use outbreak_timer::{TaskHandle, TimerScheduler};
use tracing::debug;

use crate::{EconomyConfig, Job, PlayerJob};

/// Highest balance the engine money field can display.
pub const CASH_CEILING: u32 = 65_000;

/// Replicated per client to turn native cash awards off and back on.
pub const CASH_AWARDS_CONVAR: &str = "mp_playercashawards";

const OVERLAY_INTERVAL: Duration = Duration::from_secs(1);
const OVERLAY_HOLD: Duration = Duration::from_millis(1100);

/// Where a balance write ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceWrite {
    /// The cap is disabled; the value went to the engine unchecked.
    Direct,
    /// Within the engine's range; written to the engine field.
    Mirrored,
    /// Above the ceiling; held back and shown on the overlay.
    /// `started` is true when this write armed the overlay timer.
    Overlay { started: bool },
}

/// Applies the balance policy. The only writer of `Player::balance`.
#[derive(Debug, Clone, Copy)]
pub struct EconomyRegulator {
    config: EconomyConfig,
}

impl EconomyRegulator {
    pub fn new(config: EconomyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Stores `amount`, clamped to `0`, and pushes it to the engine.
    pub fn set_balance<E: Engine>(
        &self,
        player: &mut Player,
        amount: i64,
        engine: &mut E,
        timers: &mut TimerScheduler<Job>,
    ) -> BalanceWrite {
        player.balance = amount.clamp(0, i64::from(u32::MAX)) as u32;
        self.reapply(player, engine, timers)
    }

    /// Adds `delta` (possibly negative) to the balance.
    pub fn add<E: Engine>(
        &self,
        player: &mut Player,
        delta: i64,
        engine: &mut E,
        timers: &mut TimerScheduler<Job>,
    ) -> BalanceWrite {
        let amount = i64::from(player.balance) + delta;
        self.set_balance(player, amount, engine, timers)
    }

    /// Runs the policy again for the current balance.
    ///
    /// Role and class changes reset the engine money field on some hosts,
    /// so every such change ends with a call to this.
    pub fn reapply<E: Engine>(
        &self,
        player: &mut Player,
        engine: &mut E,
        timers: &mut TimerScheduler<Job>,
    ) -> BalanceWrite {
        let slot = player.slot;
        let balance = player.balance;

        if !self.config.cap_enabled {
            engine.set_int(slot, Attr::Account, i32::try_from(balance).unwrap_or(i32::MAX));
            return BalanceWrite::Direct;
        }

        if balance > CASH_CEILING {
            engine.replicate_convar(slot, CASH_AWARDS_CONVAR, "0");
            if timers.is_live_field(&player.timers.hud) {
                return BalanceWrite::Overlay { started: false };
            }
            let handle =
                timers.schedule_repeating(OVERLAY_INTERVAL, Job::player(player.user, PlayerJob::CashOverlay));
            timers.replace(&mut player.timers.hud, handle);
            debug!(user = %player.user, balance, "cash overlay started");
            BalanceWrite::Overlay { started: true }
        } else {
            engine.replicate_convar(slot, CASH_AWARDS_CONVAR, "1");
            engine.set_int(slot, Attr::Account, balance as i32);
            if timers.clear(&mut player.timers.hud) {
                debug!(user = %player.user, balance, "cash overlay stopped");
            }
            BalanceWrite::Mirrored
        }
    }

    /// One overlay tick. `player` is `None` when the owning user left; the
    /// timer then cancels itself.
    pub fn on_overlay_tick<P: Presentation>(
        &self,
        player: Option<&mut Player>,
        handle: TaskHandle,
        timers: &mut TimerScheduler<Job>,
        presentation: &mut P,
    ) -> Step<u32> {
        let Some(player) = player else {
            timers.cancel(handle);
            return Step::Skipped(SkipReason::Disconnected);
        };
        if player.timers.hud != Some(handle) {
            timers.cancel(handle);
            return Step::Skipped(SkipReason::StaleTimer);
        }
        if !self.config.cap_enabled || player.balance <= CASH_CEILING {
            timers.clear(&mut player.timers.hud);
            return Step::Skipped(SkipReason::FeatureDisabled);
        }

        let text = format!("${}", player.balance);
        presentation.show_hud(player.slot, &text, Color::GREEN, OVERLAY_HOLD);
        Step::Applied(player.balance)
    }
}
