//! Integration tests for the controller against the simulated host.

use std::time::Duration;

use outbreak::prelude::*;
use outbreak::{CASH_AWARDS_CONVAR, PlayerSnapshot, RewardConfig, WeightedItem};
use outbreak_host::{Attr, Menu, SoundKind, Target};
use outbreak_round::{ModeRule, ModeRules};

// =========================================================================
// Helpers
// =========================================================================

type Sim = Controller<SimHost, SimPresentation>;

fn user(n: u32) -> UserId {
    UserId(100 + n)
}

fn off() -> ModeRule {
    ModeRule {
        enabled: false,
        ..ModeRule::default()
    }
}

fn always() -> ModeRule {
    ModeRule {
        enabled: true,
        chance: 1,
        min_players: 0,
    }
}

/// Plain infection rounds, a three second countdown, one second revivals
/// and no ambience chatter.
fn quiet() -> ModeConfig {
    let mut config = ModeConfig::default();
    config.round.countdown_secs = 3;
    config.round.modes = ModeRules {
        nemesis: off(),
        survivor: off(),
        swarm: off(),
        multi: off(),
        armageddon: off(),
    };
    config.respawn.delay_secs = 1.0;
    config.ambience.enabled = false;
    config
}

fn server(players: u32, config: ModeConfig) -> Sim {
    let mut host = SimHost::new(16, 256);
    for n in 1..=players {
        host.add_client(Slot(n), false);
    }
    let mut c = Controller::with_seed(config, host, SimPresentation::default(), 1);
    for n in 1..=players {
        c.dispatch(HostEvent::Connect {
            slot: Slot(n),
            user: user(n),
            bot: false,
        })
        .unwrap();
    }
    c
}

fn slot_of(c: &Sim, user: UserId) -> Slot {
    c.registry().resolve(user).unwrap()
}

fn begin_round(c: &mut Sim) {
    c.dispatch(HostEvent::RoundPreStart).unwrap();
    c.dispatch(HostEvent::RoundStart).unwrap();
    for user in c.registry().users() {
        let slot = slot_of(c, user);
        c.engine_mut().set_alive(slot, true);
        c.dispatch(HostEvent::Spawn { slot }).unwrap();
    }
}

fn start_mode(c: &mut Sim) {
    let secs = u64::from(c.config().round.countdown_secs);
    c.advance(Duration::from_secs(secs));
    assert!(c.round().mode_started());
}

fn alive_as(c: &Sim, role: Role) -> Vec<UserId> {
    c.snapshot()
        .players
        .iter()
        .filter(|p| p.alive && p.role == role)
        .map(|p| p.user)
        .collect()
}

fn find(c: &Sim, pred: impl Fn(&PlayerSnapshot) -> bool) -> UserId {
    c.snapshot().players.into_iter().find(|p| pred(p)).unwrap().user
}

fn kill(c: &mut Sim, victim: UserId, attacker: Option<UserId>) -> Step<DeathOutcome> {
    let victim = slot_of(c, victim);
    let attacker = attacker.map(|a| slot_of(c, a));
    c.engine_mut().set_alive(victim, false);
    c.on_death(victim, attacker)
}

/// Hands revivals the controller requested back to it as spawn events.
fn feed_spawns(c: &mut Sim) -> Vec<Slot> {
    let slots = c.engine_mut().drain_spawns();
    for &slot in &slots {
        c.dispatch(HostEvent::Spawn { slot }).unwrap();
    }
    slots
}

fn account(c: &Sim, slot: Slot) -> Option<i32> {
    c.engine().get_int(slot, Attr::Account)
}

// =========================================================================
// Economy
// =========================================================================

#[test]
fn test_balance_never_negative_and_held_above_ceiling() {
    let mut c = server(1, quiet());
    let u = user(1);
    let slot = Slot(1);
    assert_eq!(c.player(u).unwrap().balance, 800);

    assert_eq!(c.adjust_balance(u, -900), Step::Applied(0));
    assert_eq!(account(&c, slot), Some(0));

    assert_eq!(c.adjust_balance(u, 70_000), Step::Applied(70_000));
    assert_eq!(account(&c, slot), Some(0));
    assert!(c.timers().is_live_field(&c.player(u).unwrap().timers.hud));
    let client = c.engine().client(slot).unwrap();
    assert_eq!(client.convars.get(CASH_AWARDS_CONVAR).map(String::as_str), Some("0"));

    c.advance(Duration::from_secs(1));
    let huds = c.presentation().huds_for(slot);
    assert_eq!(huds.last().unwrap().text, "$70000");

    assert_eq!(c.adjust_balance(u, -69_900), Step::Applied(100));
    assert_eq!(account(&c, slot), Some(100));
    assert_eq!(c.player(u).unwrap().timers.hud, None);
    assert!(c.timers().is_empty());
}

#[test]
fn test_overlay_stops_on_disconnect() {
    let mut c = server(1, quiet());
    let _ = c.adjust_balance(user(1), 70_000);
    assert_eq!(c.timers().len(), 1);

    c.dispatch(HostEvent::Disconnect { user: user(1) }).unwrap();
    assert!(c.timers().is_empty());

    c.advance(Duration::from_secs(3));
    assert!(c.presentation().huds.is_empty());
}

#[test]
fn test_unknown_player_balance_is_skipped() {
    let mut c = server(1, quiet());
    assert_eq!(
        c.adjust_balance(UserId(9), 10),
        Step::Skipped(SkipReason::UnknownPlayer)
    );
}

// =========================================================================
// Death, reward and respawn
// =========================================================================

#[test]
fn test_human_kill_rewards_killer_and_schedules_respawn() {
    let mut c = server(3, quiet());
    begin_round(&mut c);
    start_mode(&mut c);

    let humans = alive_as(&c, Role::Human);
    let (victim, killer) = (humans[0], humans[1]);
    c.player_mut(victim).unwrap().respawn_count = 2;
    let before = c.player(killer).unwrap().balance;

    let out = kill(&mut c, victim, Some(killer)).applied().unwrap();

    let paid = RewardConfig::default().human_kill.money;
    assert_eq!(c.player(killer).unwrap().balance, before + paid);
    assert_eq!(out.reward.unwrap().killer, killer);
    assert!(out.respawn.is_applied());
    assert_eq!(c.player(victim).unwrap().respawn_count, 3);

    let slot = slot_of(&c, victim);
    c.advance(Duration::from_millis(900));
    assert!(c.engine_mut().drain_spawns().is_empty());
    c.advance(Duration::from_millis(100));
    assert_eq!(feed_spawns(&mut c), vec![slot]);

    // Zombie deathmatch: back as one of them.
    assert_eq!(c.player(victim).unwrap().role, Role::Zombie);
    assert_eq!(c.engine().team(slot), Team::Zombie);
    assert_eq!(c.engine().client(slot).unwrap().items, vec!["weapon_knife".to_string()]);
}

#[test]
fn test_zombie_respawn_switch_blocks_revival() {
    let mut config = quiet();
    config.respawn.zombie = false;
    let mut c = server(3, config);
    begin_round(&mut c);
    start_mode(&mut c);

    let zombie = alive_as(&c, Role::Zombie)[0];
    let human = alive_as(&c, Role::Human)[0];

    let out = kill(&mut c, zombie, Some(human)).applied().unwrap();
    assert_eq!(out.respawn, Step::Skipped(SkipReason::RespawnDisabled));
    assert_eq!(out.reward.unwrap().reward, RewardConfig::default().zombie_kill);
    assert_eq!(c.player(zombie).unwrap().timers.respawn, None);
    assert_eq!(c.player(zombie).unwrap().respawn_count, 0);
}

#[test]
fn test_respawn_limit_blocks_reward_and_revival() {
    let mut c = server(3, quiet());
    begin_round(&mut c);
    start_mode(&mut c);

    let humans = alive_as(&c, Role::Human);
    let zombie = alive_as(&c, Role::Zombie)[0];
    let limit = c.config().respawn.limit;
    c.player_mut(humans[0]).unwrap().respawn_count = limit;
    let before = c.player(zombie).unwrap().balance;

    let out = kill(&mut c, humans[0], Some(zombie)).applied().unwrap();
    assert_eq!(out.reward, None);
    assert_eq!(out.respawn, Step::Skipped(SkipReason::RespawnLimit));
    assert_eq!(c.player(zombie).unwrap().balance, before);
}

#[test]
fn test_world_kill_without_world_respawn() {
    let mut config = quiet();
    config.respawn.on_world_kill = false;
    let mut c = server(3, config);
    begin_round(&mut c);
    start_mode(&mut c);

    let human = alive_as(&c, Role::Human)[0];
    let out = kill(&mut c, human, None).applied().unwrap();
    assert_eq!(out.reward, None);
    assert_eq!(out.respawn, Step::Skipped(SkipReason::WorldKill));

    let other = alive_as(&c, Role::Human)[0];
    let out = kill(&mut c, other, Some(other)).applied().unwrap();
    assert_eq!(out.respawn, Step::Skipped(SkipReason::WorldKill));
}

#[test]
fn test_world_kill_respawns_by_default() {
    let mut c = server(3, quiet());
    begin_round(&mut c);
    start_mode(&mut c);

    let human = alive_as(&c, Role::Human)[0];
    let out = kill(&mut c, human, None).applied().unwrap();
    assert_eq!(out.reward, None);
    assert!(out.respawn.is_applied());
}

#[test]
fn test_death_while_round_ending_only_clears_state() {
    let mut c = server(3, quiet());
    begin_round(&mut c);
    start_mode(&mut c);
    c.dispatch(HostEvent::RoundEnd { winner: Team::Zombie }).unwrap();

    let zombie = alive_as(&c, Role::Zombie)[0];
    let human = alive_as(&c, Role::Human)[0];
    let before = c.player(zombie).unwrap().balance;

    assert_eq!(
        kill(&mut c, human, Some(zombie)),
        Step::Skipped(SkipReason::RoundEnding)
    );
    assert_eq!(c.player(zombie).unwrap().balance, before);
    assert_eq!(c.player(human).unwrap().timers.respawn, None);
    let slot = slot_of(&c, human);
    assert!(c.presentation().sounds.iter().any(|(sound, target)| {
        matches!(sound, SoundKind::Death { .. }) && *target == Target::Around(slot)
    }));
}

#[test]
fn test_death_of_unknown_slot_is_skipped() {
    let mut c = server(1, quiet());
    assert_eq!(
        c.on_death(Slot(9), None),
        Step::Skipped(SkipReason::UnknownPlayer)
    );
}

#[test]
fn test_death_cancels_support_timers() {
    let mut config = quiet();
    config.ambience.enabled = true;
    let mut c = server(3, config);
    begin_round(&mut c);
    start_mode(&mut c);

    let zombie = alive_as(&c, Role::Zombie)[0];
    let human = alive_as(&c, Role::Human)[0];
    let zslot = slot_of(&c, zombie);
    assert!(c.on_input(zslot, Buttons::LEAP).leapt);

    let _ = kill(&mut c, zombie, Some(human));
    let timers = &c.player(zombie).unwrap().timers;
    assert_eq!(timers.skill, None);
    assert_eq!(timers.heal, None);
    assert_eq!(timers.moan, None);
    assert_eq!(timers.ambient, None);
    assert!(c.timers().is_live_field(&timers.respawn));
}

// =========================================================================
// Scheduled respawns
// =========================================================================

#[test]
fn test_nemesis_round_revives_as_human() {
    let mut config = quiet();
    config.round.modes.nemesis = always();
    let mut c = server(3, config);
    begin_round(&mut c);
    start_mode(&mut c);
    assert_eq!(c.round().mode(), Some(RoundMode::Nemesis));

    let nemesis = find(&c, |p| p.nemesis);
    let humans = alive_as(&c, Role::Human);
    assert_eq!(humans.len(), 2);
    assert_eq!(c.infect(humans[0], ZombieKind::Regular), Step::Applied(()));

    let out = kill(&mut c, humans[0], Some(humans[1])).applied().unwrap();
    assert!(out.respawn.is_applied());
    assert_eq!(c.player(humans[0]).unwrap().pending_respawn_role, Role::Zombie);

    c.advance(Duration::from_secs(1));
    let slot = slot_of(&c, humans[0]);
    assert_eq!(feed_spawns(&mut c), vec![slot]);
    assert_eq!(c.player(humans[0]).unwrap().role, Role::Human);
    assert_eq!(c.engine().team(slot), Team::Human);
    assert!(c.player(nemesis).unwrap().is_zombie());
}

#[test]
fn test_nemesis_kill_pays_nemesis_reward() {
    let mut config = quiet();
    config.round.modes.nemesis = always();
    let mut c = server(3, config);
    begin_round(&mut c);
    start_mode(&mut c);

    let nemesis = find(&c, |p| p.nemesis);
    let human = alive_as(&c, Role::Human)[0];
    let out = kill(&mut c, nemesis, Some(human)).applied().unwrap();
    assert_eq!(out.reward.unwrap().reward, RewardConfig::default().nemesis_kill);
    // Nemeses stay down unless configured otherwise.
    assert_eq!(out.respawn, Step::Skipped(SkipReason::RespawnDisabled));
}

#[test]
fn test_survivor_round_revives_as_zombie() {
    let mut config = quiet();
    config.round.modes.survivor = always();
    config.respawn.deathmatch = Deathmatch::Human;
    let mut c = server(3, config);
    begin_round(&mut c);
    start_mode(&mut c);
    assert_eq!(c.round().mode(), Some(RoundMode::Survivor));

    let survivor = find(&c, |p| p.survivor);
    let sslot = slot_of(&c, survivor);
    let items = &c.engine().client(sslot).unwrap().items;
    assert!(items.iter().any(|i| i == "weapon_m249" || i == "weapon_xm1014"));

    let zombie = alive_as(&c, Role::Zombie)[0];
    let out = kill(&mut c, zombie, Some(survivor)).applied().unwrap();
    assert_eq!(out.reward.unwrap().reward, RewardConfig::default().zombie_kill);
    assert!(out.respawn.is_applied());

    c.advance(Duration::from_secs(1));
    let slot = slot_of(&c, zombie);
    assert_eq!(feed_spawns(&mut c), vec![slot]);
    assert_eq!(c.player(zombie).unwrap().role, Role::Zombie);
    assert_eq!(c.engine().team(slot), Team::Zombie);
}

#[test]
fn test_bot_survivor_draws_from_bot_pool() {
    let mut config = quiet();
    config.classes.survivor_weapons.humans = vec![WeightedItem::new("weapon_xm1014", 1)];
    config.classes.survivor_weapons.bots = vec![WeightedItem::new("weapon_mp5navy", 1)];
    let mut host = SimHost::new(16, 256);
    host.add_client(Slot(1), true);
    host.add_client(Slot(2), false);
    let mut c = Controller::with_seed(config, host, SimPresentation::default(), 1);
    for n in 1..=2 {
        c.dispatch(HostEvent::Connect {
            slot: Slot(n),
            user: user(n),
            bot: n == 1,
        })
        .unwrap();
    }
    begin_round(&mut c);

    assert_eq!(c.make_survivor(user(1)), Step::Applied(()));
    assert_eq!(c.make_survivor(user(2)), Step::Applied(()));
    let bot_items = &c.engine().client(Slot(1)).unwrap().items;
    assert_eq!(bot_items, &vec!["weapon_mp5navy".to_string()]);
    let human_items = &c.engine().client(Slot(2)).unwrap().items;
    assert_eq!(human_items, &vec!["weapon_xm1014".to_string()]);
}

#[test]
fn test_respawn_from_previous_round_is_stale() {
    let mut c = server(3, quiet());
    begin_round(&mut c);
    start_mode(&mut c);

    let human = alive_as(&c, Role::Human)[0];
    let zombie = alive_as(&c, Role::Zombie)[0];
    let round = c.round().number();
    let handle = kill(&mut c, human, Some(zombie))
        .applied()
        .unwrap()
        .respawn
        .applied()
        .unwrap();

    c.dispatch(HostEvent::RoundPreStart).unwrap();
    assert!(!c.timers().is_live(handle));
    assert_eq!(c.player(human).unwrap().timers.respawn, None);
    assert_eq!(
        c.respawn_due(human, round, handle),
        Step::Skipped(SkipReason::StaleRound)
    );
    assert!(c.engine_mut().drain_spawns().is_empty());
}

#[test]
fn test_disconnect_before_respawn_fires() {
    let mut c = server(3, quiet());
    begin_round(&mut c);
    start_mode(&mut c);

    let human = alive_as(&c, Role::Human)[0];
    let zombie = alive_as(&c, Role::Zombie)[0];
    let slot = slot_of(&c, human);
    let round = c.round().number();
    let handle = kill(&mut c, human, Some(zombie))
        .applied()
        .unwrap()
        .respawn
        .applied()
        .unwrap();

    c.dispatch(HostEvent::Disconnect { user: human }).unwrap();
    assert!(!c.timers().is_live(handle));

    // Someone else takes the slot before the old deadline.
    c.dispatch(HostEvent::Connect {
        slot,
        user: UserId(999),
        bot: false,
    })
    .unwrap();
    c.advance(Duration::from_secs(2));
    assert!(c.engine_mut().drain_spawns().is_empty());

    assert_eq!(
        c.respawn_due(human, round, handle),
        Step::Skipped(SkipReason::Disconnected)
    );
}

#[test]
fn test_last_human_is_not_outnumbered_by_revival() {
    let mut config = quiet();
    config.respawn.after_last_human = false;
    let mut c = server(3, config);
    begin_round(&mut c);
    start_mode(&mut c);

    let humans = alive_as(&c, Role::Human);
    let zombie = alive_as(&c, Role::Zombie)[0];
    let out = kill(&mut c, humans[0], Some(zombie)).applied().unwrap();
    assert!(out.respawn.is_applied());

    c.advance(Duration::from_secs(1));
    assert!(c.engine_mut().drain_spawns().is_empty());
    assert!(!c.snapshot().players.iter().any(|p| p.respawn_pending));
}

#[test]
fn test_deathmatch_disabled_never_schedules() {
    let mut config = quiet();
    config.respawn.deathmatch = Deathmatch::Disabled;
    let mut c = server(3, config);
    begin_round(&mut c);
    start_mode(&mut c);

    let human = alive_as(&c, Role::Human)[0];
    let zombie = alive_as(&c, Role::Zombie)[0];
    let out = kill(&mut c, human, Some(zombie)).applied().unwrap();
    assert_eq!(out.respawn, Step::Skipped(SkipReason::DeathmatchDisabled));
    assert!(out.reward.is_some());
}

#[test]
fn test_round_end_drops_pending_respawns() {
    let mut c = server(3, quiet());
    begin_round(&mut c);
    start_mode(&mut c);

    let human = alive_as(&c, Role::Human)[0];
    let zombie = alive_as(&c, Role::Zombie)[0];
    let _ = kill(&mut c, human, Some(zombie));
    c.dispatch(HostEvent::RoundEnd { winner: Team::Zombie }).unwrap();

    c.advance(Duration::from_secs(2));
    assert!(c.engine_mut().drain_spawns().is_empty());
}

// =========================================================================
// Input
// =========================================================================

#[test]
fn test_menu_opens_once_per_press() {
    let mut c = server(1, quiet());
    begin_round(&mut c);
    let slot = Slot(1);

    for _ in 0..5 {
        let _ = c.on_input(slot, Buttons::ALT1);
    }
    assert_eq!(c.presentation().menus, vec![(slot, Menu::Main)]);

    let _ = c.on_input(slot, Buttons::empty());
    let out = c.on_input(slot, Buttons::ALT1 | Buttons::FORWARD);
    assert!(out.menu_opened);
    assert_eq!(c.presentation().menus.len(), 2);
}

#[test]
fn test_dead_player_cannot_use() {
    let mut c = server(1, quiet());
    begin_round(&mut c);
    c.engine_mut().set_alive(Slot(1), false);

    let out = c.on_input(Slot(1), Buttons::USE | Buttons::ATTACK);
    assert!(out.modified);
    assert_eq!(out.buttons, Buttons::ATTACK);

    let out = c.on_input(Slot(1), Buttons::ATTACK);
    assert!(!out.modified);
}

#[test]
fn test_leap_cooldown() {
    let mut c = server(3, quiet());
    begin_round(&mut c);
    start_mode(&mut c);

    let zombie = alive_as(&c, Role::Zombie)[0];
    let slot = slot_of(&c, zombie);
    assert!(c.on_input(slot, Buttons::LEAP).leapt);
    // Holding the combo doesn't leap again.
    assert!(!c.on_input(slot, Buttons::LEAP).leapt);
    let _ = c.on_input(slot, Buttons::empty());
    assert!(!c.on_input(slot, Buttons::LEAP).leapt);
    assert_eq!(c.engine().client(slot).unwrap().pushes.len(), 1);

    let cooldown = c.config().input.leap_cooldown_secs;
    c.advance(Duration::from_secs_f32(cooldown));
    let _ = c.on_input(slot, Buttons::empty());
    assert!(c.on_input(slot, Buttons::LEAP).leapt);
    assert_eq!(c.engine().client(slot).unwrap().pushes.len(), 2);
}

#[test]
fn test_humans_cannot_leap() {
    let mut c = server(3, quiet());
    begin_round(&mut c);
    start_mode(&mut c);

    let human = alive_as(&c, Role::Human)[0];
    let slot = slot_of(&c, human);
    assert!(!c.on_input(slot, Buttons::LEAP).leapt);
    assert!(c.engine().client(slot).unwrap().pushes.is_empty());
}

// =========================================================================
// Round flow
// =========================================================================

#[test]
fn test_countdown_hud_then_mode_start() {
    let mut c = server(2, quiet());
    begin_round(&mut c);

    c.advance(Duration::from_secs(1));
    let huds = c.presentation().huds_for(Slot(1));
    assert_eq!(huds.last().unwrap().text, "Infection in 2");

    c.advance(Duration::from_secs(2));
    assert_eq!(c.round().mode(), Some(RoundMode::Infection));
    assert_eq!(alive_as(&c, Role::Zombie).len(), 1);
    assert!(c.snapshot().players.iter().all(|p| {
        c.player(p.user).unwrap().timers.countdown.is_none()
    }));
    assert!(c.presentation().sounds.iter().any(|(sound, _)| {
        *sound == SoundKind::ModeStart(RoundMode::Infection)
    }));

    let first = alive_as(&c, Role::Zombie)[0];
    let slot = slot_of(&c, first);
    let base = c.config().classes.zombies[0].health as f32;
    let bonus = c.config().classes.first_zombie_health_multiplier;
    assert_eq!(
        c.engine().get_int(slot, Attr::Health),
        Some((base * bonus).round() as i32)
    );
}

#[test]
fn test_not_enough_players_restarts_countdown() {
    let mut c = server(1, quiet());
    begin_round(&mut c);

    c.advance(Duration::from_secs(3));
    assert!(!c.round().mode_started());
    assert_eq!(c.round().round().countdown, 3);
    assert!(c.timers().is_live_field(&c.round().round().countdown_timer));
}

#[test]
fn test_deadline_ends_round_for_humans() {
    let mut config = quiet();
    config.round.round_minutes = 1.0;
    let mut c = server(2, config);
    begin_round(&mut c);

    c.advance(Duration::from_secs(58));
    assert_eq!(c.engine().terminated(), None);
    c.advance(Duration::from_secs(1));
    assert_eq!(c.engine().terminated(), Some(Team::Human));
}

#[test]
fn test_pre_start_rebalances_and_resets() {
    let mut c = server(4, quiet());
    begin_round(&mut c);
    start_mode(&mut c);
    let zombie = alive_as(&c, Role::Zombie)[0];
    c.player_mut(zombie).unwrap().respawn_count = 3;

    let assigned = c.on_round_pre_start();
    assert_eq!(assigned.len(), 4);
    for (slot, team) in assigned {
        let expected = if slot.is_odd() { Team::Zombie } else { Team::Human };
        assert_eq!(team, expected);
        assert_eq!(c.engine().team(slot), expected);
    }
    let player = c.player(zombie).unwrap();
    assert_eq!(player.role, Role::None);
    assert_eq!(player.respawn_count, 0);
    assert_eq!(c.round().mode(), None);
}

#[test]
fn test_round_start_purges_objectives() {
    let mut c = server(1, quiet());
    c.engine_mut().add_entity(40, "func_buyzone");
    c.engine_mut().add_entity(41, "info_player_start");
    c.dispatch(HostEvent::RoundPreStart).unwrap();

    assert_eq!(c.on_round_start(), Step::Applied(1));
    assert!(!c.engine().has_entity(40));
    assert!(c.engine().has_entity(41));
}

#[test]
fn test_ambience_timer_is_not_duplicated() {
    let mut config = quiet();
    config.ambience.enabled = true;
    let mut c = server(1, config);
    begin_round(&mut c);

    let live = c.timers().len();
    c.dispatch(HostEvent::Spawn { slot: Slot(1) }).unwrap();
    assert_eq!(c.timers().len(), live);
}

#[test]
fn test_hand_built_config_is_clamped_before_use() {
    let mut config = quiet();
    config.ambience.enabled = true;
    config.ambience.interval_secs = -1.0;
    config.ambience.moan_interval_secs = f32::NAN;
    config.input.leap_cooldown_secs = -5.0;
    let mut c = server(3, config);
    assert_eq!(c.config().ambience.interval_secs, 1.0);
    assert_eq!(
        c.config().ambience.moan_interval_secs,
        ModeConfig::default().ambience.moan_interval_secs
    );
    assert_eq!(c.config().input.leap_cooldown_secs, 1.0);

    begin_round(&mut c);
    start_mode(&mut c);
    let zombie = alive_as(&c, Role::Zombie)[0];
    assert!(c.timers().is_live_field(&c.player(zombie).unwrap().timers.moan));
    assert!(c.timers().is_live_field(&c.player(zombie).unwrap().timers.ambient));
}

// =========================================================================
// Leveling and progress
// =========================================================================

#[test]
fn test_leveling_scales_human_stats() {
    let mut config = quiet();
    config.leveling.enabled = true;
    config.classes.humans[0].armor = 50;
    let mut c = server(2, config);
    c.player_mut(user(1)).unwrap().level = 5;
    c.engine_mut().set_int(Slot(1), Attr::Armor, 80);
    begin_round(&mut c);

    assert_eq!(c.engine().get_int(Slot(1), Attr::Health), Some(110));
    assert_eq!(c.engine().get_int(Slot(1), Attr::Armor), Some(80));
    assert_eq!(c.engine().get_int(Slot(2), Attr::Health), Some(100));
    assert_eq!(c.engine().get_int(Slot(2), Attr::Armor), Some(50));
}

#[test]
fn test_kill_experience_survives_reconnect() {
    let mut config = quiet();
    config.leveling.enabled = true;
    config.leveling.xp_per_level = 10;
    let mut c = server(3, config);
    begin_round(&mut c);
    start_mode(&mut c);

    let zombie = alive_as(&c, Role::Zombie)[0];
    let human = alive_as(&c, Role::Human)[0];
    let out = kill(&mut c, human, Some(zombie)).applied().unwrap();
    assert_eq!(out.reward.unwrap().level, 1);

    let slot = slot_of(&c, zombie);
    c.dispatch(HostEvent::Disconnect { user: zombie }).unwrap();
    c.dispatch(HostEvent::Connect {
        slot,
        user: zombie,
        bot: false,
    })
    .unwrap();
    let player = c.player(zombie).unwrap();
    assert_eq!(player.level, 1);
    assert_eq!(player.experience, RewardConfig::default().human_kill.experience);
}

// =========================================================================
// Dispatch errors
// =========================================================================

#[test]
fn test_world_slot_event_is_rejected() {
    let mut c = server(1, quiet());
    let err = c.dispatch(HostEvent::Spawn { slot: Slot::WORLD }).unwrap_err();
    assert!(matches!(err, OutbreakError::Protocol(_)));
}

#[test]
fn test_duplicate_connect_is_rejected() {
    let mut c = server(1, quiet());
    let err = c
        .dispatch(HostEvent::Connect {
            slot: Slot(2),
            user: user(1),
            bot: false,
        })
        .unwrap_err();
    assert!(matches!(err, OutbreakError::Registry(_)));
    assert_eq!(c.registry().len(), 1);
}

#[test]
fn test_snapshot_serializes() {
    let mut c = server(2, quiet());
    begin_round(&mut c);
    start_mode(&mut c);

    let snapshot = c.snapshot();
    assert_eq!(snapshot.players.len(), 2);
    assert_eq!(snapshot.phase, RoundPhase::Active);
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["players"].as_array().unwrap().len(), 2);
}
