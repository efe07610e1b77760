use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::content::{MobCategory, StatusId, Team};
use crate::geometry::{normalize_angle, Vec2};
use crate::sim::{CategoryData, ChaseTarget, Holder, MobId, SimContext, StatusInstance};

use super::event::{EventPayload, MobEventKind};
use super::fsm::{run_event, set_state};
use super::loaders::{
    AnimationOption, CalcOperator, CompareOperator, FocusTarget, InfoKind, MoveTarget, TurnTarget,
};
use super::params::format_number;
use super::program::StateId;
use super::ActionRun;

/// Distance a fleeing mob aims for when running away from its focus.
const FLEE_DISTANCE: f32 = 100.0;

fn set_var(run: &mut ActionRun<'_>, name: &str, value: String) {
    if name.is_empty() {
        return;
    }
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.vars.insert(name.to_string(), value);
    }
}

fn joined_text(run: &ActionRun<'_>, from: usize) -> String {
    run.args
        .iter()
        .skip(from)
        .map(|arg| arg.to_text())
        .collect::<Vec<_>>()
        .join(" ")
}

fn compare(lhs: &str, operator: CompareOperator, rhs: &str) -> bool {
    let numbers = (lhs.trim().parse::<f32>(), rhs.trim().parse::<f32>());
    if let (Ok(lhs), Ok(rhs)) = numbers {
        return match operator {
            CompareOperator::Equal => lhs == rhs,
            CompareOperator::NotEqual => lhs != rhs,
            CompareOperator::Less => lhs < rhs,
            CompareOperator::Greater => lhs > rhs,
            CompareOperator::LessOrEqual => lhs <= rhs,
            CompareOperator::GreaterOrEqual => lhs >= rhs,
        };
    }
    match operator {
        CompareOperator::Equal => lhs == rhs,
        CompareOperator::NotEqual => lhs != rhs,
        CompareOperator::Less => lhs < rhs,
        CompareOperator::Greater => lhs > rhs,
        CompareOperator::LessOrEqual => lhs <= rhs,
        CompareOperator::GreaterOrEqual => lhs >= rhs,
    }
}

fn clamp_health(sim: &SimContext, value: f32, max_health: f32) -> f32 {
    let floor = sim.config.max_health_floor;
    value.clamp(floor, max_health.max(floor))
}

fn move_speed(sim: &SimContext, mob: MobId) -> f32 {
    sim.mob_type_of(mob).map_or(0.0, |mob_type| mob_type.move_speed)
}

fn live_focus(sim: &SimContext, mob: MobId) -> Option<MobId> {
    sim.arena
        .get(mob)
        .and_then(|instance| instance.focus)
        .filter(|focus| sim.arena.get(*focus).is_some_and(|other| !other.to_delete))
}

fn apply_status(sim: &mut SimContext, mob: MobId, status: StatusId) {
    let Some(duration) = sim.content.status(status).map(|def| def.duration) else {
        return;
    };
    let Some(instance) = sim.arena.get_mut(mob) else {
        return;
    };
    match instance
        .statuses
        .iter_mut()
        .find(|existing| existing.status == status)
    {
        Some(existing) => existing.time_left = duration,
        None => instance.statuses.push(StatusInstance {
            status,
            time_left: duration,
        }),
    }
}

fn count_death(sim: &mut SimContext, category: MobCategory) {
    match category {
        MobCategory::Pikmin => sim.stats.pikmin_deaths += 1,
        MobCategory::Enemy => sim.stats.enemy_deaths += 1,
        _ => {}
    }
}

pub(crate) fn run_nothing(_run: &mut ActionRun<'_>) {}

pub(crate) fn run_if(run: &mut ActionRun<'_>) {
    let lhs = run.text_arg(0);
    let rhs = joined_text(run, 2);
    run.return_value = CompareOperator::from_index(run.enum_arg(1))
        .is_some_and(|operator| compare(&lhs, operator, &rhs));
}

pub(crate) fn run_set_var(run: &mut ActionRun<'_>) {
    let name = run.text_arg(0);
    let value = run.text_arg(1);
    set_var(run, &name, value);
}

pub(crate) fn run_calculate(run: &mut ActionRun<'_>) {
    let name = run.text_arg(0);
    let Some(operator) = CalcOperator::from_index(run.enum_arg(2)) else {
        return;
    };
    let result = operator.apply(run.f32_arg(1), run.f32_arg(3));
    set_var(run, &name, format_number(result));
}

pub(crate) fn run_get_random_decimal(run: &mut ActionRun<'_>) {
    let name = run.text_arg(0);
    let (a, b) = (run.f32_arg(1), run.f32_arg(2));
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    let value = if low == high {
        low
    } else {
        run.sim.rng.gen_range(low..=high)
    };
    set_var(run, &name, format_number(value));
}

pub(crate) fn run_get_random_int(run: &mut ActionRun<'_>) {
    let name = run.text_arg(0);
    let (a, b) = (run.i64_arg(1), run.i64_arg(2));
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    let value = run.sim.rng.gen_range(low..=high);
    set_var(run, &name, value.to_string());
}

pub(crate) fn run_get_info(run: &mut ActionRun<'_>) {
    let name = run.text_arg(0);
    let Some(kind) = InfoKind::from_index(run.enum_arg(1)) else {
        return;
    };
    let value = info_value(run.sim, run.mob, run.payload, kind);
    set_var(run, &name, value);
}

fn info_value(sim: &SimContext, id: MobId, payload: &EventPayload, kind: InfoKind) -> String {
    let content = &sim.content;
    let Some(mob) = sim.arena.get(id) else {
        return String::new();
    };
    match kind {
        InfoKind::Health => format_number(mob.health),
        InfoKind::MaxHealth => format_number(mob.max_health),
        InfoKind::X => format_number(mob.pos.x),
        InfoKind::Y => format_number(mob.pos.y),
        InfoKind::Z => format_number(mob.z),
        InfoKind::Angle => format_number(mob.angle.to_degrees()),
        InfoKind::State => mob.state_name(content).to_string(),
        InfoKind::MobType => content
            .mob_type(mob.type_id)
            .map(|mob_type| mob_type.name.clone())
            .unwrap_or_default(),
        InfoKind::MobCategory => mob.category().name().to_string(),
        InfoKind::Team => mob.team.name().to_string(),
        InfoKind::Message => match payload {
            EventPayload::Message { text, .. } => text.clone(),
            _ => String::new(),
        },
        InfoKind::MessageSender => match payload {
            EventPayload::Message { sender, .. } => sim
                .mob_type_of(*sender)
                .map(|mob_type| mob_type.name.clone())
                .unwrap_or_default(),
            _ => String::new(),
        },
        InfoKind::FrameSignal => match payload {
            EventPayload::FrameSignal(signal) => signal.to_string(),
            _ => String::new(),
        },
        InfoKind::OtherBodyPart => payload
            .hitbox_contact()
            .and_then(|contact| {
                sim.mob_type_of(contact.other)
                    .and_then(|mob_type| mob_type.body_parts.get(contact.other_body_part))
                    .cloned()
            })
            .unwrap_or_default(),
        InfoKind::Hazard => match payload {
            EventPayload::Hazard { hazard, .. } => content
                .hazard(*hazard)
                .map(|def| def.name.clone())
                .unwrap_or_default(),
            _ => String::new(),
        },
        InfoKind::ChompedCount => mob.chomp.victims.len().to_string(),
        InfoKind::TimeAlive => format_number(mob.time_alive),
        InfoKind::FocusDistance => mob
            .focus
            .and_then(|focus| sim.arena.get(focus))
            .map(|other| format_number(mob.pos.distance(other.pos)))
            .unwrap_or_default(),
    }
}

pub(crate) fn run_print(run: &mut ActionRun<'_>) {
    let text = joined_text(run, 0);
    let mob_type = run
        .sim
        .mob_type_of(run.mob)
        .map(|mob_type| mob_type.name.as_str())
        .unwrap_or("");
    info!(mob = run.mob.index, mob_type, text = %text, "script_print");
}

pub(crate) fn run_add_health(run: &mut ActionRun<'_>) {
    let amount = run.f32_arg(0);
    let Some((health, max_health)) = run.sim.arena.get(run.mob).map(|mob| (mob.health, mob.max_health))
    else {
        return;
    };
    let value = clamp_health(run.sim, health + amount, max_health);
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.health = value;
    }
}

pub(crate) fn run_set_health(run: &mut ActionRun<'_>) {
    let amount = run.f32_arg(0);
    let Some(max_health) = run.sim.arena.get(run.mob).map(|mob| mob.max_health) else {
        return;
    };
    let value = clamp_health(run.sim, amount, max_health);
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.health = value;
    }
}

pub(crate) fn run_start_dying(run: &mut ActionRun<'_>) {
    let Some(mob) = run.sim.arena.get_mut(run.mob) else {
        return;
    };
    if mob.dying {
        return;
    }
    mob.dying = true;
    mob.chase = None;
    mob.chomp.max_victims = 0;
    mob.chomp.body_parts.clear();
    let category = mob.category();
    count_death(run.sim, category);
    debug!(mob = run.mob.index, category = category.name(), "mob_started_dying");
}

/// Releases whatever the mob holds. Mobs that can be carried stay as a
/// corpse; everything else is removed at the end of the frame.
pub(crate) fn run_finish_dying(run: &mut ActionRun<'_>) {
    release_victims(run.sim, run.mob);
    release_stored(run.sim, run.mob);
    let Some(mob) = run.sim.arena.get_mut(run.mob) else {
        return;
    };
    mob.dying = true;
    if mob.carry.is_none() {
        mob.to_delete = true;
    }
}

pub(crate) fn run_delete(run: &mut ActionRun<'_>) {
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.to_delete = true;
    }
}

pub(crate) fn run_set_state(run: &mut ActionRun<'_>) {
    let Ok(target) = usize::try_from(run.enum_arg(0)) else {
        return;
    };
    let payload = run.payload;
    set_state(&mut *run.sim, run.mob, StateId(target), payload);
}

pub(crate) fn run_set_timer(run: &mut ActionRun<'_>) {
    let time = run.f32_arg(0);
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.script_timer = (time > 0.0).then_some(time);
    }
}

fn start_chase(run: &mut ActionRun<'_>, pos: Vec2, follow: Option<MobId>) {
    let speed = move_speed(run.sim, run.mob);
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.chase = Some(ChaseTarget { pos, speed, follow });
    }
}

pub(crate) fn run_move_to_absolute(run: &mut ActionRun<'_>) {
    let target = Vec2::new(run.f32_arg(0), run.f32_arg(1));
    start_chase(run, target, None);
}

/// Offset is in the mob's own frame: `x` forward, `y` to the left.
pub(crate) fn run_move_to_relative(run: &mut ActionRun<'_>) {
    let offset = Vec2::new(run.f32_arg(0), run.f32_arg(1));
    let Some(target) = run
        .sim
        .arena
        .get(run.mob)
        .map(|mob| mob.pos + offset.rotated(mob.angle))
    else {
        return;
    };
    start_chase(run, target, None);
}

pub(crate) fn run_move_to_target(run: &mut ActionRun<'_>) {
    let Some(target) = MoveTarget::from_index(run.enum_arg(0)) else {
        return;
    };
    let Some(mob) = run.sim.arena.get(run.mob) else {
        return;
    };
    let focus = live_focus(run.sim, run.mob).and_then(|id| run.sim.arena.get(id));

    let (pos, follow) = match target {
        MoveTarget::Focus => match focus {
            Some(other) => (other.pos, Some(other.id)),
            None => return,
        },
        MoveTarget::FocusPosition => match focus {
            Some(other) => (other.pos, None),
            None => return,
        },
        MoveTarget::AwayFromFocus => match focus {
            Some(other) => {
                let away = other.pos.angle_to(mob.pos);
                (mob.pos + Vec2::from_angle(away, FLEE_DISTANCE), None)
            }
            None => return,
        },
        MoveTarget::Home => (mob.home, None),
        MoveTarget::LinkAverage => {
            let positions = mob
                .links
                .iter()
                .filter_map(|link| run.sim.arena.get(*link))
                .map(|other| other.pos)
                .collect::<Vec<_>>();
            if positions.is_empty() {
                return;
            }
            let sum = positions.iter().fold(Vec2::ZERO, |acc, pos| acc + *pos);
            (sum * (1.0 / positions.len() as f32), None)
        }
    };
    start_chase(run, pos, follow);
}

pub(crate) fn run_stop(run: &mut ActionRun<'_>) {
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.chase = None;
    }
}

fn teleport(run: &mut ActionRun<'_>, pos: Vec2) {
    let floor = run.sim.area.floor_z_at(pos);
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.pos = pos;
        mob.z = floor;
        mob.speed_z = 0.0;
        mob.chase = None;
    }
}

pub(crate) fn run_teleport_to_absolute(run: &mut ActionRun<'_>) {
    let pos = Vec2::new(run.f32_arg(0), run.f32_arg(1));
    teleport(run, pos);
}

pub(crate) fn run_teleport_to_relative(run: &mut ActionRun<'_>) {
    let offset = Vec2::new(run.f32_arg(0), run.f32_arg(1));
    let Some(pos) = run
        .sim
        .arena
        .get(run.mob)
        .map(|mob| mob.pos + offset.rotated(mob.angle))
    else {
        return;
    };
    teleport(run, pos);
}

pub(crate) fn run_turn_to_absolute(run: &mut ActionRun<'_>) {
    let angle = run.f32_arg(0).to_radians();
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.angle = normalize_angle(angle);
    }
}

pub(crate) fn run_turn_to_relative(run: &mut ActionRun<'_>) {
    let angle = run.f32_arg(0).to_radians();
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.angle = normalize_angle(mob.angle + angle);
    }
}

pub(crate) fn run_turn_to_target(run: &mut ActionRun<'_>) {
    let Some(target) = TurnTarget::from_index(run.enum_arg(0)) else {
        return;
    };
    let Some(mob) = run.sim.arena.get(run.mob) else {
        return;
    };
    let point = match target {
        TurnTarget::Focus => live_focus(run.sim, run.mob)
            .and_then(|focus| run.sim.arena.get(focus))
            .map(|other| other.pos),
        TurnTarget::Home => Some(mob.home),
    };
    let Some(point) = point.filter(|point| point.distance(mob.pos) > f32::EPSILON) else {
        return;
    };
    let angle = mob.pos.angle_to(point);
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.angle = normalize_angle(angle);
    }
}

pub(crate) fn run_set_animation(run: &mut ActionRun<'_>) {
    let Ok(animation) = usize::try_from(run.enum_arg(0)) else {
        return;
    };
    let no_restart = (1..run.args.len())
        .any(|index| AnimationOption::from_index(run.enum_arg(index)) == Some(AnimationOption::NoRestart));
    let Some(mob) = run.sim.arena.get_mut(run.mob) else {
        return;
    };
    let Some(state) = mob.animation.as_mut() else {
        return;
    };
    if no_restart && state.animation == animation && !state.finished {
        return;
    }
    state.animation = animation;
    state.frame = 0;
    state.frame_time = 0.0;
    state.finished = false;
}

fn reach_arg(run: &ActionRun<'_>) -> Option<Option<usize>> {
    let reach_count = run
        .sim
        .mob_type_of(run.mob)
        .map_or(0, |mob_type| mob_type.reaches.len());
    match usize::try_from(run.enum_arg(0)) {
        Ok(index) if index < reach_count => Some(Some(index)),
        Ok(_) => None,
        Err(_) => Some(None),
    }
}

pub(crate) fn run_set_near_reach(run: &mut ActionRun<'_>) {
    let Some(reach) = reach_arg(run) else {
        return;
    };
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.near_reach = reach;
    }
}

pub(crate) fn run_set_far_reach(run: &mut ActionRun<'_>) {
    let Some(reach) = reach_arg(run) else {
        return;
    };
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.far_reach = reach;
    }
}

pub(crate) fn run_set_height(run: &mut ActionRun<'_>) {
    let height = run.f32_arg(0).max(0.0);
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.height = height;
    }
}

pub(crate) fn run_set_tangible(run: &mut ActionRun<'_>) {
    let value = run.bool_arg(0);
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.flags.intangible = !value;
    }
}

pub(crate) fn run_set_huntable(run: &mut ActionRun<'_>) {
    let value = run.bool_arg(0);
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.flags.non_huntable = !value;
    }
}

pub(crate) fn run_set_hurtable(run: &mut ActionRun<'_>) {
    let value = run.bool_arg(0);
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.flags.non_hurtable = !value;
    }
}

pub(crate) fn run_set_unpushable(run: &mut ActionRun<'_>) {
    let value = run.bool_arg(0);
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.flags.unpushable = value;
    }
}

pub(crate) fn run_set_team(run: &mut ActionRun<'_>) {
    let Some(team) = usize::try_from(run.enum_arg(0))
        .ok()
        .and_then(|index| Team::ALL.get(index).copied())
    else {
        return;
    };
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.team = team;
    }
}

pub(crate) fn run_focus(run: &mut ActionRun<'_>) {
    let Some(target) = FocusTarget::from_index(run.enum_arg(0)) else {
        return;
    };
    let Some(mob) = run.sim.arena.get(run.mob) else {
        return;
    };
    let candidate = match target {
        FocusTarget::Trigger => run.payload.other_mob(),
        FocusTarget::Link => mob
            .links
            .iter()
            .copied()
            .find(|link| run.sim.arena.contains(*link)),
        FocusTarget::Parent => mob.parent,
    };
    let Some(candidate) = candidate.filter(|id| *id != run.mob && run.sim.arena.contains(*id)) else {
        return;
    };
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.focus = Some(candidate);
    }
}

pub(crate) fn run_unfocus(run: &mut ActionRun<'_>) {
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        if let Some(chase) = mob.chase {
            if chase.follow.is_some() && chase.follow == mob.focus {
                mob.chase = None;
            }
        }
        mob.focus = None;
    }
}

pub(crate) fn run_link_with_focus(run: &mut ActionRun<'_>) {
    let Some(focus) = live_focus(run.sim, run.mob) else {
        return;
    };
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        if !mob.links.contains(&focus) {
            mob.links.push(focus);
        }
    }
}

pub(crate) fn run_send_message_to_focus(run: &mut ActionRun<'_>) {
    let text = run.text_arg(0);
    let Some(focus) = live_focus(run.sim, run.mob) else {
        return;
    };
    run.sim.send_message(run.mob, focus, &text);
}

pub(crate) fn run_send_message_to_links(run: &mut ActionRun<'_>) {
    let text = run.text_arg(0);
    let links = run
        .sim
        .arena
        .get(run.mob)
        .map(|mob| mob.links.clone())
        .unwrap_or_default();
    for link in links {
        run.sim.send_message(run.mob, link, &text);
    }
}

pub(crate) fn run_send_message_to_nearby(run: &mut ActionRun<'_>) {
    let distance = run.f32_arg(0);
    let text = run.text_arg(1);
    let Some(origin) = run.sim.arena.get(run.mob).map(|mob| mob.pos) else {
        return;
    };
    let receivers = run
        .sim
        .arena
        .iter()
        .filter(|other| other.id != run.mob && !other.to_delete)
        .filter(|other| other.pos.distance(origin) <= distance)
        .map(|other| other.id)
        .collect::<Vec<_>>();
    for receiver in receivers {
        run.sim.send_message(run.mob, receiver, &text);
    }
}

/// Takes a spot on the focus: a tool reservation, a group task spot, a carry
/// spot, or else a plain claim.
pub(crate) fn run_claim_focus(run: &mut ActionRun<'_>) {
    let claimer = run.mob;
    let Some(focus) = live_focus(run.sim, claimer) else {
        return;
    };
    let Some(target) = run.sim.arena.get_mut(focus) else {
        return;
    };
    match &mut target.category {
        CategoryData::Tool { reserved } => {
            if reserved.is_none() {
                *reserved = Some(claimer);
            }
            return;
        }
        CategoryData::GroupTask { spots } => {
            if !spots.contains(&Some(claimer)) {
                if let Some(spot) = spots.iter_mut().find(|spot| spot.is_none()) {
                    *spot = Some(claimer);
                }
            }
            return;
        }
        _ => {}
    }
    if let Some(carry) = target.carry.as_mut() {
        if !carry.spots.contains(&Some(claimer)) {
            if let Some(spot) = carry.spots.iter_mut().find(|spot| spot.is_none()) {
                *spot = Some(claimer);
            }
        }
        return;
    }
    if target.claimed.is_none() {
        target.claimed = Some(claimer);
    }
}

pub(crate) fn run_release_claim(run: &mut ActionRun<'_>) {
    let claimer = run.mob;
    let Some(focus) = run.sim.arena.get(claimer).and_then(|mob| mob.focus) else {
        return;
    };
    let Some(target) = run.sim.arena.get_mut(focus) else {
        return;
    };
    match &mut target.category {
        CategoryData::Tool { reserved } if *reserved == Some(claimer) => *reserved = None,
        CategoryData::GroupTask { spots } => {
            for spot in spots.iter_mut().filter(|spot| **spot == Some(claimer)) {
                *spot = None;
            }
        }
        _ => {}
    }
    if let Some(carry) = target.carry.as_mut() {
        for spot in carry.spots.iter_mut().filter(|spot| **spot == Some(claimer)) {
            *spot = None;
        }
    }
    if target.claimed == Some(claimer) {
        target.claimed = None;
    }
}

pub(crate) fn run_start_chomping(run: &mut ActionRun<'_>) {
    let max_victims = usize::try_from(run.i64_arg(0)).unwrap_or(0);
    let body_parts = (1..run.args.len())
        .filter_map(|index| usize::try_from(run.enum_arg(index)).ok())
        .collect::<Vec<_>>();
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.chomp.max_victims = max_victims;
        mob.chomp.body_parts = body_parts;
    }
}

pub(crate) fn run_stop_chomping(run: &mut ActionRun<'_>) {
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.chomp.max_victims = 0;
        mob.chomp.body_parts.clear();
    }
}

/// Lets the attacker of the current hitbox event take this mob into its mouth.
pub(crate) fn run_get_chomped(run: &mut ActionRun<'_>) {
    let Some(contact) = run.payload.hitbox_contact().copied() else {
        return;
    };
    let victim = run.mob;
    let Some(attacker) = run.sim.arena.get_mut(contact.other) else {
        return;
    };
    if attacker.chomp.victims.contains(&victim)
        || attacker.chomp.victims.len() >= attacker.chomp.max_victims
    {
        return;
    }
    attacker.chomp.victims.push(victim);
    if let Some(mob) = run.sim.arena.get_mut(victim) {
        mob.holder = Some(Holder {
            mob: contact.other,
            hitbox: contact.other_hitbox,
        });
        mob.chase = None;
    }
    run_event(
        &mut *run.sim,
        victim,
        MobEventKind::Held,
        &EventPayload::Mob(contact.other),
    );
}

fn release_victims(sim: &mut SimContext, mob: MobId) -> Vec<MobId> {
    let victims = sim
        .arena
        .get_mut(mob)
        .map(|instance| std::mem::take(&mut instance.chomp.victims))
        .unwrap_or_default();
    for victim in &victims {
        if let Some(instance) = sim.arena.get_mut(*victim) {
            if instance.holder.is_some_and(|holder| holder.mob == mob) {
                instance.holder = None;
            }
        }
    }
    victims
}

pub(crate) fn run_swallow_all(run: &mut ActionRun<'_>) {
    let victims = release_victims(run.sim, run.mob);
    for victim in victims {
        let floor = run.sim.config.max_health_floor;
        let Some(instance) = run.sim.arena.get_mut(victim) else {
            continue;
        };
        if instance.to_delete {
            continue;
        }
        instance.health = floor;
        instance.to_delete = true;
        let category = instance.category();
        let was_dying = std::mem::replace(&mut instance.dying, true);
        if !was_dying {
            count_death(run.sim, category);
        }
        debug!(mob = run.mob.index, victim = victim.index, "mob_swallowed");
    }
}

pub(crate) fn run_store_focus_inside(run: &mut ActionRun<'_>) {
    let Some(focus) = live_focus(run.sim, run.mob) else {
        return;
    };
    let container = run.mob;
    if let Some(mob) = run.sim.arena.get_mut(focus) {
        mob.stored_inside = Some(container);
        mob.chase = None;
        mob.holder = None;
    }
}

fn release_stored(sim: &mut SimContext, container: MobId) {
    let Some(pos) = sim.arena.get(container).map(|mob| mob.pos) else {
        return;
    };
    let stored = sim
        .arena
        .iter()
        .filter(|mob| mob.stored_inside == Some(container))
        .map(|mob| mob.id)
        .collect::<Vec<_>>();
    for id in stored {
        if let Some(mob) = sim.arena.get_mut(id) {
            mob.stored_inside = None;
            mob.pos = pos;
        }
    }
}

pub(crate) fn run_release_stored_mobs(run: &mut ActionRun<'_>) {
    release_stored(run.sim, run.mob);
}

pub(crate) fn run_receive_status(run: &mut ActionRun<'_>) {
    let Ok(status) = u32::try_from(run.enum_arg(0)) else {
        return;
    };
    apply_status(run.sim, run.mob, StatusId(status));
}

pub(crate) fn run_remove_status(run: &mut ActionRun<'_>) {
    let Ok(status) = u32::try_from(run.enum_arg(0)) else {
        return;
    };
    if let Some(mob) = run.sim.arena.get_mut(run.mob) {
        mob.statuses.retain(|instance| instance.status != StatusId(status));
    }
}

pub(crate) fn run_spawn(run: &mut ActionRun<'_>) {
    let Ok(index) = usize::try_from(run.enum_arg(0)) else {
        return;
    };
    let content = Arc::clone(&run.sim.content);
    let Some(parent) = run.sim.arena.get(run.mob) else {
        return;
    };
    let Some(info) = content
        .mob_type(parent.type_id)
        .and_then(|mob_type| mob_type.spawns.get(index))
    else {
        return;
    };
    let (pos, z, angle) = if info.relative {
        (
            parent.pos + info.offset.rotated(parent.angle),
            parent.z + info.z,
            parent.angle + info.angle,
        )
    } else {
        (info.offset, info.z, info.angle)
    };

    let mut child = match run.sim.create_mob(info.mob_type, pos, z, normalize_angle(angle)) {
        Ok(child) => child,
        Err(error) => {
            warn!(mob = run.mob.index, spawn = %info.name, error = %error, "script_spawn_failed");
            return;
        }
    };
    for (name, value) in &info.vars {
        child.vars.insert(name.clone(), value.clone());
    }
    if info.as_child {
        child.parent = Some(run.mob);
    }
    if info.link_spawn_to_object {
        child.links.push(run.mob);
    }
    let child_id = child.id;
    if child.category() == MobCategory::Pikmin {
        run.sim.stats.pikmin_born += 1;
    }
    run.sim.arena.queue_spawn(child);

    if info.link_object_to_spawn {
        if let Some(parent) = run.sim.arena.get_mut(run.mob) {
            parent.links.push(child_id);
        }
    }
    debug!(mob = run.mob.index, child = child_id.index, spawn = %info.name, "script_spawn_queued");
}

/// Built-in `on_hitbox_touch_n_a`: take the attacking hitbox's damage.
pub(crate) fn run_be_attacked(run: &mut ActionRun<'_>) {
    let Some(contact) = run.payload.hitbox_contact().copied() else {
        return;
    };
    let victim = run.mob;
    let timeout = run.sim.config.opponent_hit_timeout;
    let floor = run.sim.config.max_health_floor;

    let Some(mob) = run.sim.arena.get_mut(victim) else {
        return;
    };
    mob.health = (mob.health - contact.other_value).max(floor);
    let health = mob.health;
    if let Some(attacker) = run.sim.arena.get_mut(contact.other) {
        attacker.hit_opponents.push((victim, timeout));
    }
    run.sim.stats.hits_landed += 1;
    debug!(
        mob = victim.index,
        attacker = contact.other.index,
        damage = contact.other_value,
        health,
        "mob_hit"
    );

    let payload = run.payload;
    run_event(&mut *run.sim, victim, MobEventKind::Damage, payload);
}

/// Built-in `on_death`: enter the death state.
pub(crate) fn run_die(run: &mut ActionRun<'_>) {
    let Some(mob) = run.sim.arena.get(run.mob) else {
        return;
    };
    let Some(mob_type) = run.sim.content.mob_type(mob.type_id) else {
        return;
    };
    let Some(death_state) = mob_type.script.death_state else {
        return;
    };
    let current = mob.fsm.cur_state;
    if current == death_state || mob_type.states_ignoring_death.contains(&current) {
        return;
    }
    let payload = run.payload;
    set_state(&mut *run.sim, run.mob, death_state, payload);
}

/// Built-in `on_touch_hazard`: catch the hazard's status.
pub(crate) fn run_touch_hazard(run: &mut ActionRun<'_>) {
    let EventPayload::Hazard { hazard, .. } = run.payload else {
        return;
    };
    let Some(status) = run.sim.content.hazard(*hazard).and_then(|def| def.status) else {
        return;
    };
    let Some(mob) = run.sim.arena.get(run.mob) else {
        return;
    };
    let Some(mob_type) = run.sim.content.mob_type(mob.type_id) else {
        return;
    };
    if mob_type.is_resistant_to(*hazard)
        || mob_type.states_ignoring_hazard.contains(&mob.fsm.cur_state)
    {
        return;
    }
    apply_status(run.sim, run.mob, status);
}
