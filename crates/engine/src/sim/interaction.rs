use std::sync::Arc;

use tracing::trace;

use crate::content::{ContentDatabase, HitboxKind, MobType};
use crate::geometry::{
    angle_smallest_diff, circle_rect_overlap, circles_overlap, height_bands_touch, rects_overlap,
};
use crate::script::{run_event, run_handler, EventPayload, HitboxContact, MobEventKind, StateId};

use super::context::SimContext;
use super::mob::{can_hunt, can_hurt, CategoryData, Mob, MobId};
use super::push::{resolve_push, PushBody, PushHitbox};

/// Handler captured while scanning, dispatched after the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerRef {
    pub state: StateId,
    pub kind: MobEventKind,
}

/// Deferred inter-mob event gathered during one mob's interaction pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingIntermobEvent {
    pub distance: f32,
    pub other_radius: f32,
    pub handler: HandlerRef,
    pub other: MobId,
}

impl PendingIntermobEvent {
    /// Distance between the two edges, which decides dispatch order.
    pub fn surface_distance(&self, own_radius: f32) -> f32 {
        self.distance - (own_radius + self.other_radius)
    }
}

/// Sorts closest surface first. Ties keep their enumeration order.
pub fn sort_pending(pending: &mut [PendingIntermobEvent], own_radius: f32) {
    pending.sort_by(|a, b| {
        a.surface_distance(own_radius)
            .total_cmp(&b.surface_distance(own_radius))
    });
}

#[derive(Debug, Default)]
struct HitboxReports {
    attack_normal: bool,
    normal_normal: bool,
    eat: bool,
    hazard: bool,
    normal_attack: bool,
}

/// Widest distance at which this mob can notice anything: its body, or
/// the reaches it currently uses.
pub fn interaction_span(mob_type: &MobType, mob: &Mob) -> f32 {
    let reach_span = [mob.near_reach, mob.far_reach]
        .into_iter()
        .flatten()
        .filter_map(|index| mob_type.reaches.get(index))
        .map(|reach| reach.span())
        .fold(0.0_f32, f32::max);
    mob_type.physical_span().max(reach_span)
}

fn has_handler(content: &ContentDatabase, sim: &SimContext, mob: MobId, kind: MobEventKind) -> bool {
    sim.arena.get(mob).is_some_and(|instance| {
        content
            .mob_type(instance.type_id)
            .and_then(|mob_type| mob_type.script.state(instance.fsm.cur_state))
            .is_some_and(|state| state.has_handler(kind))
    })
}

fn is_idle(mob_type: &MobType, mob: &Mob) -> bool {
    mob_type.idle_states.contains(&mob.fsm.cur_state)
}

fn push_body(mob_type: &MobType, mob: &Mob, order: usize) -> PushBody {
    PushBody {
        order,
        pos: mob.pos,
        z: mob.z,
        height: mob.height,
        radius: mob.radius,
        rect: mob.oriented_rect(),
        team: mob.team,
        intangible: mob.flags.intangible,
        pushable: mob_type.pushable,
        unpushable: mob.flags.unpushable,
        pushes: mob_type.pushes,
        pushes_softly: mob_type.pushes_softly,
        pushes_with_hitboxes: mob_type.pushes_with_hitboxes,
        idle: is_idle(mob_type, mob),
        time_alive: mob.time_alive,
        carried_and_moving: mob.is_being_carried()
            && mob.carry.as_ref().is_some_and(|carry| carry.is_moving),
    }
}

/// Whether the two bodies overlap on the ground plane.
fn bodies_collide(a: &Mob, b: &Mob) -> bool {
    match (a.oriented_rect(), b.oriented_rect()) {
        (Some(a_rect), Some(b_rect)) => rects_overlap(&a_rect, &b_rect).is_some(),
        (Some(a_rect), None) => circle_rect_overlap(b.pos, b.radius, &a_rect).is_some(),
        (None, Some(b_rect)) => circle_rect_overlap(a.pos, a.radius, &b_rect).is_some(),
        (None, None) => circles_overlap(a.pos, a.radius, b.pos, b.radius).is_some(),
    }
}

fn hunts(content: &ContentDatabase, sim: &SimContext, a_id: MobId, b_id: MobId) -> bool {
    let (Some(a), Some(b)) = (sim.arena.get(a_id), sim.arena.get(b_id)) else {
        return false;
    };
    content
        .mob_type(a.type_id)
        .is_some_and(|a_type| can_hunt(content, a_type, a, b))
}

/// Runs one mob's interaction pass against every other live mob.
pub(crate) fn process_mob_interactions(sim: &mut SimContext, a_id: MobId, a_order: usize) {
    let content = Arc::clone(&sim.content);
    let Some((a_type_id, state_before, a_radius)) = sim
        .arena
        .get(a_id)
        .map(|a| (a.type_id, a.fsm.cur_state, a.radius))
    else {
        return;
    };
    let Some(a_type) = content.mob_type(a_type_id) else {
        return;
    };

    let mut pending = Vec::<PendingIntermobEvent>::new();
    let others = sim.arena.ids().to_vec();
    for (b_order, b_id) in others.into_iter().enumerate() {
        if b_id == a_id {
            continue;
        }
        let Some(a) = sim.arena.get(a_id) else {
            return;
        };
        if a.to_delete {
            break;
        }
        let Some(b) = sim.arena.get(b_id) else {
            continue;
        };
        if b.to_delete || b.stored_inside.is_some() {
            continue;
        }
        let Some(b_type) = content.mob_type(b.type_id) else {
            continue;
        };
        sim.report.pairs_scanned += 1;

        let distance = a.pos.distance(b.pos);
        if a.distance_between(b) > interaction_span(a_type, a) + b_type.physical_span() {
            sim.report.pairs_gated += 1;
            continue;
        }

        let in_touch_range = distance <= a_type.physical_span() + b_type.physical_span();
        let check_reach = b.health != 0.0 && a.near_reach.is_some() && !b.is_invisible(&content);

        if in_touch_range {
            sim.report.touch_checks += 1;
            process_touches(sim, &content, a_id, a_order, b_id, b_order);
        }
        if check_reach {
            process_reaches(sim, &content, a_id, b_id, &mut pending);
        }
        process_misc(sim, &content, a_id, b_id, &mut pending);
        if in_touch_range {
            process_hitboxes(sim, &content, a_id, b_id);
        }
    }

    sort_pending(&mut pending, a_radius);
    sim.report.deferred_queued += pending.len() as u64;
    for (position, event) in pending.iter().enumerate() {
        let Some(current) = sim.arena.get(a_id).map(|a| a.fsm.cur_state) else {
            break;
        };
        if current != state_before {
            // Anything left was computed against the old state.
            sim.report.deferred_skipped += (pending.len() - position) as u64;
            break;
        }
        let Some(handler) = a_type
            .script
            .state(event.handler.state)
            .and_then(|state| state.handler(event.handler.kind))
        else {
            continue;
        };
        trace!(
            mob = a_id.index,
            other = event.other.index,
            event = event.handler.kind.script_name(),
            "deferred_event_dispatch"
        );
        sim.report.deferred_dispatched += 1;
        run_handler(sim, a_id, handler, &EventPayload::Mob(event.other));
    }
}

fn process_touches(
    sim: &mut SimContext,
    content: &ContentDatabase,
    a_id: MobId,
    a_order: usize,
    b_id: MobId,
    b_order: usize,
) {
    let (push, touching) = {
        let (Some(a), Some(b)) = (sim.arena.get(a_id), sim.arena.get(b_id)) else {
            return;
        };
        let (Some(a_type), Some(b_type)) = (content.mob_type(a.type_id), content.mob_type(b.type_id))
        else {
            return;
        };

        let hitboxes = if b_type.pushes_with_hitboxes {
            b.current_hitboxes(content)
                .iter()
                .filter(|hitbox| hitbox.kind != HitboxKind::Disabled)
                .map(|hitbox| PushHitbox {
                    pos: b.hitbox_world_pos(hitbox),
                    radius: hitbox.radius,
                })
                .collect::<Vec<_>>()
        } else {
            Vec::new()
        };
        let push = resolve_push(
            &sim.config,
            &push_body(a_type, a, a_order),
            &push_body(b_type, b, b_order),
            &hitboxes,
            sim.delta_t,
        );

        let touching = !b.flags.intangible
            && height_bands_touch(a.z, a.height, b.z, b.height)
            && bodies_collide(a, b);
        (push, touching)
    };

    if let Some(push) = push {
        if let Some(a) = sim.arena.get_mut(a_id) {
            // Only the strongest push of the frame is kept.
            if push.amount > a.push_amount {
                a.push_amount = push.amount;
                a.push_angle = push.angle;
            }
        }
    }

    if touching {
        sim.report.immediate_events += 1;
        run_event(sim, a_id, MobEventKind::TouchedObject, &EventPayload::Mob(b_id));
        if hunts(content, sim, a_id, b_id) {
            run_event(sim, a_id, MobEventKind::TouchedOpponent, &EventPayload::Mob(b_id));
        }
    }
}

/// Whether `b` is inside either of the two cones of `a`'s near reach.
pub fn in_reach(mob_type: &MobType, a: &Mob, b: &Mob, reach_index: usize) -> bool {
    let Some(reach) = mob_type.reaches.get(reach_index) else {
        return false;
    };
    let gap = a.distance_between(b);
    let face_diff = angle_smallest_diff(a.angle, a.pos.angle_to(b.pos));
    (gap <= reach.radius_1 && face_diff <= reach.angle_1 / 2.0)
        || (gap <= reach.radius_2 && face_diff <= reach.angle_2 / 2.0)
}

fn process_reaches(
    sim: &SimContext,
    content: &ContentDatabase,
    a_id: MobId,
    b_id: MobId,
    pending: &mut Vec<PendingIntermobEvent>,
) {
    let (Some(a), Some(b)) = (sim.arena.get(a_id), sim.arena.get(b_id)) else {
        return;
    };
    let Some(a_type) = content.mob_type(a.type_id) else {
        return;
    };
    let Some(state) = a_type.script.state(a.fsm.cur_state) else {
        return;
    };
    let object_in_reach = state.has_handler(MobEventKind::ObjectInReach);
    let opponent_in_reach = state.has_handler(MobEventKind::OpponentInReach);
    if !object_in_reach && !opponent_in_reach {
        return;
    }
    let Some(reach_index) = a.near_reach else {
        return;
    };
    if !in_reach(a_type, a, b, reach_index) {
        return;
    }

    let distance = a.pos.distance(b.pos);
    let mut queue = |kind| {
        pending.push(PendingIntermobEvent {
            distance,
            other_radius: b.radius,
            handler: HandlerRef {
                state: state.id,
                kind,
            },
            other: b_id,
        })
    };
    if object_in_reach {
        queue(MobEventKind::ObjectInReach);
    }
    if opponent_in_reach && can_hunt(content, a_type, a, b) {
        queue(MobEventKind::OpponentInReach);
    }
}

fn process_misc(
    sim: &mut SimContext,
    content: &ContentDatabase,
    a_id: MobId,
    b_id: MobId,
    pending: &mut Vec<PendingIntermobEvent>,
) {
    let bumped_by_leader = {
        let (Some(a), Some(b)) = (sim.arena.get(a_id), sim.arena.get(b_id)) else {
            return;
        };
        let Some(a_type) = content.mob_type(a.type_id) else {
            return;
        };
        let Some(state) = a_type.script.state(a.fsm.cur_state) else {
            return;
        };
        let gap = a.distance_between(b);
        let distance = a.pos.distance(b.pos);
        let in_task_range = gap <= sim.config.task_range;
        let mut queue = |kind| {
            pending.push(PendingIntermobEvent {
                distance,
                other_radius: b.radius,
                handler: HandlerRef {
                    state: state.id,
                    kind,
                },
                other: b_id,
            })
        };

        if state.has_handler(MobEventKind::NearCarriableObject)
            && in_task_range
            && b.carry.as_ref().is_some_and(|carry| !carry.is_full())
        {
            queue(MobEventKind::NearCarriableObject);
        }

        if state.has_handler(MobEventKind::NearTool) && in_task_range {
            if let CategoryData::Tool { reserved } = &b.category {
                if reserved.map_or(true, |holder| holder == a_id) {
                    queue(MobEventKind::NearTool);
                }
            }
        }

        if state.has_handler(MobEventKind::NearGroupTask)
            && in_task_range
            && b.health > 0.0
            && b.category.has_free_task_spot()
        {
            queue(MobEventKind::NearGroupTask);
        }

        sim.active_leader == Some(b_id)
            && gap <= 0.0
            && b.state_name(content) == sim.config.leader_active_state
            && state.has_handler(MobEventKind::TouchedActiveLeader)
    };

    if bumped_by_leader {
        sim.report.immediate_events += 1;
        run_event(sim, a_id, MobEventKind::TouchedActiveLeader, &EventPayload::Mob(b_id));
    }
}

fn held_by_hitbox(held: &Mob, holder: MobId, hitbox: usize) -> bool {
    held.holder
        .is_some_and(|current| current.mob == holder && current.hitbox == hitbox)
}

fn process_hitboxes(sim: &mut SimContext, content: &ContentDatabase, a_id: MobId, b_id: MobId) {
    let (a_hitboxes, b_hitboxes, a_type, b_type) = {
        let (Some(a), Some(b)) = (sim.arena.get(a_id), sim.arena.get(b_id)) else {
            return;
        };
        let (Some(a_type), Some(b_type)) = (content.mob_type(a.type_id), content.mob_type(b.type_id))
        else {
            return;
        };
        (
            a.current_hitboxes(content),
            b.current_hitboxes(content),
            a_type,
            b_type,
        )
    };
    if a_hitboxes.is_empty() || b_hitboxes.is_empty() {
        return;
    }
    let relevant = [
        MobEventKind::HitboxTouchAN,
        MobEventKind::HitboxTouchNA,
        MobEventKind::HitboxTouchNN,
        MobEventKind::HitboxTouchEat,
    ];
    if !relevant
        .into_iter()
        .any(|kind| has_handler(content, sim, a_id, kind))
    {
        return;
    }

    let mut reports = HitboxReports::default();
    for (own_index, own) in a_hitboxes.iter().enumerate() {
        if own.kind == HitboxKind::Disabled {
            continue;
        }
        for (other_index, other) in b_hitboxes.iter().enumerate() {
            if other.kind == HitboxKind::Disabled {
                continue;
            }

            let (gate_passed, attack_disabled, eats) = {
                let (Some(a), Some(b)) = (sim.arena.get(a_id), sim.arena.get(b_id)) else {
                    return;
                };
                let held = held_by_hitbox(a, b_id, other_index) || held_by_hitbox(b, a_id, own_index);
                let collided = held
                    || (height_bands_touch(a.z + own.z, own.height, b.z + other.z, other.height)
                        && a.hitbox_world_pos(own).distance(b.hitbox_world_pos(other))
                            < own.radius + other.radius);
                if !collided {
                    continue;
                }
                let resisted = !other.hazards.is_empty()
                    && other
                        .hazards
                        .iter()
                        .all(|hazard| a_type.is_resistant_to(*hazard));
                let hurts = can_hurt(content, b_type, b, a);
                (
                    !resisted && hurts,
                    b.attack_disabled(content),
                    b.chomp.accepts(other.body_part),
                )
            };
            sim.report.hitbox_contacts += 1;

            let contact = HitboxContact {
                other: b_id,
                own_hitbox: own_index,
                other_hitbox: other_index,
                other_body_part: other.body_part,
                other_value: other.value,
            };
            let payload = EventPayload::Hitbox(contact);

            if !reports.attack_normal
                && own.kind == HitboxKind::Attack
                && other.kind == HitboxKind::Normal
                && has_handler(content, sim, a_id, MobEventKind::HitboxTouchAN)
            {
                reports.attack_normal = true;
                run_event(sim, a_id, MobEventKind::HitboxTouchAN, &payload);
            }

            if !reports.normal_normal
                && own.kind == HitboxKind::Normal
                && other.kind == HitboxKind::Normal
                && has_handler(content, sim, a_id, MobEventKind::HitboxTouchNN)
            {
                reports.normal_normal = true;
                run_event(sim, a_id, MobEventKind::HitboxTouchNN, &payload);
            }

            if own.kind != HitboxKind::Normal || other.kind != HitboxKind::Attack || !gate_passed {
                continue;
            }

            if !reports.eat
                && !attack_disabled
                && eats
                && has_handler(content, sim, a_id, MobEventKind::HitboxTouchEat)
            {
                reports.eat = true;
                run_event(sim, a_id, MobEventKind::HitboxTouchEat, &payload);
            }

            if !reports.hazard
                && !attack_disabled
                && !other.hazards.is_empty()
                && has_handler(content, sim, a_id, MobEventKind::TouchedHazard)
            {
                reports.hazard = true;
                for hazard in &other.hazards {
                    run_event(
                        sim,
                        a_id,
                        MobEventKind::TouchedHazard,
                        &EventPayload::Hazard {
                            hazard: *hazard,
                            contact: Some(contact),
                        },
                    );
                }
            }

            if !reports.normal_attack
                && !attack_disabled
                && has_handler(content, sim, a_id, MobEventKind::HitboxTouchNA)
            {
                reports.normal_attack = true;
                run_event(sim, a_id, MobEventKind::HitboxTouchNA, &payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(distance: f32, other_radius: f32, other: u32) -> PendingIntermobEvent {
        PendingIntermobEvent {
            distance,
            other_radius,
            handler: HandlerRef {
                state: StateId(0),
                kind: MobEventKind::ObjectInReach,
            },
            other: MobId {
                index: other,
                generation: 0,
            },
        }
    }

    #[test]
    fn pending_sorts_by_surface_distance_not_center_distance() {
        let mut pending = vec![event(30.0, 5.0, 0), event(32.0, 20.0, 1), event(12.0, 1.0, 2)];
        sort_pending(&mut pending, 5.0);
        let order = pending.iter().map(|ev| ev.other.index).collect::<Vec<_>>();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn pending_ties_keep_insertion_order() {
        let mut pending = vec![event(20.0, 5.0, 7), event(25.0, 10.0, 3), event(20.0, 5.0, 5)];
        sort_pending(&mut pending, 5.0);
        let order = pending.iter().map(|ev| ev.other.index).collect::<Vec<_>>();
        assert_eq!(order, vec![7, 3, 5]);
    }
}
