use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::content::{ContentDatabase, MobType};
use crate::geometry::Vec2;
use crate::script::{run_event, EventPayload, MobEventKind};

use super::context::SimContext;
use super::interaction::{in_reach, process_mob_interactions};
use super::mob::MobId;

/// Counters for one call to [`SimContext::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub mobs_ticked: u64,
    pub pairs_scanned: u64,
    pub pairs_gated: u64,
    pub touch_checks: u64,
    pub hitbox_contacts: u64,
    pub immediate_events: u64,
    pub deferred_queued: u64,
    pub deferred_dispatched: u64,
    pub deferred_skipped: u64,
    pub handlers_run: u64,
    pub mobs_deleted: u64,
    pub mobs_spawned: u64,
}

/// Mobs within this height of the floor count as standing on it.
const GROUND_TOLERANCE: f32 = 1.0;

impl SimContext {
    /// Advances the simulation by `delta_t` seconds: every mob runs its own
    /// tick followed by its interaction pass, in storage order. Deletions and
    /// spawns requested during the frame are applied at the end.
    pub fn step(&mut self, delta_t: f32) -> FrameReport {
        self.frame += 1;
        self.delta_t = if delta_t.is_finite() { delta_t.max(0.0) } else { 0.0 };
        self.report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };

        let ids = self.arena.ids().to_vec();
        for (order, id) in ids.into_iter().enumerate() {
            if !self.arena.get(id).is_some_and(|mob| !mob.to_delete) {
                continue;
            }
            self.report.mobs_ticked += 1;
            self.tick_mob(id);

            let interacts = self
                .arena
                .get(id)
                .is_some_and(|mob| !mob.to_delete && mob.stored_inside.is_none());
            if interacts {
                process_mob_interactions(self, id, order);
            }
        }

        let removed = self.arena.sweep_deleted();
        for mob in &removed {
            debug!(mob = mob.id.index, "mob_deleted");
            if self.active_leader == Some(mob.id) {
                self.active_leader = None;
            }
        }
        self.stats.mobs_deleted += removed.len() as u64;
        self.report.mobs_deleted = removed.len() as u64;

        let joined = self.apply_pending();
        self.report.mobs_spawned = joined.len() as u64;

        trace!(
            frame = self.frame,
            mobs = self.arena.len(),
            pairs_scanned = self.report.pairs_scanned,
            handlers_run = self.report.handlers_run,
            "frame_stepped"
        );
        self.report
    }

    fn tick_mob(&mut self, id: MobId) {
        let content = Arc::clone(&self.content);
        let Some(mob_type) = self
            .arena
            .get(id)
            .and_then(|mob| content.mob_type(mob.type_id))
        else {
            return;
        };

        self.tick_timers(id, &content, mob_type);
        self.tick_animation(id, mob_type);

        let delta_t = self.delta_t;
        let timer_fired = self.arena.get_mut(id).is_some_and(|mob| {
            let Some(left) = mob.script_timer.as_mut() else {
                return false;
            };
            *left -= delta_t;
            if *left > 0.0 {
                return false;
            }
            mob.script_timer = None;
            true
        });
        if timer_fired {
            run_event(self, id, MobEventKind::Timer, &EventPayload::None);
        }

        run_event(self, id, MobEventKind::OnTick, &EventPayload::None);

        let died = self
            .arena
            .get(id)
            .is_some_and(|mob| !mob.dying && mob.max_health != 0.0 && mob.health <= 0.0);
        if died {
            run_event(self, id, MobEventKind::Death, &EventPayload::None);
        }

        self.check_focus(id, &content, mob_type);

        let far_from_home = self.arena.get(id).is_some_and(|mob| {
            mob_type.territory_radius > 0.0
                && mob.pos.distance(mob.home) > mob_type.territory_radius
        });
        if far_from_home {
            run_event(self, id, MobEventKind::FarFromHome, &EventPayload::None);
        }

        self.tick_physics(id, &content);
        self.check_area_hazards(id);
    }

    fn tick_timers(&mut self, id: MobId, content: &ContentDatabase, mob_type: &MobType) {
        let delta_t = self.delta_t;
        let floor = self.config.max_health_floor;
        let Some(mob) = self.arena.get_mut(id) else {
            return;
        };
        mob.time_alive += delta_t;
        mob.hit_opponents.retain_mut(|(_, left)| {
            *left -= delta_t;
            *left > 0.0
        });

        let mut health_change = 0.0;
        mob.statuses.retain_mut(|instance| {
            let Some(status) = content.status(instance.status) else {
                return false;
            };
            health_change += status.health_per_second * delta_t;
            if status.duration <= 0.0 {
                return true;
            }
            instance.time_left -= delta_t;
            instance.time_left > 0.0
        });
        if mob.health > 0.0 && mob.health < mob.max_health {
            health_change += mob_type.health_regen * delta_t;
        }
        if health_change != 0.0 {
            mob.health = (mob.health + health_change).clamp(floor, mob.max_health.max(floor));
        }
    }

    fn tick_animation(&mut self, id: MobId, mob_type: &MobType) {
        let delta_t = self.delta_t;
        let mut signals = Vec::new();
        let mut ended = false;
        {
            let Some(mob) = self.arena.get_mut(id) else {
                return;
            };
            let Some(state) = mob.animation.as_mut() else {
                return;
            };
            let Some(animation) = mob_type.animations.get(state.animation) else {
                return;
            };
            if animation.frames.is_empty() || state.finished {
                return;
            }
            state.frame_time += delta_t;
            // Bounded so zero-length frames cannot spin forever.
            for _ in 0..animation.frames.len() * 2 {
                let Some(frame) = animation.frames.get(state.frame) else {
                    break;
                };
                if state.frame_time < frame.duration {
                    break;
                }
                state.frame_time -= frame.duration;
                if state.frame + 1 < animation.frames.len() {
                    state.frame += 1;
                } else if animation.loops {
                    state.frame = 0;
                    ended = true;
                } else {
                    state.finished = true;
                    state.frame_time = 0.0;
                    ended = true;
                    break;
                }
                if let Some(signal) = animation.frames.get(state.frame).and_then(|f| f.signal) {
                    signals.push(signal);
                }
            }
        }

        for signal in signals {
            run_event(
                self,
                id,
                MobEventKind::FrameSignal,
                &EventPayload::FrameSignal(signal),
            );
        }
        if ended {
            run_event(self, id, MobEventKind::AnimationEnd, &EventPayload::None);
        }
    }

    fn check_focus(&mut self, id: MobId, content: &ContentDatabase, mob_type: &MobType) {
        let Some(focus) = self.arena.get(id).and_then(|mob| mob.focus) else {
            return;
        };
        let focus_dead = self
            .arena
            .get(focus)
            .map_or(true, |other| other.to_delete || (other.max_health != 0.0 && other.health <= 0.0));
        if focus_dead {
            run_event(self, id, MobEventKind::FocusDied, &EventPayload::Mob(focus));
            if let Some(mob) = self.arena.get_mut(id) {
                if mob.focus == Some(focus) {
                    mob.focus = None;
                }
            }
            return;
        }

        let off_reach = match (self.arena.get(id), self.arena.get(focus)) {
            (Some(mob), Some(other)) => mob.far_reach.is_some_and(|reach| {
                !in_reach(mob_type, mob, other, reach) || other.is_invisible(content)
            }),
            _ => false,
        };
        if off_reach {
            run_event(self, id, MobEventKind::FocusOffReach, &EventPayload::Mob(focus));
        }
    }

    fn tick_physics(&mut self, id: MobId, content: &ContentDatabase) {
        let delta_t = self.delta_t;

        // Held and stored mobs ride along with whoever has them.
        let (holder, container) = match self.arena.get(id) {
            Some(mob) => (mob.holder, mob.stored_inside),
            None => return,
        };
        if let Some(holder) = holder {
            let anchor = self.arena.get(holder.mob).and_then(|holder_mob| {
                let hitbox = holder_mob.current_hitboxes(content).get(holder.hitbox)?;
                Some((holder_mob.hitbox_world_pos(hitbox), holder_mob.z + hitbox.z))
            });
            match anchor {
                Some((pos, z)) => {
                    if let Some(mob) = self.arena.get_mut(id) {
                        mob.pos = pos;
                        mob.z = z;
                    }
                }
                None => {
                    if let Some(mob) = self.arena.get_mut(id) {
                        mob.holder = None;
                    }
                    run_event(self, id, MobEventKind::Released, &EventPayload::None);
                }
            }
            return;
        }
        if let Some(container) = container {
            let anchor = self.arena.get(container).map(|other| (other.pos, other.z));
            if let (Some((pos, z)), Some(mob)) = (anchor, self.arena.get_mut(id)) {
                mob.pos = pos;
                mob.z = z;
            }
            return;
        }

        let follow_pos = self
            .arena
            .get(id)
            .and_then(|mob| mob.chase.and_then(|chase| chase.follow))
            .and_then(|target| self.arena.get(target).map(|other| other.pos));
        let mut reached = false;
        if let Some(mob) = self.arena.get_mut(id) {
            if let Some(chase) = mob.chase.as_mut() {
                if let Some(pos) = follow_pos {
                    chase.pos = pos;
                }
                let remaining = mob.pos.distance(chase.pos);
                let step = chase.speed * delta_t;
                if remaining <= step || remaining <= f32::EPSILON {
                    mob.pos = chase.pos;
                    if chase.follow.is_none() {
                        mob.chase = None;
                        reached = true;
                    }
                } else {
                    let heading = mob.pos.angle_to(chase.pos);
                    mob.pos += Vec2::from_angle(heading, step);
                    mob.angle = heading;
                }
            }

            if mob.push_amount != 0.0 {
                let speed = mob.push_amount + self.config.push_extra_amount;
                mob.pos += Vec2::from_angle(mob.push_angle, speed * delta_t);
                mob.push_amount = 0.0;
            }
        }
        if reached {
            run_event(self, id, MobEventKind::ReachedDestination, &EventPayload::None);
        }

        let floor = match self.arena.get(id) {
            Some(mob) => self.area.floor_z_at(mob.pos),
            None => return,
        };
        let gravity = self.config.gravity;
        let mut landed = false;
        if let Some(mob) = self.arena.get_mut(id) {
            if mob.z > floor || mob.speed_z > 0.0 {
                mob.speed_z += gravity * delta_t;
                mob.z += mob.speed_z * delta_t;
                if mob.z <= floor {
                    mob.z = floor;
                    mob.speed_z = 0.0;
                    landed = true;
                }
            } else if mob.z < floor {
                mob.z = floor;
            }

            let chasing = mob.chase.is_some();
            let carried = mob.is_being_carried();
            if let Some(carry) = mob.carry.as_mut() {
                carry.is_moving = chasing && carried;
            }
        }
        if landed {
            run_event(self, id, MobEventKind::Landed, &EventPayload::None);
        }
    }

    fn check_area_hazards(&mut self, id: MobId) {
        let (current, previous) = {
            let Some(mob) = self.arena.get(id) else {
                return;
            };
            let floor = self.area.floor_z_at(mob.pos);
            let current = if mob.z <= floor + GROUND_TOLERANCE && mob.holder.is_none() {
                self.area.hazards_at(mob.pos)
            } else {
                Vec::new()
            };
            (current, mob.hazards_touching.clone())
        };
        if current == previous {
            return;
        }
        if let Some(mob) = self.arena.get_mut(id) {
            mob.hazards_touching = current.clone();
        }
        for hazard in previous.iter().filter(|hazard| !current.contains(hazard)) {
            run_event(
                self,
                id,
                MobEventKind::LeftHazard,
                &EventPayload::Hazard {
                    hazard: *hazard,
                    contact: None,
                },
            );
        }
        for hazard in current.iter().filter(|hazard| !previous.contains(hazard)) {
            run_event(
                self,
                id,
                MobEventKind::TouchedHazard,
                &EventPayload::Hazard {
                    hazard: *hazard,
                    contact: None,
                },
            );
        }
    }
}
