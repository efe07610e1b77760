use crate::content::MobCategory;

use super::mob::{Mob, MobId};

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    mob: Option<Mob>,
}

/// Owns every mob. The global list and the per-category lists are index
/// sets into the slots and only change in [`MobArena::apply_pending`] and
/// [`MobArena::sweep_deleted`], never while a frame iterates them.
#[derive(Debug, Default)]
pub struct MobArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<MobId>,
    by_category: [Vec<MobId>; 8],
    pending_spawns: Vec<Mob>,
}

impl MobArena {
    /// Hands out a handle for a mob that will join on the next
    /// [`MobArena::apply_pending`].
    pub(crate) fn reserve_id(&mut self) -> MobId {
        match self.free.pop() {
            Some(index) => MobId {
                index,
                generation: self.slots[index as usize].generation,
            },
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot::default());
                MobId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    pub(crate) fn queue_spawn(&mut self, mob: Mob) {
        self.pending_spawns.push(mob);
    }

    pub fn pending_spawn_count(&self) -> usize {
        self.pending_spawns.len()
    }

    /// Moves queued mobs into the arena, in queue order. Returns their ids.
    pub(crate) fn apply_pending(&mut self) -> Vec<MobId> {
        let mut joined = Vec::with_capacity(self.pending_spawns.len());
        for mob in self.pending_spawns.drain(..) {
            let id = mob.id;
            let category = mob.category();
            let Some(slot) = self.slots.get_mut(id.index as usize) else {
                continue;
            };
            if slot.generation != id.generation || slot.mob.is_some() {
                continue;
            }
            slot.mob = Some(mob);
            self.order.push(id);
            self.by_category[category.index()].push(id);
            joined.push(id);
        }
        joined
    }

    /// Removes every mob flagged `to_delete` from the slots, the global list
    /// and its category list in one pass.
    pub(crate) fn sweep_deleted(&mut self) -> Vec<Mob> {
        let doomed = self
            .order
            .iter()
            .copied()
            .filter(|id| self.get(*id).is_some_and(|mob| mob.to_delete))
            .collect::<Vec<_>>();
        if doomed.is_empty() {
            return Vec::new();
        }

        self.order.retain(|id| !doomed.contains(id));
        for list in &mut self.by_category {
            list.retain(|id| !doomed.contains(id));
        }

        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            let slot = &mut self.slots[id.index as usize];
            if let Some(mob) = slot.mob.take() {
                removed.push(mob);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
        }
        removed
    }

    pub fn get(&self, id: MobId) -> Option<&Mob> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.mob.as_ref())
    }

    pub fn get_mut(&mut self, id: MobId) -> Option<&mut Mob> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.mob.as_mut())
    }

    pub fn contains(&self, id: MobId) -> bool {
        self.get(id).is_some()
    }

    /// Live mobs in storage order.
    pub fn ids(&self) -> &[MobId] {
        &self.order
    }

    pub fn category_ids(&self, category: MobCategory) -> &[MobId] {
        &self.by_category[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mob> {
        self.order.iter().filter_map(|id| self.get(*id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{MobType, MobTypeId, Team, TargetMask};
    use crate::geometry::Vec2;
    use crate::script::MobScript;

    fn mob_type(category: MobCategory) -> MobType {
        MobType {
            id: MobTypeId(0),
            name: "dummy".to_string(),
            category,
            radius: 5.0,
            rectangle: None,
            height: 0.0,
            max_health: 10.0,
            health_regen: 0.0,
            move_speed: 0.0,
            territory_radius: 0.0,
            team: Team::None,
            target_type: TargetMask::NONE,
            huntable_targets: TargetMask::NONE,
            hurtable_targets: TargetMask::NONE,
            pushable: true,
            pushes: true,
            pushes_softly: false,
            pushes_with_hitboxes: false,
            carry_spots: 0,
            group_task_spots: 0,
            resistances: Vec::new(),
            body_parts: Vec::new(),
            reaches: Vec::new(),
            default_near_reach: None,
            default_far_reach: None,
            animations: Vec::new(),
            spawns: Vec::new(),
            script: MobScript::default(),
            idle_states: Vec::new(),
            states_ignoring_death: Vec::new(),
            states_ignoring_hazard: Vec::new(),
            anim_hitbox_span: 0.0,
        }
    }

    fn spawn(arena: &mut MobArena, category: MobCategory) -> MobId {
        let id = arena.reserve_id();
        arena.queue_spawn(Mob::new(id, &mob_type(category), Vec2::ZERO, 0.0, 0.0));
        id
    }

    #[test]
    fn queued_mobs_are_invisible_until_applied() {
        let mut arena = MobArena::default();
        let id = spawn(&mut arena, MobCategory::Enemy);
        assert!(arena.get(id).is_none());
        assert_eq!(arena.apply_pending(), vec![id]);
        assert!(arena.get(id).is_some());
        assert_eq!(arena.category_ids(MobCategory::Enemy), &[id]);
    }

    #[test]
    fn sweep_removes_from_global_and_category_lists_together() {
        let mut arena = MobArena::default();
        let doomed = spawn(&mut arena, MobCategory::Pikmin);
        let survivor = spawn(&mut arena, MobCategory::Pikmin);
        let other = spawn(&mut arena, MobCategory::Tool);
        arena.apply_pending();

        arena.get_mut(doomed).expect("doomed").to_delete = true;
        let removed = arena.sweep_deleted();

        assert_eq!(removed.len(), 1);
        assert_eq!(arena.ids(), &[survivor, other]);
        assert_eq!(arena.category_ids(MobCategory::Pikmin), &[survivor]);
        assert!(arena.get(doomed).is_none());
    }

    #[test]
    fn reused_slot_does_not_resolve_stale_handle() {
        let mut arena = MobArena::default();
        let first = spawn(&mut arena, MobCategory::Pellet);
        arena.apply_pending();
        arena.get_mut(first).expect("first").to_delete = true;
        arena.sweep_deleted();

        let second = spawn(&mut arena, MobCategory::Pellet);
        arena.apply_pending();
        assert_eq!(first.index, second.index);
        assert_ne!(first, second);
        assert!(arena.get(first).is_none());
        assert!(arena.get(second).is_some());
    }
}
