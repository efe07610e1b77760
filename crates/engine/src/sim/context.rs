use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::debug;

use crate::content::{ContentDatabase, MobCategory, MobType, MobTypeId};
use crate::geometry::Vec2;
use crate::script::{run_event, EventPayload, MobEventKind};

use super::area::{AreaGeometry, FlatArea};
use super::arena::MobArena;
use super::config::SimConfig;
use super::mob::{Mob, MobId};
use super::snapshot::MobSnapshot;
use super::stats::Statistics;
use super::step::FrameReport;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown mob type '{0}'")]
    UnknownMobType(String),
    #[error("unknown mob type id {0:?}")]
    UnknownMobTypeId(MobTypeId),
    #[error("mob {0:?} does not exist")]
    UnknownMob(MobId),
}

/// All state of one running area. Passed by reference to the interaction
/// pipeline and to every action runner.
pub struct SimContext {
    pub content: Arc<ContentDatabase>,
    pub config: SimConfig,
    pub arena: MobArena,
    pub stats: Statistics,
    pub active_leader: Option<MobId>,
    pub(crate) area: Box<dyn AreaGeometry>,
    pub(crate) rng: SmallRng,
    pub(crate) event_depth: u32,
    pub(crate) delta_t: f32,
    pub(crate) report: FrameReport,
    pub(crate) frame: u64,
}

impl SimContext {
    pub fn new(content: Arc<ContentDatabase>, config: SimConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            content,
            config,
            arena: MobArena::default(),
            stats: Statistics::default(),
            active_leader: None,
            area: Box::new(FlatArea::default()),
            rng,
            event_depth: 0,
            delta_t: 0.0,
            report: FrameReport::default(),
            frame: 0,
        }
    }

    pub fn with_area(mut self, area: impl AreaGeometry + 'static) -> Self {
        self.area = Box::new(area);
        self
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn delta_t(&self) -> f32 {
        self.delta_t
    }

    pub fn mob(&self, id: MobId) -> Option<&Mob> {
        self.arena.get(id)
    }

    pub fn mob_mut(&mut self, id: MobId) -> Option<&mut Mob> {
        self.arena.get_mut(id)
    }

    pub fn mob_type_of(&self, id: MobId) -> Option<&MobType> {
        self.arena
            .get(id)
            .and_then(|mob| self.content.mob_type(mob.type_id))
    }

    pub fn state_name_of(&self, id: MobId) -> Option<&str> {
        self.arena.get(id).map(|mob| mob.state_name(&self.content))
    }

    pub fn set_active_leader(&mut self, leader: Option<MobId>) {
        self.active_leader = leader;
    }

    /// Queues a mob of the named type. It joins on the next
    /// [`SimContext::apply_pending`].
    pub fn spawn_mob(&mut self, type_name: &str, pos: Vec2, angle: f32) -> Result<MobId, SimError> {
        let type_id = self
            .content
            .mob_type_id_by_name(type_name)
            .ok_or_else(|| SimError::UnknownMobType(type_name.to_string()))?;
        let mob = self.create_mob(type_id, pos, 0.0, angle)?;
        let id = mob.id;
        self.arena.queue_spawn(mob);
        Ok(id)
    }

    /// Builds a mob with a reserved handle; the caller queues it.
    pub(crate) fn create_mob(
        &mut self,
        type_id: MobTypeId,
        pos: Vec2,
        z: f32,
        angle: f32,
    ) -> Result<Mob, SimError> {
        let content = Arc::clone(&self.content);
        let mob_type = content
            .mob_type(type_id)
            .ok_or(SimError::UnknownMobTypeId(type_id))?;
        let floor = self.area.floor_z_at(pos);
        let id = self.arena.reserve_id();
        Ok(Mob::new(id, mob_type, pos, z.max(floor), angle))
    }

    /// Joins queued mobs and runs their initial state's `on_enter`, then
    /// `on_ready`.
    pub fn apply_pending(&mut self) -> Vec<MobId> {
        let joined = self.arena.apply_pending();
        for id in &joined {
            self.stats.mobs_spawned += 1;
            if self
                .arena
                .get(*id)
                .is_some_and(|mob| mob.category() == MobCategory::Leader)
                && self.active_leader.is_none()
            {
                self.active_leader = Some(*id);
            }
            debug!(mob = id.index, "mob_joined");
            run_event(self, *id, MobEventKind::OnEnter, &EventPayload::None);
            run_event(self, *id, MobEventKind::OnReady, &EventPayload::None);
        }
        joined
    }

    /// Delivers a script message to `receiver` right away.
    pub fn send_message(&mut self, sender: MobId, receiver: MobId, text: &str) {
        if !self.arena.contains(receiver) {
            return;
        }
        self.stats.messages_sent += 1;
        run_event(
            self,
            receiver,
            MobEventKind::ReceiveMessage,
            &EventPayload::Message {
                text: text.to_string(),
                sender,
            },
        );
    }

    pub fn snapshot(&self) -> Vec<MobSnapshot> {
        self.arena
            .iter()
            .map(|mob| MobSnapshot::capture(mob, &self.content))
            .collect()
    }
}
