use serde::Serialize;

use crate::content::ContentDatabase;

use super::mob::{Mob, MobId};

/// What renderers and HUDs read about a mob after the logic tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MobSnapshot {
    pub id: MobId,
    pub mob_type: String,
    pub category: &'static str,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub angle: f32,
    pub health: f32,
    pub max_health: f32,
    pub state: String,
    pub animation: String,
    pub to_delete: bool,
}

impl MobSnapshot {
    pub fn capture(mob: &Mob, content: &ContentDatabase) -> Self {
        Self {
            id: mob.id,
            mob_type: content
                .mob_type(mob.type_id)
                .map(|mob_type| mob_type.name.clone())
                .unwrap_or_default(),
            category: mob.category().name(),
            x: mob.pos.x,
            y: mob.pos.y,
            z: mob.z,
            angle: mob.angle,
            health: mob.health,
            max_health: mob.max_health,
            state: mob.state_name(content).to_string(),
            animation: mob.animation_name(content).to_string(),
            to_delete: mob.to_delete,
        }
    }
}
