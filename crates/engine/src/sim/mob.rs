use std::collections::HashMap;

use serde::Serialize;

use crate::content::{
    ContentDatabase, HazardId, HitboxDef, MobCategory, MobType, MobTypeId, StatusId, Team,
};
use crate::geometry::{OrientedRect, Vec2};
use crate::script::MobFsm;

/// Stable handle into the mob arena. The generation makes handles to
/// deleted mobs fail lookups instead of aliasing a reused slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MobId {
    pub index: u32,
    pub generation: u32,
}

/// Category-specific data, resolved once when the mob is created.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryData {
    Pikmin,
    Leader,
    Enemy,
    Treasure,
    Pellet,
    Tool { reserved: Option<MobId> },
    GroupTask { spots: Vec<Option<MobId>> },
    Custom,
}

impl CategoryData {
    pub fn for_type(mob_type: &MobType) -> Self {
        match mob_type.category {
            MobCategory::Pikmin => CategoryData::Pikmin,
            MobCategory::Leader => CategoryData::Leader,
            MobCategory::Enemy => CategoryData::Enemy,
            MobCategory::Treasure => CategoryData::Treasure,
            MobCategory::Pellet => CategoryData::Pellet,
            MobCategory::Tool => CategoryData::Tool { reserved: None },
            MobCategory::GroupTask => CategoryData::GroupTask {
                spots: vec![None; mob_type.group_task_spots],
            },
            MobCategory::Custom => CategoryData::Custom,
        }
    }

    pub fn category(&self) -> MobCategory {
        match self {
            CategoryData::Pikmin => MobCategory::Pikmin,
            CategoryData::Leader => MobCategory::Leader,
            CategoryData::Enemy => MobCategory::Enemy,
            CategoryData::Treasure => MobCategory::Treasure,
            CategoryData::Pellet => MobCategory::Pellet,
            CategoryData::Tool { .. } => MobCategory::Tool,
            CategoryData::GroupTask { .. } => MobCategory::GroupTask,
            CategoryData::Custom => MobCategory::Custom,
        }
    }

    pub fn has_free_task_spot(&self) -> bool {
        match self {
            CategoryData::GroupTask { spots } => spots.iter().any(Option::is_none),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Holder {
    pub mob: MobId,
    pub hitbox: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarryInfo {
    pub spots: Vec<Option<MobId>>,
    pub is_moving: bool,
}

impl CarryInfo {
    pub fn new(spot_count: usize) -> Self {
        Self {
            spots: vec![None; spot_count],
            is_moving: false,
        }
    }

    pub fn is_full(&self) -> bool {
        self.spots.iter().all(Option::is_some)
    }

    pub fn carrier_count(&self) -> usize {
        self.spots.iter().flatten().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaseTarget {
    pub pos: Vec2,
    pub speed: f32,
    /// Mob whose position replaces `pos` every frame while it exists.
    pub follow: Option<MobId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimationState {
    pub animation: usize,
    pub frame: usize,
    pub frame_time: f32,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusInstance {
    pub status: StatusId,
    pub time_left: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MobFlags {
    pub intangible: bool,
    pub unpushable: bool,
    pub non_huntable: bool,
    pub non_hurtable: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChompState {
    pub max_victims: usize,
    pub body_parts: Vec<usize>,
    pub victims: Vec<MobId>,
}

impl ChompState {
    pub fn accepts(&self, body_part: usize) -> bool {
        self.victims.len() < self.max_victims && self.body_parts.contains(&body_part)
    }
}

#[derive(Debug, Clone)]
pub struct Mob {
    pub id: MobId,
    pub type_id: MobTypeId,
    pub category: CategoryData,
    pub pos: Vec2,
    pub z: f32,
    pub speed_z: f32,
    pub angle: f32,
    pub home: Vec2,
    pub radius: f32,
    pub rectangle: Option<Vec2>,
    pub height: f32,
    pub health: f32,
    pub max_health: f32,
    pub team: Team,
    pub flags: MobFlags,
    pub fsm: MobFsm,
    pub vars: HashMap<String, String>,
    pub chase: Option<ChaseTarget>,
    pub focus: Option<MobId>,
    pub links: Vec<MobId>,
    pub parent: Option<MobId>,
    pub holder: Option<Holder>,
    pub stored_inside: Option<MobId>,
    pub carry: Option<CarryInfo>,
    pub claimed: Option<MobId>,
    pub chomp: ChompState,
    pub near_reach: Option<usize>,
    pub far_reach: Option<usize>,
    pub animation: Option<AnimationState>,
    pub statuses: Vec<StatusInstance>,
    pub hazards_touching: Vec<HazardId>,
    /// Opponents recently hit, with the seconds left before they can be hit again.
    pub hit_opponents: Vec<(MobId, f32)>,
    pub script_timer: Option<f32>,
    pub push_amount: f32,
    pub push_angle: f32,
    pub time_alive: f32,
    pub dying: bool,
    pub to_delete: bool,
}

impl Mob {
    pub(crate) fn new(id: MobId, mob_type: &MobType, pos: Vec2, z: f32, angle: f32) -> Self {
        Self {
            id,
            type_id: mob_type.id,
            category: CategoryData::for_type(mob_type),
            pos,
            z,
            speed_z: 0.0,
            angle,
            home: pos,
            radius: mob_type.radius,
            rectangle: mob_type.rectangle,
            height: mob_type.height,
            health: mob_type.max_health,
            max_health: mob_type.max_health,
            team: mob_type.team,
            flags: MobFlags::default(),
            fsm: MobFsm::new(mob_type.script.initial_state),
            vars: HashMap::new(),
            chase: None,
            focus: None,
            links: Vec::new(),
            parent: None,
            holder: None,
            stored_inside: None,
            carry: (mob_type.carry_spots > 0).then(|| CarryInfo::new(mob_type.carry_spots)),
            claimed: None,
            chomp: ChompState::default(),
            near_reach: mob_type.default_near_reach,
            far_reach: mob_type.default_far_reach,
            animation: (!mob_type.animations.is_empty()).then(AnimationState::default),
            statuses: Vec::new(),
            hazards_touching: Vec::new(),
            hit_opponents: Vec::new(),
            script_timer: None,
            push_amount: 0.0,
            push_angle: 0.0,
            time_alive: 0.0,
            dying: false,
            to_delete: false,
        }
    }

    pub fn category(&self) -> MobCategory {
        self.category.category()
    }

    pub fn state_name<'a>(&self, content: &'a ContentDatabase) -> &'a str {
        content
            .mob_type(self.type_id)
            .map(|mob_type| mob_type.script.state_name(self.fsm.cur_state))
            .unwrap_or("")
    }

    pub fn animation_name<'a>(&self, content: &'a ContentDatabase) -> &'a str {
        let Some(state) = self.animation else {
            return "";
        };
        content
            .mob_type(self.type_id)
            .and_then(|mob_type| mob_type.animations.get(state.animation))
            .map(|anim| anim.name.as_str())
            .unwrap_or("")
    }

    /// Hitboxes of the current animation frame.
    pub fn current_hitboxes<'a>(&self, content: &'a ContentDatabase) -> &'a [HitboxDef] {
        let Some(state) = self.animation else {
            return &[];
        };
        content
            .mob_type(self.type_id)
            .and_then(|mob_type| mob_type.animations.get(state.animation))
            .and_then(|anim| anim.frames.get(state.frame))
            .map(|frame| frame.hitboxes.as_slice())
            .unwrap_or(&[])
    }

    pub fn hitbox_world_pos(&self, hitbox: &HitboxDef) -> Vec2 {
        self.pos + hitbox.pos.rotated(self.angle)
    }

    pub fn oriented_rect(&self) -> Option<OrientedRect> {
        self.rectangle.map(|dims| OrientedRect {
            center: self.pos,
            dims,
            angle: self.angle,
        })
    }

    /// Distance between the two bodies' edges. Rectangles use the closest
    /// point of the rectangle to this mob's center.
    pub fn distance_between(&self, other: &Mob) -> f32 {
        match other.oriented_rect() {
            Some(rect) => {
                let (closest, inside) = rect.closest_point(self.pos);
                if inside {
                    0.0
                } else {
                    self.pos.distance(closest) - self.radius
                }
            }
            None => self.pos.distance(other.pos) - (self.radius + other.radius),
        }
    }

    pub fn has_status(&self, status: StatusId) -> bool {
        self.statuses.iter().any(|instance| instance.status == status)
    }

    pub fn is_invisible(&self, content: &ContentDatabase) -> bool {
        self.statuses.iter().any(|instance| {
            content
                .status(instance.status)
                .is_some_and(|status| status.invisible)
        })
    }

    pub fn attack_disabled(&self, content: &ContentDatabase) -> bool {
        self.statuses.iter().any(|instance| {
            content
                .status(instance.status)
                .is_some_and(|status| status.disables_attack)
        })
    }

    pub fn is_being_carried(&self) -> bool {
        self.carry
            .as_ref()
            .is_some_and(|carry| carry.carrier_count() > 0)
    }

    pub fn recently_hit(&self, victim: MobId) -> bool {
        self.hit_opponents.iter().any(|(id, _)| *id == victim)
    }

    pub fn var(&self, name: &str) -> &str {
        self.vars.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Whether `hunter` may target `victim` as an opponent.
pub fn can_hunt(
    content: &ContentDatabase,
    hunter_type: &MobType,
    hunter: &Mob,
    victim: &Mob,
) -> bool {
    let Some(victim_type) = content.mob_type(victim.type_id) else {
        return false;
    };
    if hunter.team == victim.team && hunter.team != Team::None {
        return false;
    }
    if victim_type.target_type.is_none() {
        return false;
    }
    if victim.is_invisible(content) || victim.flags.non_huntable {
        return false;
    }
    hunter_type
        .huntable_targets
        .intersects(victim_type.target_type)
}

/// Whether an attack by `attacker` may damage `victim` right now.
pub fn can_hurt(
    content: &ContentDatabase,
    attacker_type: &MobType,
    attacker: &Mob,
    victim: &Mob,
) -> bool {
    let Some(victim_type) = content.mob_type(victim.type_id) else {
        return false;
    };
    if attacker.team == victim.team && attacker.team != Team::None {
        return false;
    }
    if victim_type.target_type.is_none() || victim.flags.non_hurtable {
        return false;
    }
    if attacker.recently_hit(victim.id) {
        return false;
    }
    attacker_type
        .hurtable_targets
        .intersects(victim_type.target_type)
}
