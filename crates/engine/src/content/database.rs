use std::collections::HashMap;

use crate::geometry::Vec2;
use crate::script::{MobScript, StateId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MobTypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HazardId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MobCategory {
    Pikmin,
    Leader,
    Enemy,
    Treasure,
    Pellet,
    Tool,
    GroupTask,
    Custom,
}

impl MobCategory {
    pub const ALL: [MobCategory; 8] = [
        MobCategory::Pikmin,
        MobCategory::Leader,
        MobCategory::Enemy,
        MobCategory::Treasure,
        MobCategory::Pellet,
        MobCategory::Tool,
        MobCategory::GroupTask,
        MobCategory::Custom,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            MobCategory::Pikmin => "pikmin",
            MobCategory::Leader => "leader",
            MobCategory::Enemy => "enemy",
            MobCategory::Treasure => "treasure",
            MobCategory::Pellet => "pellet",
            MobCategory::Tool => "tool",
            MobCategory::GroupTask => "group_task",
            MobCategory::Custom => "custom",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Team {
    #[default]
    None,
    Player1,
    Player2,
    Player3,
    Player4,
    Enemy1,
    Enemy2,
    Enemy3,
    Enemy4,
    Obstacle,
    Other,
}

impl Team {
    pub const ALL: [Team; 11] = [
        Team::None,
        Team::Player1,
        Team::Player2,
        Team::Player3,
        Team::Player4,
        Team::Enemy1,
        Team::Enemy2,
        Team::Enemy3,
        Team::Enemy4,
        Team::Obstacle,
        Team::Other,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|team| team.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Team::None => "none",
            Team::Player1 => "player_1",
            Team::Player2 => "player_2",
            Team::Player3 => "player_3",
            Team::Player4 => "player_4",
            Team::Enemy1 => "enemy_1",
            Team::Enemy2 => "enemy_2",
            Team::Enemy3 => "enemy_3",
            Team::Enemy4 => "enemy_4",
            Team::Obstacle => "obstacle",
            Team::Other => "other",
        }
    }
}

/// Bit set describing what a mob counts as when others look for targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TargetMask(pub u16);

impl TargetMask {
    pub const NONE: TargetMask = TargetMask(0);
    pub const PLAYER: TargetMask = TargetMask(1);
    pub const ENEMY: TargetMask = TargetMask(1 << 1);
    pub const WEAK_PLAIN_OBSTACLE: TargetMask = TargetMask(1 << 2);
    pub const STRONG_PLAIN_OBSTACLE: TargetMask = TargetMask(1 << 3);
    pub const PIKMIN_OBSTACLE: TargetMask = TargetMask(1 << 4);
    pub const EXPLODABLE: TargetMask = TargetMask(1 << 5);
    pub const FRAGILE: TargetMask = TargetMask(1 << 6);

    const NAMED: [(&'static str, TargetMask); 7] = [
        ("player", TargetMask::PLAYER),
        ("enemy", TargetMask::ENEMY),
        ("weak_plain_obstacle", TargetMask::WEAK_PLAIN_OBSTACLE),
        ("strong_plain_obstacle", TargetMask::STRONG_PLAIN_OBSTACLE),
        ("pikmin_obstacle", TargetMask::PIKMIN_OBSTACLE),
        ("explodable", TargetMask::EXPLODABLE),
        ("fragile", TargetMask::FRAGILE),
    ];

    /// Parses a whitespace or comma separated list of flag names.
    pub fn from_names(raw: &str) -> Result<Self, String> {
        let mut mask = TargetMask::NONE;
        for word in raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|word| !word.is_empty())
        {
            let Some((_, flag)) = Self::NAMED.iter().find(|(name, _)| *name == word) else {
                return Err(format!("unknown target flag '{word}'"));
            };
            mask.0 |= flag.0;
        }
        Ok(mask)
    }

    pub fn intersects(self, other: TargetMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reach {
    pub name: String,
    pub radius_1: f32,
    pub angle_1: f32,
    pub radius_2: f32,
    pub angle_2: f32,
}

impl Reach {
    pub fn span(&self) -> f32 {
        self.radius_1.max(self.radius_2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitboxKind {
    Normal,
    Attack,
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitboxDef {
    pub body_part: usize,
    pub pos: Vec2,
    pub z: f32,
    pub radius: f32,
    pub height: f32,
    pub kind: HitboxKind,
    /// Damage dealt by attack hitboxes.
    pub value: f32,
    pub hazards: Vec<HazardId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    pub duration: f32,
    pub signal: Option<u32>,
    pub hitboxes: Vec<HitboxDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    pub frames: Vec<AnimationFrame>,
    pub loops: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnInfo {
    pub name: String,
    pub mob_type: MobTypeId,
    pub offset: Vec2,
    pub z: f32,
    pub relative: bool,
    pub angle: f32,
    pub link_object_to_spawn: bool,
    pub link_spawn_to_object: bool,
    pub as_child: bool,
    pub vars: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct MobType {
    pub id: MobTypeId,
    pub name: String,
    pub category: MobCategory,
    pub radius: f32,
    pub rectangle: Option<Vec2>,
    pub height: f32,
    pub max_health: f32,
    pub health_regen: f32,
    pub move_speed: f32,
    pub territory_radius: f32,
    pub team: Team,
    pub target_type: TargetMask,
    pub huntable_targets: TargetMask,
    pub hurtable_targets: TargetMask,
    pub pushable: bool,
    pub pushes: bool,
    pub pushes_softly: bool,
    pub pushes_with_hitboxes: bool,
    pub carry_spots: usize,
    pub group_task_spots: usize,
    pub resistances: Vec<HazardId>,
    pub body_parts: Vec<String>,
    pub reaches: Vec<Reach>,
    pub default_near_reach: Option<usize>,
    pub default_far_reach: Option<usize>,
    pub animations: Vec<Animation>,
    pub spawns: Vec<SpawnInfo>,
    pub script: MobScript,
    pub idle_states: Vec<StateId>,
    pub states_ignoring_death: Vec<StateId>,
    pub states_ignoring_hazard: Vec<StateId>,
    /// Farthest reach of any hitbox in any animation frame.
    pub anim_hitbox_span: f32,
}

impl MobType {
    /// Largest distance from the center any part of the body can reach.
    pub fn physical_span(&self) -> f32 {
        let rect_span = self
            .rectangle
            .map(|dims| (dims * 0.5).length())
            .unwrap_or(0.0);
        self.radius.max(self.anim_hitbox_span).max(rect_span)
    }

    pub fn animation_index(&self, name: &str) -> Option<usize> {
        self.animations.iter().position(|anim| anim.name == name)
    }

    pub fn reach_index(&self, name: &str) -> Option<usize> {
        self.reaches.iter().position(|reach| reach.name == name)
    }

    pub fn is_resistant_to(&self, hazard: HazardId) -> bool {
        self.resistances.contains(&hazard)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HazardType {
    pub id: HazardId,
    pub name: String,
    pub status: Option<StatusId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusType {
    pub id: StatusId,
    pub name: String,
    /// Seconds; zero means it lasts until removed.
    pub duration: f32,
    pub health_per_second: f32,
    pub invisible: bool,
    pub disables_attack: bool,
}

#[derive(Debug, Default, Clone)]
pub struct ContentDatabase {
    mob_types: Vec<MobType>,
    mob_type_ids_by_name: HashMap<String, MobTypeId>,
    hazards: Vec<HazardType>,
    statuses: Vec<StatusType>,
}

impl ContentDatabase {
    pub(crate) fn new(
        mob_types: Vec<MobType>,
        hazards: Vec<HazardType>,
        statuses: Vec<StatusType>,
    ) -> Self {
        let mob_type_ids_by_name = mob_types
            .iter()
            .map(|mob_type| (mob_type.name.clone(), mob_type.id))
            .collect();
        Self {
            mob_types,
            mob_type_ids_by_name,
            hazards,
            statuses,
        }
    }

    pub fn mob_type_id_by_name(&self, name: &str) -> Option<MobTypeId> {
        self.mob_type_ids_by_name.get(name).copied()
    }

    pub fn mob_type(&self, id: MobTypeId) -> Option<&MobType> {
        self.mob_types.get(id.0 as usize)
    }

    pub fn mob_types(&self) -> &[MobType] {
        &self.mob_types
    }

    pub fn hazard(&self, id: HazardId) -> Option<&HazardType> {
        self.hazards.get(id.0 as usize)
    }

    pub fn hazard_id_by_name(&self, name: &str) -> Option<HazardId> {
        self.hazards
            .iter()
            .find(|hazard| hazard.name == name)
            .map(|hazard| hazard.id)
    }

    pub fn status(&self, id: StatusId) -> Option<&StatusType> {
        self.statuses.get(id.0 as usize)
    }

    pub fn status_id_by_name(&self, name: &str) -> Option<StatusId> {
        self.statuses
            .iter()
            .find(|status| status.name == name)
            .map(|status| status.id)
    }
}
