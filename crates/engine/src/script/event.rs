use crate::content::HazardId;
use crate::sim::MobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MobEventKind {
    OnEnter,
    OnLeave,
    OnTick,
    OnReady,
    AnimationEnd,
    FrameSignal,
    Damage,
    Death,
    FarFromHome,
    FocusDied,
    FocusOffReach,
    Held,
    Released,
    Landed,
    ReachedDestination,
    ReceiveMessage,
    Timer,
    TouchedObject,
    TouchedOpponent,
    TouchedActiveLeader,
    ObjectInReach,
    OpponentInReach,
    NearCarriableObject,
    NearTool,
    NearGroupTask,
    HitboxTouchAN,
    HitboxTouchNA,
    HitboxTouchNN,
    HitboxTouchEat,
    TouchedHazard,
    LeftHazard,
}

impl MobEventKind {
    pub const ALL: [MobEventKind; 31] = [
        MobEventKind::OnEnter,
        MobEventKind::OnLeave,
        MobEventKind::OnTick,
        MobEventKind::OnReady,
        MobEventKind::AnimationEnd,
        MobEventKind::FrameSignal,
        MobEventKind::Damage,
        MobEventKind::Death,
        MobEventKind::FarFromHome,
        MobEventKind::FocusDied,
        MobEventKind::FocusOffReach,
        MobEventKind::Held,
        MobEventKind::Released,
        MobEventKind::Landed,
        MobEventKind::ReachedDestination,
        MobEventKind::ReceiveMessage,
        MobEventKind::Timer,
        MobEventKind::TouchedObject,
        MobEventKind::TouchedOpponent,
        MobEventKind::TouchedActiveLeader,
        MobEventKind::ObjectInReach,
        MobEventKind::OpponentInReach,
        MobEventKind::NearCarriableObject,
        MobEventKind::NearTool,
        MobEventKind::NearGroupTask,
        MobEventKind::HitboxTouchAN,
        MobEventKind::HitboxTouchNA,
        MobEventKind::HitboxTouchNN,
        MobEventKind::HitboxTouchEat,
        MobEventKind::TouchedHazard,
        MobEventKind::LeftHazard,
    ];

    /// Keyword used for this event in script files.
    pub fn script_name(self) -> &'static str {
        match self {
            MobEventKind::OnEnter => "on_enter",
            MobEventKind::OnLeave => "on_leave",
            MobEventKind::OnTick => "on_tick",
            MobEventKind::OnReady => "on_ready",
            MobEventKind::AnimationEnd => "on_animation_end",
            MobEventKind::FrameSignal => "on_frame_signal",
            MobEventKind::Damage => "on_damage",
            MobEventKind::Death => "on_death",
            MobEventKind::FarFromHome => "on_far_from_home",
            MobEventKind::FocusDied => "on_focus_died",
            MobEventKind::FocusOffReach => "on_focus_off_reach",
            MobEventKind::Held => "on_held",
            MobEventKind::Released => "on_released",
            MobEventKind::Landed => "on_land",
            MobEventKind::ReachedDestination => "on_reach_destination",
            MobEventKind::ReceiveMessage => "on_receive_message",
            MobEventKind::Timer => "on_timer",
            MobEventKind::TouchedObject => "on_touch_object",
            MobEventKind::TouchedOpponent => "on_touch_opponent",
            MobEventKind::TouchedActiveLeader => "on_touch_active_leader",
            MobEventKind::ObjectInReach => "on_object_in_reach",
            MobEventKind::OpponentInReach => "on_opponent_in_reach",
            MobEventKind::NearCarriableObject => "on_near_carriable_object",
            MobEventKind::NearTool => "on_near_tool",
            MobEventKind::NearGroupTask => "on_near_group_task",
            MobEventKind::HitboxTouchAN => "on_hitbox_touch_a_n",
            MobEventKind::HitboxTouchNA => "on_hitbox_touch_n_a",
            MobEventKind::HitboxTouchNN => "on_hitbox_touch_n_n",
            MobEventKind::HitboxTouchEat => "on_hitbox_touch_eat",
            MobEventKind::TouchedHazard => "on_touch_hazard",
            MobEventKind::LeftHazard => "on_leave_hazard",
        }
    }

    pub fn from_script_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.script_name() == name)
    }
}

/// Hitbox pair that produced a hitbox event, seen from the receiving mob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitboxContact {
    pub other: MobId,
    pub own_hitbox: usize,
    pub other_hitbox: usize,
    pub other_body_part: usize,
    pub other_value: f32,
}

/// Extra data delivered alongside an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EventPayload {
    #[default]
    None,
    Mob(MobId),
    Hitbox(HitboxContact),
    Message {
        text: String,
        sender: MobId,
    },
    Hazard {
        hazard: HazardId,
        contact: Option<HitboxContact>,
    },
    FrameSignal(u32),
}

impl EventPayload {
    /// The other mob involved in the event, if there is one.
    pub fn other_mob(&self) -> Option<MobId> {
        match self {
            EventPayload::Mob(id) => Some(*id),
            EventPayload::Hitbox(contact) => Some(contact.other),
            EventPayload::Message { sender, .. } => Some(*sender),
            EventPayload::Hazard {
                contact: Some(contact),
                ..
            } => Some(contact.other),
            EventPayload::Hazard { contact: None, .. }
            | EventPayload::FrameSignal(_)
            | EventPayload::None => None,
        }
    }

    pub fn hitbox_contact(&self) -> Option<&HitboxContact> {
        match self {
            EventPayload::Hitbox(contact) => Some(contact),
            EventPayload::Hazard {
                contact: Some(contact),
                ..
            } => Some(contact),
            _ => None,
        }
    }
}
