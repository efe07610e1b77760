mod area;
mod arena;
mod config;
mod context;
mod interaction;
mod mob;
mod push;
mod snapshot;
mod stats;
mod step;

pub use area::{AreaGeometry, FlatArea, HazardZone};
pub use arena::MobArena;
pub use config::{SimConfig, SimConfigError};
pub use context::{SimContext, SimError};
pub use interaction::{
    in_reach, interaction_span, sort_pending, HandlerRef, PendingIntermobEvent,
};
pub use mob::{
    can_hunt, can_hurt, AnimationState, CarryInfo, CategoryData, ChaseTarget, ChompState, Holder,
    Mob, MobFlags, MobId, StatusInstance,
};
pub use push::{resolve_push, Push, PushBody, PushHitbox};
pub use snapshot::MobSnapshot;
pub use stats::Statistics;
pub use step::FrameReport;

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
