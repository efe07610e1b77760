use serde::Serialize;

/// Counters bumped as a side effect of specific events, read by whatever
/// shows results at the end of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub mobs_spawned: u64,
    pub mobs_deleted: u64,
    pub pikmin_born: u64,
    pub pikmin_deaths: u64,
    pub enemy_deaths: u64,
    pub hits_landed: u64,
    pub messages_sent: u64,
}
