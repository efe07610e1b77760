mod compiler;
mod database;
mod discovery;
mod script_loader;
mod types;

pub use compiler::{compile_content, compile_content_from_str, CompiledContent};
pub use database::{
    Animation, AnimationFrame, ContentDatabase, HazardId, HazardType, HitboxDef, HitboxKind,
    MobCategory, MobType, MobTypeId, Reach, SpawnInfo, StatusId, StatusType, TargetMask, Team,
};
pub use discovery::BASE_MOD_ID;
pub use script_loader::DEFAULT_STATE_NAME;
pub use types::{
    ContentCompileError, ContentDiagnostics, ContentDiscoveryError, ContentErrorCode,
    ContentRequest, SourceLocation,
};
