use std::collections::HashMap;

use crate::content::{Animation, HazardId, Reach, SpawnInfo, StatusId};
use crate::sim::{MobId, SimContext};

mod event;
mod fsm;
mod loaders;
mod params;
mod program;
mod registry;
mod runners;

pub use event::{EventPayload, HitboxContact, MobEventKind};
pub use fsm::{run_event, run_handler, set_state, MobFsm, STATE_HISTORY_SIZE};
pub use loaders::{
    AnimationOption, CalcOperator, CompareOperator, FocusTarget, InfoKind, MoveTarget, TurnTarget,
};
pub use params::{format_number, parse_number, ActionParam, ArgValue, BoundArg, ParamType};
pub use program::{ActionCall, EventHandler, MobScript, MobState, StateId};
pub use registry::{ActionDef, ActionKind, ActionLoader, ActionRegistry, ActionRunner};

/// Names a script may refer to while being compiled for one mob type.
#[derive(Debug, Clone, Copy)]
pub struct ScriptLoadTarget<'a> {
    pub mob_type_name: &'a str,
    pub animations: &'a [Animation],
    pub reaches: &'a [Reach],
    pub spawns: &'a [SpawnInfo],
    pub body_parts: &'a [String],
    pub hazards: &'a HashMap<String, HazardId>,
    pub statuses: &'a HashMap<String, StatusId>,
}

/// Load-time view of one action's arguments, handed to its loader.
pub struct ActionLoad<'a> {
    pub args: &'a mut Vec<BoundArg>,
    pub target: &'a ScriptLoadTarget<'a>,
}

/// Everything an action runner may touch while it executes.
pub struct ActionRun<'a> {
    pub sim: &'a mut SimContext,
    pub mob: MobId,
    pub args: &'a [ArgValue],
    pub payload: &'a EventPayload,
    /// Set by condition actions; `if` jumps when it stays false.
    pub return_value: bool,
}

impl ActionRun<'_> {
    pub fn arg(&self, index: usize) -> Option<&ArgValue> {
        self.args.get(index)
    }

    pub fn f32_arg(&self, index: usize) -> f32 {
        self.args.get(index).map(ArgValue::as_f32).unwrap_or(0.0)
    }

    pub fn i64_arg(&self, index: usize) -> i64 {
        self.args.get(index).map(ArgValue::as_i64).unwrap_or(0)
    }

    pub fn bool_arg(&self, index: usize) -> bool {
        self.args.get(index).is_some_and(ArgValue::as_bool)
    }

    pub fn enum_arg(&self, index: usize) -> i32 {
        self.args.get(index).map(ArgValue::as_enum).unwrap_or(-1)
    }

    pub fn text_arg(&self, index: usize) -> String {
        self.args
            .get(index)
            .map(ArgValue::to_text)
            .unwrap_or_default()
    }
}
