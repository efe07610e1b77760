use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::sim::{MobId, SimContext};

use super::event::{EventPayload, MobEventKind};
use super::params::{ArgValue, BoundArg, ParamType};
use super::program::{ActionCall, EventHandler, StateId};
use super::registry::ActionKind;
use super::ActionRun;

pub const STATE_HISTORY_SIZE: usize = 3;

/// Upper bound on executed actions per handler run, so a `goto` loop in
/// content cannot stall a frame.
const MAX_ACTIONS_PER_EVENT: usize = 4096;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MobFsm {
    pub cur_state: StateId,
    /// Most recent first.
    pub prev_state_names: [String; STATE_HISTORY_SIZE],
}

impl MobFsm {
    pub fn new(initial: StateId) -> Self {
        Self {
            cur_state: initial,
            prev_state_names: Default::default(),
        }
    }

    fn record_transition(&mut self, outgoing: &str) {
        self.prev_state_names.rotate_right(1);
        self.prev_state_names[0] = outgoing.to_string();
    }
}

/// Runs the handler for `kind` in the mob's current state. Returns whether
/// a handler existed; a missing handler is a no-op.
pub fn run_event(
    sim: &mut SimContext,
    mob: MobId,
    kind: MobEventKind,
    payload: &EventPayload,
) -> bool {
    let Some((type_id, state)) = sim
        .arena
        .get(mob)
        .map(|instance| (instance.type_id, instance.fsm.cur_state))
    else {
        return false;
    };
    let content = Arc::clone(&sim.content);
    let Some(handler) = content
        .mob_type(type_id)
        .and_then(|mob_type| mob_type.script.state(state))
        .and_then(|state| state.handler(kind))
    else {
        return false;
    };
    run_handler(sim, mob, handler, payload);
    true
}

/// Executes one handler's action list against `mob`.
pub fn run_handler(
    sim: &mut SimContext,
    mob: MobId,
    handler: &EventHandler,
    payload: &EventPayload,
) {
    if sim.event_depth >= sim.config.max_event_depth {
        warn!(
            mob = mob.index,
            event = handler.kind.script_name(),
            depth = sim.event_depth,
            "event_depth_limit_reached"
        );
        return;
    }
    trace!(mob = mob.index, event = handler.kind.script_name(), "event_run");
    sim.event_depth += 1;
    sim.report.handlers_run += 1;

    let actions = &handler.actions;
    let mut index = 0;
    let mut executed = 0;
    while index < actions.len() {
        executed += 1;
        if executed > MAX_ACTIONS_PER_EVENT {
            warn!(
                mob = mob.index,
                event = handler.kind.script_name(),
                "script_action_limit_reached"
            );
            break;
        }

        let call = &actions[index];
        let args = resolve_args(sim, mob, call);
        let mut run = ActionRun {
            sim: &mut *sim,
            mob,
            args: &args,
            payload,
            return_value: false,
        };
        (call.runner)(&mut run);
        let condition = run.return_value;

        index = match call.kind {
            ActionKind::If if !condition => call.jump.map_or(actions.len(), |target| target + 1),
            ActionKind::Else | ActionKind::Goto => {
                call.jump.map_or(index + 1, |target| target + 1)
            }
            _ => index + 1,
        };
    }

    sim.event_depth -= 1;
}

/// Switches the mob to `target`, running the old state's `on_leave` and the
/// new state's `on_enter`. Unknown targets are ignored.
pub fn set_state(
    sim: &mut SimContext,
    mob: MobId,
    target: StateId,
    payload: &EventPayload,
) -> bool {
    let Some((type_id, old_state)) = sim
        .arena
        .get(mob)
        .map(|instance| (instance.type_id, instance.fsm.cur_state))
    else {
        return false;
    };
    let content = Arc::clone(&sim.content);
    let Some(script) = content.mob_type(type_id).map(|mob_type| &mob_type.script) else {
        return false;
    };
    if script.state(target).is_none() {
        return false;
    }

    if let Some(instance) = sim.arena.get_mut(mob) {
        instance.fsm.record_transition(script.state_name(old_state));
    }
    run_event(sim, mob, MobEventKind::OnLeave, payload);
    if let Some(instance) = sim.arena.get_mut(mob) {
        instance.fsm.cur_state = target;
    }
    debug!(
        mob = mob.index,
        from = script.state_name(old_state),
        to = script.state_name(target),
        "mob_state_changed"
    );
    run_event(sim, mob, MobEventKind::OnEnter, payload);
    true
}

fn resolve_args(sim: &SimContext, mob: MobId, call: &ActionCall) -> Vec<ArgValue> {
    let vars = sim.arena.get(mob).map(|instance| &instance.vars);
    call.args
        .iter()
        .enumerate()
        .map(|(index, arg)| match arg {
            BoundArg::Const(value) => value.clone(),
            BoundArg::Var(name) => {
                let kind = call.param_for(index).map_or(ParamType::Str, |param| param.kind);
                let raw = vars
                    .and_then(|vars| vars.get(name))
                    .map(String::as_str)
                    .unwrap_or("");
                ArgValue::coerce(raw, kind)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_most_recent_first_and_drops_oldest() {
        let mut fsm = MobFsm::new(StateId(0));
        for name in ["a", "b", "c", "d"] {
            fsm.record_transition(name);
        }
        assert_eq!(fsm.prev_state_names, ["d", "c", "b"].map(String::from));
    }
}
