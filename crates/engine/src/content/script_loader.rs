use std::collections::HashMap;
use std::path::Path;

use crate::script::{
    ActionCall, ActionKind, ActionLoad, ActionParam, ActionRegistry, ArgValue, BoundArg,
    EventHandler, MobEventKind, MobScript, MobState, ScriptLoadTarget, StateId,
};

use super::types::{ContentCompileError, ContentDiagnostics, ContentErrorCode, SourceLocation};

/// Name of the state given to mob types whose script defines none.
pub const DEFAULT_STATE_NAME: &str = "idle";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawAction {
    pub text: String,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawHandler {
    pub event: String,
    pub actions: Vec<RawAction>,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawState {
    pub name: String,
    pub handlers: Vec<RawHandler>,
    pub location: Option<SourceLocation>,
}

/// A `<script>` block as written, before names are resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RawScript {
    pub initial_state: Option<String>,
    pub death_state: Option<String>,
    pub states: Vec<RawState>,
    pub global: Vec<RawHandler>,
    pub location: Option<SourceLocation>,
}

/// Where the script being compiled came from, for diagnostics.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScriptOrigin<'a> {
    pub mod_id: &'a str,
    pub file_path: &'a Path,
}

struct ScriptCompiler<'a> {
    registry: &'a ActionRegistry,
    target: &'a ScriptLoadTarget<'a>,
    origin: ScriptOrigin<'a>,
    state_ids: HashMap<String, StateId>,
    diagnostics: &'a mut ContentDiagnostics,
}

impl ScriptCompiler<'_> {
    fn report(&mut self, code: ContentErrorCode, message: String, location: Option<SourceLocation>) {
        self.diagnostics.push(ContentCompileError {
            code,
            message: format!("{} (mob type '{}')", message, self.target.mob_type_name),
            mod_id: self.origin.mod_id.to_string(),
            file_path: self.origin.file_path.to_path_buf(),
            location,
        });
    }

    fn compile_handler(&mut self, raw: &RawHandler) -> Option<EventHandler> {
        let Some(kind) = MobEventKind::from_script_name(&raw.event) else {
            self.report(
                ContentErrorCode::UnknownEvent,
                format!("unknown event '{}'", raw.event),
                raw.location,
            );
            return None;
        };

        let mut calls = Vec::with_capacity(raw.actions.len());
        for action in &raw.actions {
            match self.compile_action(&action.text, action.location) {
                Ok(call) => calls.push(call),
                Err((code, message)) => self.report(code, message, action.location),
            }
        }

        match EventHandler::compile(kind, calls) {
            Ok(handler) => Some(handler),
            Err(message) => {
                self.report(
                    ContentErrorCode::InvalidControlFlow,
                    format!("dropping '{}' handler: {}", raw.event, message),
                    raw.location,
                );
                None
            }
        }
    }

    fn compile_action(
        &self,
        text: &str,
        location: Option<SourceLocation>,
    ) -> Result<ActionCall, (ContentErrorCode, String)> {
        let mut words = text.split_whitespace();
        let Some(name) = words.next() else {
            return Err((ContentErrorCode::UnknownAction, "empty action".to_string()));
        };
        let Some(def) = self.registry.find(name) else {
            return Err((
                ContentErrorCode::UnknownAction,
                format!("unknown action '{name}'"),
            ));
        };

        let raw_args = words.collect::<Vec<_>>();
        let mandatory = def.mandatory_param_count();
        if raw_args.len() < mandatory || (!def.takes_extras() && raw_args.len() > def.params.len()) {
            let expected = if def.takes_extras() {
                format!("at least {mandatory}")
            } else {
                mandatory.to_string()
            };
            return Err((
                ContentErrorCode::ArgumentCount,
                format!(
                    "action '{name}' takes {expected} argument(s), got {}",
                    raw_args.len()
                ),
            ));
        }

        let mut args = Vec::with_capacity(raw_args.len());
        for (index, raw) in raw_args.iter().enumerate() {
            let Some(param) = def.param_for(index) else {
                return Err((
                    ContentErrorCode::ArgumentCount,
                    format!("action '{name}' has no parameter {index}"),
                ));
            };
            args.push(bind_arg(name, raw, param)?);
        }

        if def.kind == ActionKind::SetState {
            let target = match args.first() {
                Some(BoundArg::Const(ArgValue::Str(state))) => state.clone(),
                _ => String::new(),
            };
            let Some(id) = self.state_ids.get(&target) else {
                return Err((
                    ContentErrorCode::UnknownState,
                    format!("set_state to unknown state '{target}'"),
                ));
            };
            args[0] = BoundArg::Const(ArgValue::Enum(id.0 as i32));
        }

        if let Some(loader) = def.loader {
            loader(&mut ActionLoad {
                args: &mut args,
                target: self.target,
            })
            .map_err(|message| {
                (
                    ContentErrorCode::InvalidArgument,
                    format!("action '{name}': {message}"),
                )
            })?;
        }

        Ok(ActionCall::new(def, args, location))
    }
}

fn bind_arg(
    action: &str,
    raw: &str,
    param: &ActionParam,
) -> Result<BoundArg, (ContentErrorCode, String)> {
    let literal = if let Some(rest) = raw.strip_prefix("$$") {
        format!("${rest}")
    } else if let Some(var) = raw.strip_prefix('$') {
        if var.is_empty() {
            return Err((
                ContentErrorCode::InvalidArgument,
                format!("action '{action}': empty variable name"),
            ));
        }
        if param.force_const {
            return Err((
                ContentErrorCode::VariableNotAllowed,
                format!(
                    "action '{action}': parameter '{}' cannot take a variable",
                    param.name
                ),
            ));
        }
        return Ok(BoundArg::Var(var.to_string()));
    } else {
        raw.to_string()
    };

    ArgValue::parse(&literal, param.kind)
        .map(BoundArg::Const)
        .map_err(|message| {
            (
                ContentErrorCode::InvalidArgument,
                format!("action '{action}', parameter '{}': {message}", param.name),
            )
        })
}

fn builtin_handler(
    registry: &ActionRegistry,
    event: MobEventKind,
    action: ActionKind,
) -> Option<EventHandler> {
    let def = registry.get(action)?;
    Some(EventHandler {
        kind: event,
        actions: vec![ActionCall::new(def, Vec::new(), None)],
    })
}

/// Compiles a mob type's script. Anything that cannot be compiled is
/// reported and left out; the result always has at least one state.
pub(crate) fn compile_script(
    raw: &RawScript,
    target: &ScriptLoadTarget<'_>,
    registry: &ActionRegistry,
    origin: ScriptOrigin<'_>,
    takes_damage: bool,
    diagnostics: &mut ContentDiagnostics,
) -> MobScript {
    let mut compiler = ScriptCompiler {
        registry,
        target,
        origin,
        state_ids: HashMap::new(),
        diagnostics,
    };

    let mut kept = Vec::<&RawState>::new();
    for state in &raw.states {
        if state.name.is_empty() {
            compiler.report(
                ContentErrorCode::MissingField,
                "state without a name".to_string(),
                state.location,
            );
            continue;
        }
        if compiler.state_ids.contains_key(&state.name) {
            compiler.report(
                ContentErrorCode::DuplicateState,
                format!("duplicate state '{}'", state.name),
                state.location,
            );
            continue;
        }
        compiler
            .state_ids
            .insert(state.name.clone(), StateId(kept.len()));
        kept.push(state);
    }

    let mut states = kept
        .iter()
        .enumerate()
        .map(|(index, state)| MobState::new(StateId(index), state.name.clone()))
        .collect::<Vec<_>>();
    if states.is_empty() {
        compiler
            .state_ids
            .insert(DEFAULT_STATE_NAME.to_string(), StateId(0));
        states.push(MobState::new(StateId(0), DEFAULT_STATE_NAME));
    }

    for (state, raw_state) in states.iter_mut().zip(kept.iter()) {
        for raw_handler in &raw_state.handlers {
            let Some(handler) = compiler.compile_handler(raw_handler) else {
                continue;
            };
            if state.has_handler(handler.kind) {
                compiler.report(
                    ContentErrorCode::DuplicateEvent,
                    format!(
                        "state '{}' handles '{}' more than once",
                        state.name, raw_handler.event
                    ),
                    raw_handler.location,
                );
                continue;
            }
            state.set_handler(handler);
        }
    }

    let global = raw
        .global
        .iter()
        .filter_map(|raw_handler| compiler.compile_handler(raw_handler))
        .collect::<Vec<_>>();
    for state in &mut states {
        for handler in &global {
            if !state.has_handler(handler.kind) {
                state.set_handler(handler.clone());
            }
        }
    }

    let initial_state = match &raw.initial_state {
        Some(name) => compiler.state_ids.get(name).copied().unwrap_or_else(|| {
            compiler.report(
                ContentErrorCode::UnknownState,
                format!("initial state '{name}' does not exist"),
                raw.location,
            );
            StateId(0)
        }),
        None => StateId(0),
    };
    let death_state = match &raw.death_state {
        Some(name) => {
            let found = compiler.state_ids.get(name).copied();
            if found.is_none() {
                compiler.report(
                    ContentErrorCode::UnknownState,
                    format!("death state '{name}' does not exist"),
                    raw.location,
                );
            }
            found
        }
        None => None,
    };

    let builtins = [
        (
            takes_damage,
            MobEventKind::HitboxTouchNA,
            ActionKind::BuiltinBeAttacked,
        ),
        (
            death_state.is_some(),
            MobEventKind::Death,
            ActionKind::BuiltinDie,
        ),
        (true, MobEventKind::TouchedHazard, ActionKind::BuiltinTouchHazard),
    ];
    for state in &mut states {
        for (wanted, event, action) in builtins {
            if !wanted || state.has_handler(event) {
                continue;
            }
            if let Some(handler) = builtin_handler(registry, event, action) {
                state.set_handler(handler);
            }
        }
    }

    MobScript {
        states,
        initial_state,
        death_state,
    }
}
