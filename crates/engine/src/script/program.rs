use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::content::SourceLocation;

use super::event::MobEventKind;
use super::params::{ActionParam, ArgValue, BoundArg};
use super::registry::{ActionDef, ActionKind, ActionRunner};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub usize);

/// One compiled action invocation inside an event handler.
#[derive(Clone)]
pub struct ActionCall {
    pub kind: ActionKind,
    pub name: &'static str,
    pub params: &'static [ActionParam],
    pub runner: ActionRunner,
    pub args: Vec<BoundArg>,
    /// Instruction index this call transfers control to: the matching
    /// `else`/`end_if` for `if`, the matching `end_if` for `else`, and the
    /// label for `goto`.
    pub jump: Option<usize>,
    pub location: Option<SourceLocation>,
}

impl fmt::Debug for ActionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCall")
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("jump", &self.jump)
            .finish()
    }
}

impl ActionCall {
    pub fn new(def: &ActionDef, args: Vec<BoundArg>, location: Option<SourceLocation>) -> Self {
        Self {
            kind: def.kind,
            name: def.name,
            params: def.params,
            runner: def.runner,
            args,
            jump: None,
            location,
        }
    }

    pub fn param_for(&self, index: usize) -> Option<&'static ActionParam> {
        match self.params.get(index) {
            Some(param) => Some(param),
            None => self.params.last().filter(|param| param.is_extras),
        }
    }

    pub(crate) fn const_str(&self, index: usize) -> Option<&str> {
        match self.args.get(index) {
            Some(BoundArg::Const(ArgValue::Str(value))) => Some(value.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventHandler {
    pub kind: MobEventKind,
    pub actions: Vec<ActionCall>,
}

impl EventHandler {
    /// Resolves `if`/`else`/`end_if` nesting and `goto` targets into
    /// instruction indexes.
    pub fn compile(kind: MobEventKind, mut actions: Vec<ActionCall>) -> Result<Self, String> {
        let mut labels = HashMap::<String, usize>::new();
        for (index, call) in actions.iter().enumerate() {
            if call.kind != ActionKind::Label {
                continue;
            }
            let name = call.const_str(0).unwrap_or_default().to_string();
            if labels.insert(name.clone(), index).is_some() {
                return Err(format!("duplicate label '{name}'"));
            }
        }

        let mut open_ifs = Vec::<(usize, Option<usize>)>::new();
        for index in 0..actions.len() {
            match actions[index].kind {
                ActionKind::If => open_ifs.push((index, None)),
                ActionKind::Else => {
                    let Some(open) = open_ifs.last_mut() else {
                        return Err(format!("'else' at action {index} has no matching 'if'"));
                    };
                    if open.1.is_some() {
                        return Err(format!("second 'else' at action {index} for the same 'if'"));
                    }
                    let if_index = open.0;
                    open.1 = Some(index);
                    actions[if_index].jump = Some(index);
                }
                ActionKind::EndIf => {
                    let Some((if_index, else_index)) = open_ifs.pop() else {
                        return Err(format!("'end_if' at action {index} has no matching 'if'"));
                    };
                    match else_index {
                        Some(else_index) => actions[else_index].jump = Some(index),
                        None => actions[if_index].jump = Some(index),
                    }
                }
                ActionKind::Goto => {
                    let name = actions[index].const_str(0).unwrap_or_default();
                    let Some(target) = labels.get(name).copied() else {
                        return Err(format!("'goto' to unknown label '{name}'"));
                    };
                    actions[index].jump = Some(target);
                }
                _ => {}
            }
        }
        if let Some((if_index, _)) = open_ifs.last() {
            return Err(format!("'if' at action {if_index} is never closed with 'end_if'"));
        }

        Ok(Self { kind, actions })
    }
}

#[derive(Debug, Clone)]
pub struct MobState {
    pub id: StateId,
    pub name: String,
    handlers: BTreeMap<MobEventKind, EventHandler>,
}

impl MobState {
    pub fn new(id: StateId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            handlers: BTreeMap::new(),
        }
    }

    pub fn handler(&self, kind: MobEventKind) -> Option<&EventHandler> {
        self.handlers.get(&kind)
    }

    pub fn has_handler(&self, kind: MobEventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn handlers(&self) -> impl Iterator<Item = &EventHandler> {
        self.handlers.values()
    }

    pub(crate) fn handlers_mut(&mut self) -> impl Iterator<Item = &mut EventHandler> {
        self.handlers.values_mut()
    }

    pub fn set_handler(&mut self, handler: EventHandler) {
        self.handlers.insert(handler.kind, handler);
    }
}

#[derive(Debug, Clone, Default)]
pub struct MobScript {
    pub states: Vec<MobState>,
    pub initial_state: StateId,
    pub death_state: Option<StateId>,
}

impl MobScript {
    pub fn state(&self, id: StateId) -> Option<&MobState> {
        self.states.get(id.0)
    }

    pub fn state_id_by_name(&self, name: &str) -> Option<StateId> {
        self.states
            .iter()
            .find(|state| state.name == name)
            .map(|state| state.id)
    }

    pub fn state_name(&self, id: StateId) -> &str {
        self.state(id).map(|state| state.name.as_str()).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
