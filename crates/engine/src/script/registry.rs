use std::fmt;

use super::loaders;
use super::params::{ActionParam, ParamType};
use super::runners;
use super::{ActionLoad, ActionRun};

pub type ActionRunner = fn(&mut ActionRun<'_>);
pub type ActionLoader = fn(&mut ActionLoad<'_>) -> Result<(), String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    If,
    Else,
    EndIf,
    Label,
    Goto,
    SetVar,
    Calculate,
    GetRandomDecimal,
    GetRandomInt,
    GetInfo,
    Print,
    AddHealth,
    SetHealth,
    StartDying,
    FinishDying,
    Delete,
    SetState,
    SetTimer,
    MoveToAbsolute,
    MoveToRelative,
    MoveToTarget,
    Stop,
    TeleportToAbsolute,
    TeleportToRelative,
    TurnToAbsolute,
    TurnToRelative,
    TurnToTarget,
    SetAnimation,
    SetNearReach,
    SetFarReach,
    SetHeight,
    SetTangible,
    SetHuntable,
    SetHurtable,
    SetUnpushable,
    SetTeam,
    Focus,
    Unfocus,
    LinkWithFocus,
    SendMessageToFocus,
    SendMessageToLinks,
    SendMessageToNearby,
    ClaimFocus,
    ReleaseClaim,
    StartChomping,
    StopChomping,
    GetChomped,
    SwallowAll,
    StoreFocusInside,
    ReleaseStoredMobs,
    ReceiveStatus,
    RemoveStatus,
    Spawn,
    BuiltinBeAttacked,
    BuiltinDie,
    BuiltinTouchHazard,
}

#[derive(Clone, Copy)]
pub struct ActionDef {
    pub kind: ActionKind,
    pub name: &'static str,
    pub params: &'static [ActionParam],
    pub runner: ActionRunner,
    pub loader: Option<ActionLoader>,
    /// Injected by the compiler; scripts cannot call these by name.
    pub internal: bool,
}

impl fmt::Debug for ActionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDef")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("has_loader", &self.loader.is_some())
            .field("internal", &self.internal)
            .finish()
    }
}

impl ActionDef {
    /// Number of arguments that must always be present.
    pub fn mandatory_param_count(&self) -> usize {
        match self.params.last() {
            Some(last) if last.is_extras => self.params.len() - 1,
            _ => self.params.len(),
        }
    }

    pub fn takes_extras(&self) -> bool {
        self.params.last().is_some_and(|param| param.is_extras)
    }

    /// Parameter an argument at `index` is bound to.
    pub fn param_for(&self, index: usize) -> Option<&'static ActionParam> {
        match self.params.get(index) {
            Some(param) => Some(param),
            None if self.takes_extras() => self.params.last(),
            None => None,
        }
    }
}

/// Table of every action scripts can use, indexed by [`ActionKind`].
#[derive(Debug, Default)]
pub struct ActionRegistry {
    defs: Vec<Option<ActionDef>>,
}

const fn param(name: &'static str, kind: ParamType) -> ActionParam {
    ActionParam::new(name, kind, false, false)
}

const fn const_param(name: &'static str, kind: ParamType) -> ActionParam {
    ActionParam::new(name, kind, true, false)
}

const fn extras(name: &'static str, kind: ParamType, force_const: bool) -> ActionParam {
    ActionParam::new(name, kind, force_const, true)
}

const NO_PARAMS: &[ActionParam] = &[];
const IF_PARAMS: &[ActionParam] = &[
    param("lhs", ParamType::Str),
    const_param("operator", ParamType::Enum),
    extras("rhs", ParamType::Str, false),
];
const LABEL_PARAMS: &[ActionParam] = &[const_param("label", ParamType::Str)];
const SET_VAR_PARAMS: &[ActionParam] = &[
    const_param("destination", ParamType::Str),
    param("value", ParamType::Str),
];
const CALCULATE_PARAMS: &[ActionParam] = &[
    const_param("destination", ParamType::Str),
    param("lhs", ParamType::Float),
    const_param("operator", ParamType::Enum),
    param("rhs", ParamType::Float),
];
const RANDOM_DECIMAL_PARAMS: &[ActionParam] = &[
    const_param("destination", ParamType::Str),
    param("minimum", ParamType::Float),
    param("maximum", ParamType::Float),
];
const RANDOM_INT_PARAMS: &[ActionParam] = &[
    const_param("destination", ParamType::Str),
    param("minimum", ParamType::Int),
    param("maximum", ParamType::Int),
];
const GET_INFO_PARAMS: &[ActionParam] = &[
    const_param("destination", ParamType::Str),
    const_param("info", ParamType::Enum),
];
const PRINT_PARAMS: &[ActionParam] = &[extras("text", ParamType::Str, false)];
const AMOUNT_PARAMS: &[ActionParam] = &[param("amount", ParamType::Float)];
const STATE_PARAMS: &[ActionParam] = &[const_param("state", ParamType::Enum)];
const TIMER_PARAMS: &[ActionParam] = &[param("time", ParamType::Float)];
const XY_PARAMS: &[ActionParam] = &[param("x", ParamType::Float), param("y", ParamType::Float)];
const TARGET_PARAMS: &[ActionParam] = &[const_param("target", ParamType::Enum)];
const ANGLE_PARAMS: &[ActionParam] = &[param("angle", ParamType::Float)];
const ANIMATION_PARAMS: &[ActionParam] = &[
    const_param("animation", ParamType::Enum),
    extras("options", ParamType::Enum, true),
];
const REACH_PARAMS: &[ActionParam] = &[const_param("reach", ParamType::Enum)];
const HEIGHT_PARAMS: &[ActionParam] = &[param("height", ParamType::Float)];
const BOOL_PARAMS: &[ActionParam] = &[param("value", ParamType::Bool)];
const TEAM_PARAMS: &[ActionParam] = &[const_param("team", ParamType::Enum)];
const MESSAGE_PARAMS: &[ActionParam] = &[param("message", ParamType::Str)];
const NEARBY_MESSAGE_PARAMS: &[ActionParam] = &[
    param("distance", ParamType::Float),
    param("message", ParamType::Str),
];
const CHOMP_PARAMS: &[ActionParam] = &[
    param("victims", ParamType::Int),
    extras("body_parts", ParamType::Enum, true),
];
const STATUS_PARAMS: &[ActionParam] = &[const_param("status", ParamType::Enum)];
const SPAWN_PARAMS: &[ActionParam] = &[const_param("spawn", ParamType::Enum)];

impl ActionRegistry {
    /// Registry with every action the engine ships with.
    pub fn standard() -> Self {
        use ActionKind as K;

        let mut registry = Self::default();
        registry.register(K::If, "if", IF_PARAMS, runners::run_if, Some(loaders::load_if));
        registry.register(K::Else, "else", NO_PARAMS, runners::run_nothing, None);
        registry.register(K::EndIf, "end_if", NO_PARAMS, runners::run_nothing, None);
        registry.register(K::Label, "label", LABEL_PARAMS, runners::run_nothing, None);
        registry.register(K::Goto, "goto", LABEL_PARAMS, runners::run_nothing, None);
        registry.register(K::SetVar, "set_var", SET_VAR_PARAMS, runners::run_set_var, None);
        registry.register(
            K::Calculate,
            "calculate",
            CALCULATE_PARAMS,
            runners::run_calculate,
            Some(loaders::load_calculate),
        );
        registry.register(
            K::GetRandomDecimal,
            "get_random_decimal",
            RANDOM_DECIMAL_PARAMS,
            runners::run_get_random_decimal,
            None,
        );
        registry.register(
            K::GetRandomInt,
            "get_random_int",
            RANDOM_INT_PARAMS,
            runners::run_get_random_int,
            None,
        );
        registry.register(
            K::GetInfo,
            "get_info",
            GET_INFO_PARAMS,
            runners::run_get_info,
            Some(loaders::load_get_info),
        );
        registry.register(K::Print, "print", PRINT_PARAMS, runners::run_print, None);
        registry.register(K::AddHealth, "add_health", AMOUNT_PARAMS, runners::run_add_health, None);
        registry.register(K::SetHealth, "set_health", AMOUNT_PARAMS, runners::run_set_health, None);
        registry.register(K::StartDying, "start_dying", NO_PARAMS, runners::run_start_dying, None);
        registry.register(K::FinishDying, "finish_dying", NO_PARAMS, runners::run_finish_dying, None);
        registry.register(K::Delete, "delete", NO_PARAMS, runners::run_delete, None);
        // Target state names are resolved once every state is known.
        registry.register(K::SetState, "set_state", STATE_PARAMS, runners::run_set_state, None);
        registry.register(K::SetTimer, "set_timer", TIMER_PARAMS, runners::run_set_timer, None);
        registry.register(
            K::MoveToAbsolute,
            "move_to_absolute",
            XY_PARAMS,
            runners::run_move_to_absolute,
            None,
        );
        registry.register(
            K::MoveToRelative,
            "move_to_relative",
            XY_PARAMS,
            runners::run_move_to_relative,
            None,
        );
        registry.register(
            K::MoveToTarget,
            "move_to_target",
            TARGET_PARAMS,
            runners::run_move_to_target,
            Some(loaders::load_move_target),
        );
        registry.register(K::Stop, "stop", NO_PARAMS, runners::run_stop, None);
        registry.register(
            K::TeleportToAbsolute,
            "teleport_to_absolute",
            XY_PARAMS,
            runners::run_teleport_to_absolute,
            None,
        );
        registry.register(
            K::TeleportToRelative,
            "teleport_to_relative",
            XY_PARAMS,
            runners::run_teleport_to_relative,
            None,
        );
        registry.register(
            K::TurnToAbsolute,
            "turn_to_absolute",
            ANGLE_PARAMS,
            runners::run_turn_to_absolute,
            None,
        );
        registry.register(
            K::TurnToRelative,
            "turn_to_relative",
            ANGLE_PARAMS,
            runners::run_turn_to_relative,
            None,
        );
        registry.register(
            K::TurnToTarget,
            "turn_to_target",
            TARGET_PARAMS,
            runners::run_turn_to_target,
            Some(loaders::load_turn_target),
        );
        registry.register(
            K::SetAnimation,
            "set_animation",
            ANIMATION_PARAMS,
            runners::run_set_animation,
            Some(loaders::load_set_animation),
        );
        registry.register(
            K::SetNearReach,
            "set_near_reach",
            REACH_PARAMS,
            runners::run_set_near_reach,
            Some(loaders::load_reach),
        );
        registry.register(
            K::SetFarReach,
            "set_far_reach",
            REACH_PARAMS,
            runners::run_set_far_reach,
            Some(loaders::load_reach),
        );
        registry.register(K::SetHeight, "set_height", HEIGHT_PARAMS, runners::run_set_height, None);
        registry.register(K::SetTangible, "set_tangible", BOOL_PARAMS, runners::run_set_tangible, None);
        registry.register(K::SetHuntable, "set_huntable", BOOL_PARAMS, runners::run_set_huntable, None);
        registry.register(K::SetHurtable, "set_hurtable", BOOL_PARAMS, runners::run_set_hurtable, None);
        registry.register(
            K::SetUnpushable,
            "set_unpushable",
            BOOL_PARAMS,
            runners::run_set_unpushable,
            None,
        );
        registry.register(
            K::SetTeam,
            "set_team",
            TEAM_PARAMS,
            runners::run_set_team,
            Some(loaders::load_team),
        );
        registry.register(
            K::Focus,
            "focus",
            TARGET_PARAMS,
            runners::run_focus,
            Some(loaders::load_focus_target),
        );
        registry.register(K::Unfocus, "unfocus", NO_PARAMS, runners::run_unfocus, None);
        registry.register(
            K::LinkWithFocus,
            "link_with_focus",
            NO_PARAMS,
            runners::run_link_with_focus,
            None,
        );
        registry.register(
            K::SendMessageToFocus,
            "send_message_to_focus",
            MESSAGE_PARAMS,
            runners::run_send_message_to_focus,
            None,
        );
        registry.register(
            K::SendMessageToLinks,
            "send_message_to_links",
            MESSAGE_PARAMS,
            runners::run_send_message_to_links,
            None,
        );
        registry.register(
            K::SendMessageToNearby,
            "send_message_to_nearby",
            NEARBY_MESSAGE_PARAMS,
            runners::run_send_message_to_nearby,
            None,
        );
        registry.register(K::ClaimFocus, "claim_focus", NO_PARAMS, runners::run_claim_focus, None);
        registry.register(K::ReleaseClaim, "release_claim", NO_PARAMS, runners::run_release_claim, None);
        registry.register(
            K::StartChomping,
            "start_chomping",
            CHOMP_PARAMS,
            runners::run_start_chomping,
            Some(loaders::load_start_chomping),
        );
        registry.register(
            K::StopChomping,
            "stop_chomping",
            NO_PARAMS,
            runners::run_stop_chomping,
            None,
        );
        registry.register(K::GetChomped, "get_chomped", NO_PARAMS, runners::run_get_chomped, None);
        registry.register(K::SwallowAll, "swallow_all", NO_PARAMS, runners::run_swallow_all, None);
        registry.register(
            K::StoreFocusInside,
            "store_focus_inside",
            NO_PARAMS,
            runners::run_store_focus_inside,
            None,
        );
        registry.register(
            K::ReleaseStoredMobs,
            "release_stored_mobs",
            NO_PARAMS,
            runners::run_release_stored_mobs,
            None,
        );
        registry.register(
            K::ReceiveStatus,
            "receive_status",
            STATUS_PARAMS,
            runners::run_receive_status,
            Some(loaders::load_status),
        );
        registry.register(
            K::RemoveStatus,
            "remove_status",
            STATUS_PARAMS,
            runners::run_remove_status,
            Some(loaders::load_status),
        );
        registry.register(
            K::Spawn,
            "spawn",
            SPAWN_PARAMS,
            runners::run_spawn,
            Some(loaders::load_spawn),
        );

        registry.register_internal(K::BuiltinBeAttacked, "be_attacked", runners::run_be_attacked);
        registry.register_internal(K::BuiltinDie, "die", runners::run_die);
        registry.register_internal(
            K::BuiltinTouchHazard,
            "touch_hazard",
            runners::run_touch_hazard,
        );
        registry
    }

    pub fn register(
        &mut self,
        kind: ActionKind,
        name: &'static str,
        params: &'static [ActionParam],
        runner: ActionRunner,
        loader: Option<ActionLoader>,
    ) {
        self.insert(ActionDef {
            kind,
            name,
            params,
            runner,
            loader,
            internal: false,
        });
    }

    fn register_internal(&mut self, kind: ActionKind, name: &'static str, runner: ActionRunner) {
        self.insert(ActionDef {
            kind,
            name,
            params: NO_PARAMS,
            runner,
            loader: None,
            internal: true,
        });
    }

    fn insert(&mut self, def: ActionDef) {
        let index = def.kind as usize;
        if self.defs.len() <= index {
            self.defs.resize(index + 1, None);
        }
        self.defs[index] = Some(def);
    }

    pub fn get(&self, kind: ActionKind) -> Option<&ActionDef> {
        self.defs.get(kind as usize).and_then(Option::as_ref)
    }

    /// Looks up an action by the name scripts use for it.
    pub fn find(&self, name: &str) -> Option<&ActionDef> {
        self.defs
            .iter()
            .flatten()
            .find(|def| !def.internal && def.name == name)
    }

    pub fn len(&self) -> usize {
        self.defs.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_indexes_by_kind() {
        let registry = ActionRegistry::standard();
        let set_state = registry.get(ActionKind::SetState).expect("set_state");
        assert_eq!(set_state.name, "set_state");
        assert_eq!(set_state.mandatory_param_count(), 1);
        assert_eq!(
            registry.find("set_state").map(|def| def.kind),
            Some(ActionKind::SetState)
        );
    }

    #[test]
    fn extras_param_binds_trailing_arguments() {
        let registry = ActionRegistry::standard();
        let def = registry.find("set_animation").expect("set_animation");
        assert!(def.takes_extras());
        assert_eq!(def.mandatory_param_count(), 1);
        assert_eq!(def.param_for(3).map(|param| param.name), Some("options"));

        let add_health = registry.find("add_health").expect("add_health");
        assert!(add_health.param_for(1).is_none());
    }

    #[test]
    fn internal_actions_are_not_callable_by_name() {
        let registry = ActionRegistry::standard();
        assert!(registry.find("be_attacked").is_none());
        assert!(registry.get(ActionKind::BuiltinBeAttacked).is_some());
    }
}
