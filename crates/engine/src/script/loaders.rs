use crate::content::Team;

use super::params::{ArgValue, BoundArg};
use super::ActionLoad;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

impl CompareOperator {
    const ALL: [CompareOperator; 6] = [
        CompareOperator::Equal,
        CompareOperator::NotEqual,
        CompareOperator::Less,
        CompareOperator::Greater,
        CompareOperator::LessOrEqual,
        CompareOperator::GreaterOrEqual,
    ];

    /// Accepts symbols and word aliases, since `<` is awkward inside XML.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" | "==" | "eq" => Some(CompareOperator::Equal),
            "!=" | "ne" => Some(CompareOperator::NotEqual),
            "<" | "lt" => Some(CompareOperator::Less),
            ">" | "gt" => Some(CompareOperator::Greater),
            "<=" | "le" => Some(CompareOperator::LessOrEqual),
            ">=" | "ge" => Some(CompareOperator::GreaterOrEqual),
            _ => None,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcOperator {
    Sum,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl CalcOperator {
    const ALL: [CalcOperator; 5] = [
        CalcOperator::Sum,
        CalcOperator::Subtract,
        CalcOperator::Multiply,
        CalcOperator::Divide,
        CalcOperator::Modulo,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "+" | "sum" => Some(CalcOperator::Sum),
            "-" | "subtract" => Some(CalcOperator::Subtract),
            "*" | "multiply" => Some(CalcOperator::Multiply),
            "/" | "divide" => Some(CalcOperator::Divide),
            "%" | "modulo" => Some(CalcOperator::Modulo),
            _ => None,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// Division or modulo by zero yields zero.
    pub fn apply(self, lhs: f32, rhs: f32) -> f32 {
        match self {
            CalcOperator::Sum => lhs + rhs,
            CalcOperator::Subtract => lhs - rhs,
            CalcOperator::Multiply => lhs * rhs,
            CalcOperator::Divide if rhs == 0.0 => 0.0,
            CalcOperator::Divide => lhs / rhs,
            CalcOperator::Modulo if rhs == 0.0 => 0.0,
            CalcOperator::Modulo => lhs % rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKind {
    Health,
    MaxHealth,
    X,
    Y,
    Z,
    Angle,
    State,
    MobType,
    MobCategory,
    Team,
    Message,
    MessageSender,
    FrameSignal,
    OtherBodyPart,
    Hazard,
    ChompedCount,
    TimeAlive,
    FocusDistance,
}

impl InfoKind {
    const ALL: [InfoKind; 18] = [
        InfoKind::Health,
        InfoKind::MaxHealth,
        InfoKind::X,
        InfoKind::Y,
        InfoKind::Z,
        InfoKind::Angle,
        InfoKind::State,
        InfoKind::MobType,
        InfoKind::MobCategory,
        InfoKind::Team,
        InfoKind::Message,
        InfoKind::MessageSender,
        InfoKind::FrameSignal,
        InfoKind::OtherBodyPart,
        InfoKind::Hazard,
        InfoKind::ChompedCount,
        InfoKind::TimeAlive,
        InfoKind::FocusDistance,
    ];

    pub fn token(self) -> &'static str {
        match self {
            InfoKind::Health => "health",
            InfoKind::MaxHealth => "max_health",
            InfoKind::X => "x",
            InfoKind::Y => "y",
            InfoKind::Z => "z",
            InfoKind::Angle => "angle",
            InfoKind::State => "state",
            InfoKind::MobType => "mob_type",
            InfoKind::MobCategory => "mob_category",
            InfoKind::Team => "team",
            InfoKind::Message => "message",
            InfoKind::MessageSender => "message_sender",
            InfoKind::FrameSignal => "frame_signal",
            InfoKind::OtherBodyPart => "other_body_part",
            InfoKind::Hazard => "hazard",
            InfoKind::ChompedCount => "chomped_count",
            InfoKind::TimeAlive => "time_alive",
            InfoKind::FocusDistance => "focus_distance",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.token() == token)
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTarget {
    Focus,
    FocusPosition,
    AwayFromFocus,
    Home,
    LinkAverage,
}

impl MoveTarget {
    const ALL: [MoveTarget; 5] = [
        MoveTarget::Focus,
        MoveTarget::FocusPosition,
        MoveTarget::AwayFromFocus,
        MoveTarget::Home,
        MoveTarget::LinkAverage,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "focus" => Some(MoveTarget::Focus),
            "focus_position" => Some(MoveTarget::FocusPosition),
            "away_from_focus" => Some(MoveTarget::AwayFromFocus),
            "home" => Some(MoveTarget::Home),
            "link_average" => Some(MoveTarget::LinkAverage),
            _ => None,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnTarget {
    Focus,
    Home,
}

impl TurnTarget {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "focus" => Some(TurnTarget::Focus),
            "home" => Some(TurnTarget::Home),
            _ => None,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(TurnTarget::Focus),
            1 => Some(TurnTarget::Home),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Trigger,
    Link,
    Parent,
}

impl FocusTarget {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "trigger" => Some(FocusTarget::Trigger),
            "link" => Some(FocusTarget::Link),
            "parent" => Some(FocusTarget::Parent),
            _ => None,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(FocusTarget::Trigger),
            1 => Some(FocusTarget::Link),
            2 => Some(FocusTarget::Parent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOption {
    NoRestart,
}

impl AnimationOption {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "no_restart" => Some(AnimationOption::NoRestart),
            _ => None,
        }
    }

    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(AnimationOption::NoRestart),
            _ => None,
        }
    }
}

/// Replaces the literal at `index` with the enum value `resolve` maps it to.
fn resolve_enum(
    args: &mut [BoundArg],
    index: usize,
    what: &str,
    resolve: impl FnOnce(&str) -> Option<i32>,
) -> Result<(), String> {
    let value = match args.get(index) {
        Some(BoundArg::Const(ArgValue::Str(raw))) => {
            resolve(raw).ok_or_else(|| format!("unknown {what} '{raw}'"))?
        }
        Some(_) => return Err(format!("{what} must be written literally")),
        None => return Err(format!("missing {what}")),
    };
    args[index] = BoundArg::Const(ArgValue::Enum(value));
    Ok(())
}

pub(crate) fn load_if(load: &mut ActionLoad<'_>) -> Result<(), String> {
    resolve_enum(load.args, 1, "comparison operator", |raw| {
        CompareOperator::from_token(raw).map(|op| op as i32)
    })
}

pub(crate) fn load_calculate(load: &mut ActionLoad<'_>) -> Result<(), String> {
    resolve_enum(load.args, 2, "operator", |raw| {
        CalcOperator::from_token(raw).map(|op| op as i32)
    })
}

pub(crate) fn load_get_info(load: &mut ActionLoad<'_>) -> Result<(), String> {
    resolve_enum(load.args, 1, "info type", |raw| {
        InfoKind::from_token(raw).map(|kind| kind as i32)
    })
}

pub(crate) fn load_move_target(load: &mut ActionLoad<'_>) -> Result<(), String> {
    resolve_enum(load.args, 0, "move target", |raw| {
        MoveTarget::from_token(raw).map(|target| target as i32)
    })
}

pub(crate) fn load_turn_target(load: &mut ActionLoad<'_>) -> Result<(), String> {
    resolve_enum(load.args, 0, "turn target", |raw| {
        TurnTarget::from_token(raw).map(|target| target as i32)
    })
}

pub(crate) fn load_focus_target(load: &mut ActionLoad<'_>) -> Result<(), String> {
    resolve_enum(load.args, 0, "focus target", |raw| {
        FocusTarget::from_token(raw).map(|target| target as i32)
    })
}

pub(crate) fn load_set_animation(load: &mut ActionLoad<'_>) -> Result<(), String> {
    let animations = load.target.animations;
    resolve_enum(load.args, 0, "animation", |raw| {
        animations
            .iter()
            .position(|anim| anim.name == raw)
            .map(|index| index as i32)
    })?;
    for index in 1..load.args.len() {
        resolve_enum(load.args, index, "animation option", |raw| {
            AnimationOption::from_token(raw).map(|option| option as i32)
        })?;
    }
    Ok(())
}

/// `none` clears the reach.
pub(crate) fn load_reach(load: &mut ActionLoad<'_>) -> Result<(), String> {
    let reaches = load.target.reaches;
    resolve_enum(load.args, 0, "reach", |raw| {
        if raw == "none" {
            return Some(-1);
        }
        reaches
            .iter()
            .position(|reach| reach.name == raw)
            .map(|index| index as i32)
    })
}

pub(crate) fn load_team(load: &mut ActionLoad<'_>) -> Result<(), String> {
    resolve_enum(load.args, 0, "team", |raw| {
        Team::ALL
            .iter()
            .position(|team| team.name() == raw)
            .map(|index| index as i32)
    })
}

pub(crate) fn load_start_chomping(load: &mut ActionLoad<'_>) -> Result<(), String> {
    let body_parts = load.target.body_parts;
    for index in 1..load.args.len() {
        resolve_enum(load.args, index, "body part", |raw| {
            body_parts
                .iter()
                .position(|part| part == raw)
                .map(|index| index as i32)
        })?;
    }
    Ok(())
}

pub(crate) fn load_status(load: &mut ActionLoad<'_>) -> Result<(), String> {
    let statuses = load.target.statuses;
    resolve_enum(load.args, 0, "status", |raw| {
        statuses.get(raw).map(|id| id.0 as i32)
    })
}

pub(crate) fn load_spawn(load: &mut ActionLoad<'_>) -> Result<(), String> {
    let spawns = load.target.spawns;
    resolve_enum(load.args, 0, "spawn", |raw| {
        spawns
            .iter()
            .position(|spawn| spawn.name == raw)
            .map(|index| index as i32)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::content::Reach;
    use crate::script::ScriptLoadTarget;

    fn literal(raw: &str) -> BoundArg {
        BoundArg::Const(ArgValue::Str(raw.to_string()))
    }

    #[test]
    fn if_operator_accepts_symbols_and_aliases() {
        let hazards = HashMap::new();
        let statuses = HashMap::new();
        let target = ScriptLoadTarget {
            mob_type_name: "test",
            animations: &[],
            reaches: &[],
            spawns: &[],
            body_parts: &[],
            hazards: &hazards,
            statuses: &statuses,
        };
        let mut args = vec![literal("$hp"), literal("le"), literal("3")];
        load_if(&mut ActionLoad {
            args: &mut args,
            target: &target,
        })
        .expect("loads");
        assert_eq!(
            args[1],
            BoundArg::Const(ArgValue::Enum(CompareOperator::LessOrEqual as i32))
        );

        let mut bad = vec![literal("a"), literal("~"), literal("b")];
        let err = load_if(&mut ActionLoad {
            args: &mut bad,
            target: &target,
        })
        .expect_err("unknown operator");
        assert!(err.contains("comparison operator"));
    }

    #[test]
    fn reach_names_resolve_and_none_clears() {
        let hazards = HashMap::new();
        let statuses = HashMap::new();
        let reaches = vec![Reach {
            name: "bite".to_string(),
            radius_1: 10.0,
            angle_1: 1.0,
            radius_2: 5.0,
            angle_2: 3.0,
        }];
        let target = ScriptLoadTarget {
            mob_type_name: "test",
            animations: &[],
            reaches: &reaches,
            spawns: &[],
            body_parts: &[],
            hazards: &hazards,
            statuses: &statuses,
        };
        let mut args = vec![literal("bite")];
        load_reach(&mut ActionLoad {
            args: &mut args,
            target: &target,
        })
        .expect("bite");
        assert_eq!(args[0], BoundArg::Const(ArgValue::Enum(0)));

        let mut args = vec![literal("none")];
        load_reach(&mut ActionLoad {
            args: &mut args,
            target: &target,
        })
        .expect("none");
        assert_eq!(args[0], BoundArg::Const(ArgValue::Enum(-1)));
    }

    #[test]
    fn calculate_divide_by_zero_is_zero() {
        assert_eq!(CalcOperator::Divide.apply(4.0, 0.0), 0.0);
        assert_eq!(CalcOperator::Modulo.apply(4.0, 0.0), 0.0);
        assert_eq!(CalcOperator::Modulo.apply(7.0, 4.0), 3.0);
    }
}
