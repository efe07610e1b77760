#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Float,
    Int,
    Bool,
    Str,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionParam {
    pub name: &'static str,
    pub kind: ParamType,
    /// Rejects `$variable` arguments.
    pub force_const: bool,
    /// Collects every remaining argument. Only valid as the last parameter.
    pub is_extras: bool,
}

impl ActionParam {
    pub const fn new(name: &'static str, kind: ParamType, force_const: bool, is_extras: bool) -> Self {
        Self {
            name,
            kind,
            force_const,
            is_extras,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Float(f32),
    Int(i64),
    Bool(bool),
    Str(String),
    Enum(i32),
}

impl ArgValue {
    /// Converts raw text into the given parameter type.
    pub fn parse(raw: &str, kind: ParamType) -> Result<Self, String> {
        match kind {
            ParamType::Float => raw
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .map(ArgValue::Float)
                .ok_or_else(|| format!("'{raw}' is not a valid number")),
            ParamType::Int => raw
                .parse::<i64>()
                .map(ArgValue::Int)
                .map_err(|_| format!("'{raw}' is not a valid integer")),
            ParamType::Bool => parse_bool(raw)
                .map(ArgValue::Bool)
                .ok_or_else(|| format!("'{raw}' is not a valid boolean")),
            ParamType::Str | ParamType::Enum => Ok(ArgValue::Str(raw.to_string())),
        }
    }

    /// Lenient conversion used for variable contents at run time. Anything
    /// unparsable becomes the type's zero value.
    pub fn coerce(raw: &str, kind: ParamType) -> Self {
        match kind {
            ParamType::Float => ArgValue::Float(parse_number(raw)),
            ParamType::Int => ArgValue::Int(raw.trim().parse::<i64>().unwrap_or_else(|_| {
                let value = parse_number(raw);
                value as i64
            })),
            ParamType::Bool => ArgValue::Bool(parse_bool(raw).unwrap_or(false)),
            ParamType::Str => ArgValue::Str(raw.to_string()),
            ParamType::Enum => ArgValue::Enum(raw.trim().parse::<i32>().unwrap_or(0)),
        }
    }

    pub fn as_f32(&self) -> f32 {
        match self {
            ArgValue::Float(value) => *value,
            ArgValue::Int(value) => *value as f32,
            ArgValue::Bool(value) => f32::from(u8::from(*value)),
            ArgValue::Str(value) => parse_number(value),
            ArgValue::Enum(value) => *value as f32,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            ArgValue::Float(value) => *value as i64,
            ArgValue::Int(value) => *value,
            ArgValue::Bool(value) => i64::from(*value),
            ArgValue::Str(value) => value.trim().parse::<i64>().unwrap_or(0),
            ArgValue::Enum(value) => i64::from(*value),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            ArgValue::Bool(value) => *value,
            ArgValue::Float(value) => *value != 0.0,
            ArgValue::Int(value) => *value != 0,
            ArgValue::Str(value) => parse_bool(value).unwrap_or(false),
            ArgValue::Enum(value) => *value != 0,
        }
    }

    pub fn as_enum(&self) -> i32 {
        match self {
            ArgValue::Enum(value) => *value,
            other => other.as_i64() as i32,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            ArgValue::Float(value) => format_number(*value),
            ArgValue::Int(value) => value.to_string(),
            ArgValue::Bool(value) => value.to_string(),
            ArgValue::Str(value) => value.clone(),
            ArgValue::Enum(value) => value.to_string(),
        }
    }
}

/// One argument as written in the script: a literal, or a variable read at
/// run time.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundArg {
    Const(ArgValue),
    Var(String),
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Number from script text; empty or garbage text reads as zero.
pub fn parse_number(raw: &str) -> f32 {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Formats without a trailing `.0` for whole numbers, so that `5` stays
/// `5` after a round trip through a script variable.
pub fn format_number(value: f32) -> String {
    if value.fract() == 0.0 && value.abs() < 1.0e9 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_parse_rejects_garbage_per_type() {
        assert_eq!(
            ArgValue::parse("2.5", ParamType::Float).expect("float"),
            ArgValue::Float(2.5)
        );
        assert!(ArgValue::parse("abc", ParamType::Float).is_err());
        assert!(ArgValue::parse("1.5", ParamType::Int).is_err());
        assert!(ArgValue::parse("maybe", ParamType::Bool).is_err());
        assert_eq!(
            ArgValue::parse("walk", ParamType::Enum).expect("enum"),
            ArgValue::Str("walk".to_string())
        );
    }

    #[test]
    fn coerce_falls_back_to_zero_values() {
        assert_eq!(ArgValue::coerce("", ParamType::Float), ArgValue::Float(0.0));
        assert_eq!(ArgValue::coerce("x", ParamType::Int), ArgValue::Int(0));
        assert_eq!(ArgValue::coerce("3.9", ParamType::Int), ArgValue::Int(3));
        assert_eq!(ArgValue::coerce("", ParamType::Bool), ArgValue::Bool(false));
    }

    #[test]
    fn whole_numbers_format_without_fraction() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(0.5), "0.5");
    }
}
