//! Literal conversion for `name: value` parameters.

use crate::Value;

/// Turns a literal from the script into a typed [`Value`].
pub trait ValueConverter: Send + Sync {
    fn try_convert(&self, literal: &str) -> Option<Value>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntConverter;

impl ValueConverter for IntConverter {
    fn try_convert(&self, literal: &str) -> Option<Value> {
        literal.trim().parse::<i64>().ok().map(Value::Int)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatConverter;

impl ValueConverter for FloatConverter {
    fn try_convert(&self, literal: &str) -> Option<Value> {
        literal.trim().parse::<f64>().ok().filter(|v| v.is_finite()).map(Value::Float)
    }
}

/// Pass-through; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl ValueConverter for StringConverter {
    fn try_convert(&self, literal: &str) -> Option<Value> {
        Some(Value::Str(literal.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConverter;

impl ValueConverter for BoolConverter {
    fn try_convert(&self, literal: &str) -> Option<Value> {
        let caps = regex!(r"(?i)^\s*(?:(true|yes|on)|(false|no|off))\s*$").captures(literal)?;
        Some(Value::Bool(caps.get(1).is_some()))
    }
}

/// Declared type of an action property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Int,
    Float,
    Str,
    Bool,
    /// Bound with `->` to a resolved state.
    Transition,
}

impl PropertyKind {
    /// Converter for assignable kinds; `None` for [`PropertyKind::Transition`].
    pub fn converter(self) -> Option<&'static dyn ValueConverter> {
        match self {
            PropertyKind::Int => Some(&IntConverter),
            PropertyKind::Float => Some(&FloatConverter),
            PropertyKind::Str => Some(&StringConverter),
            PropertyKind::Bool => Some(&BoolConverter),
            PropertyKind::Transition => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PropertyKind::Int => "int",
            PropertyKind::Float => "float",
            PropertyKind::Str => "string",
            PropertyKind::Bool => "bool",
            PropertyKind::Transition => "state",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints() {
        assert_eq!(IntConverter.try_convert("42"), Some(Value::Int(42)));
        assert_eq!(IntConverter.try_convert("-7"), Some(Value::Int(-7)));
        assert_eq!(IntConverter.try_convert("4.2"), None);
        assert_eq!(IntConverter.try_convert("four"), None);
    }

    #[test]
    fn floats() {
        assert_eq!(FloatConverter.try_convert("2.5"), Some(Value::Float(2.5)));
        assert_eq!(FloatConverter.try_convert("3"), Some(Value::Float(3.0)));
        assert_eq!(FloatConverter.try_convert("inf"), None);
        assert_eq!(FloatConverter.try_convert("x"), None);
    }

    #[test]
    fn strings_pass_through() {
        assert_eq!(StringConverter.try_convert(" a b "), Some(Value::Str(" a b ".into())));
        assert_eq!(StringConverter.try_convert(""), Some(Value::Str(String::new())));
    }

    #[test]
    fn bools() {
        for yes in ["true", "Yes", "ON"] {
            assert_eq!(BoolConverter.try_convert(yes), Some(Value::Bool(true)), "{yes}");
        }
        for no in ["false", "NO", "off"] {
            assert_eq!(BoolConverter.try_convert(no), Some(Value::Bool(false)), "{no}");
        }
        assert_eq!(BoolConverter.try_convert("1"), None);
        assert_eq!(BoolConverter.try_convert("truthy"), None);
    }

    #[test]
    fn transition_kind_has_no_converter() {
        assert!(PropertyKind::Transition.converter().is_none());
        assert!(PropertyKind::Bool.converter().is_some());
    }
}
