//! The closed catalogue of intrinsic functions.

use serde_json::Value;

/// Shape of the argument an intrinsic function takes in long form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentShape {
    /// A single scalar or nested function.
    Single,
    /// An ordered list with an exact number of elements.
    List(usize),
    /// An ordered list with a bounded number of elements.
    Variadic { min: usize, max: usize },
    /// Either a single string, or a `[string, {name: value}]` pair.
    SingleOrPair,
}

/// Intrinsic functions understood by the normalizer and the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicFunction {
    Ref,
    GetAtt,
    GetAZs,
    ImportValue,
    FindInMap,
    Join,
    Select,
    Split,
    Sub,
    And,
    Equals,
    If,
    Not,
    Or,
    Base64,
    Cidr,
    Condition,
}

impl IntrinsicFunction {
    pub fn all() -> &'static [IntrinsicFunction] {
        use IntrinsicFunction::*;
        &[
            Ref, GetAtt, GetAZs, ImportValue, FindInMap, Join, Select, Split, Sub, And, Equals,
            If, Not, Or, Base64, Cidr, Condition,
        ]
    }

    /// Shorthand tag name, without the leading `!`.
    pub fn tag(&self) -> &'static str {
        match self {
            IntrinsicFunction::Ref => "Ref",
            IntrinsicFunction::GetAtt => "GetAtt",
            IntrinsicFunction::GetAZs => "GetAZs",
            IntrinsicFunction::ImportValue => "ImportValue",
            IntrinsicFunction::FindInMap => "FindInMap",
            IntrinsicFunction::Join => "Join",
            IntrinsicFunction::Select => "Select",
            IntrinsicFunction::Split => "Split",
            IntrinsicFunction::Sub => "Sub",
            IntrinsicFunction::And => "And",
            IntrinsicFunction::Equals => "Equals",
            IntrinsicFunction::If => "If",
            IntrinsicFunction::Not => "Not",
            IntrinsicFunction::Or => "Or",
            IntrinsicFunction::Base64 => "Base64",
            IntrinsicFunction::Cidr => "Cidr",
            IntrinsicFunction::Condition => "Condition",
        }
    }

    /// Fully qualified key used in the canonical form.
    pub fn long_name(&self) -> &'static str {
        match self {
            IntrinsicFunction::Ref => "Ref",
            IntrinsicFunction::Condition => "Condition",
            IntrinsicFunction::GetAtt => "Fn::GetAtt",
            IntrinsicFunction::GetAZs => "Fn::GetAZs",
            IntrinsicFunction::ImportValue => "Fn::ImportValue",
            IntrinsicFunction::FindInMap => "Fn::FindInMap",
            IntrinsicFunction::Join => "Fn::Join",
            IntrinsicFunction::Select => "Fn::Select",
            IntrinsicFunction::Split => "Fn::Split",
            IntrinsicFunction::Sub => "Fn::Sub",
            IntrinsicFunction::And => "Fn::And",
            IntrinsicFunction::Equals => "Fn::Equals",
            IntrinsicFunction::If => "Fn::If",
            IntrinsicFunction::Not => "Fn::Not",
            IntrinsicFunction::Or => "Fn::Or",
            IntrinsicFunction::Base64 => "Fn::Base64",
            IntrinsicFunction::Cidr => "Fn::Cidr",
        }
    }

    pub fn shape(&self) -> ArgumentShape {
        use IntrinsicFunction::*;
        match self {
            Ref | GetAZs | ImportValue | Base64 | Condition => ArgumentShape::Single,
            GetAtt | Join | Select | Split | Equals => ArgumentShape::List(2),
            FindInMap | If | Cidr => ArgumentShape::List(3),
            Not => ArgumentShape::List(1),
            And | Or => ArgumentShape::Variadic { min: 2, max: 10 },
            Sub => ArgumentShape::SingleOrPair,
        }
    }

    /// Look up a function by its shorthand tag name (`GetAtt`, not `!GetAtt`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.tag() == tag)
    }

    /// Look up a function by its canonical key (`Fn::GetAtt`, `Ref`).
    pub fn from_long_name(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.long_name() == key)
    }

    /// Recognize a decoded value that is a single intrinsic function call.
    ///
    /// Only single-key objects count; `Condition` is excluded because it is
    /// also an ordinary resource attribute name.
    pub fn detect(value: &Value) -> Option<(Self, &Value)> {
        let map = value.as_object()?;
        if map.len() != 1 {
            return None;
        }
        let (key, args) = map.iter().next()?;
        match Self::from_long_name(key) {
            Some(IntrinsicFunction::Condition) | None => None,
            Some(function) => Some((function, args)),
        }
    }

    /// Check that decoded arguments match the canonical shape.
    pub fn check_arguments(&self, args: &Value) -> Result<(), String> {
        match (self.shape(), args) {
            (ArgumentShape::Single, Value::Array(_)) if *self != IntrinsicFunction::GetAZs => Err(
                format!("{} expects a single value, not a list", self.long_name()),
            ),
            (ArgumentShape::Single, _) => Ok(()),
            (ArgumentShape::List(n), Value::Array(items)) if items.len() == n => Ok(()),
            // `Fn::GetAtt: Resource.Attribute`
            (_, Value::String(s)) if *self == IntrinsicFunction::GetAtt && s.contains('.') => Ok(()),
            (ArgumentShape::List(n), Value::Array(items)) => Err(format!(
                "{} expects {} arguments, got {}",
                self.long_name(),
                n,
                items.len()
            )),
            (ArgumentShape::List(_), _) => {
                Err(format!("{} expects a list of arguments", self.long_name()))
            }
            (ArgumentShape::Variadic { min, max }, Value::Array(items))
                if (min..=max).contains(&items.len()) =>
            {
                Ok(())
            }
            (ArgumentShape::Variadic { min, max }, _) => Err(format!(
                "{} expects between {} and {} conditions",
                self.long_name(),
                min,
                max
            )),
            (ArgumentShape::SingleOrPair, Value::Array(items)) if items.len() == 2 => Ok(()),
            (ArgumentShape::SingleOrPair, Value::Array(items)) => Err(format!(
                "{} expects a string or a [string, variables] pair, got {} elements",
                self.long_name(),
                items.len()
            )),
            (ArgumentShape::SingleOrPair, _) => Ok(()),
        }
    }
}

impl std::fmt::Display for IntrinsicFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.long_name())
    }
}
