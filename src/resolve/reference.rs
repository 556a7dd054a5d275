use std::fmt;

use crate::foundation::error::{ScenecropError, ScenecropResult};

/// Separator joining the members of a multi-object reference.
pub const GROUP_SEPARATOR: char = '+';

/// Semantic object reference decoded from an object-index key.
///
/// Keys arrive as strings (`"5"`, `"(5, 2)"`, `"(5, 2, 3)"`, `"5+(7, 1)"`) and are
/// decoded once per scene directory so later stages can match on the shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    /// A whole body.
    Single(i32),
    /// Every link actuated by one joint of a body (e.g. a door).
    Joint(i32, i32),
    /// One explicit link; the joint id only names the articulation instance.
    Link(i32, i32, i32),
    /// Union of two references.
    Pair(Box<ObjectRef>, Box<ObjectRef>),
}

impl ObjectRef {
    /// Decode a string-encoded key.
    ///
    /// Keys joining more than two members fold left into nested pairs.
    pub fn parse(raw: &str) -> ScenecropResult<Self> {
        let s = raw.trim();
        if s.contains(GROUP_SEPARATOR) {
            let mut parts = s.split(GROUP_SEPARATOR);
            let first = parts
                .next()
                .ok_or_else(|| ScenecropError::reference(format!("empty group key '{raw}'")))?;
            let mut acc = Self::parse_member(first, raw)?;
            for part in parts {
                let next = Self::parse_member(part, raw)?;
                acc = Self::Pair(Box::new(acc), Box::new(next));
            }
            return Ok(acc);
        }
        Self::parse_member(s, raw)
    }

    fn parse_member(s: &str, raw: &str) -> ScenecropResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ScenecropError::reference(format!(
                "empty member in key '{raw}'"
            )));
        }

        if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            let fields = inner
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(|f| {
                    f.parse::<i32>().map_err(|_| {
                        ScenecropError::reference(format!("non-integer field '{f}' in key '{raw}'"))
                    })
                })
                .collect::<ScenecropResult<Vec<_>>>()?;
            return match fields.as_slice() {
                [b, j] => Ok(Self::Joint(*b, *j)),
                [b, j, l] => Ok(Self::Link(*b, *j, *l)),
                _ => Err(ScenecropError::reference(format!(
                    "tuple key '{raw}' must have 2 or 3 fields, got {}",
                    fields.len()
                ))),
            };
        }

        s.parse::<i32>()
            .map(Self::Single)
            .map_err(|_| ScenecropError::reference(format!("unrecognized object key '{raw}'")))
    }

    pub fn body(&self) -> Option<i32> {
        match self {
            Self::Single(b) | Self::Joint(b, _) | Self::Link(b, _, _) => Some(*b),
            Self::Pair(..) => None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Pair(..))
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(b) => write!(f, "{b}"),
            Self::Joint(b, j) => write!(f, "({b}, {j})"),
            Self::Link(b, j, l) => write!(f, "({b}, {j}, {l})"),
            Self::Pair(a, c) => write!(f, "{a}{GROUP_SEPARATOR}{c}"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/reference.rs"]
mod tests;
