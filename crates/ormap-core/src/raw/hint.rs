//! Tri-state hints and join direction.

use serde::{Deserialize, Serialize};

/// A user hint that may be absent, given, or explicitly refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hint<T> {
    /// Nothing said; defaults apply.
    Unspecified,
    /// Given by the user.
    Explicit(T),
    /// The user asked for none.
    Forbidden,
}

impl<T> Default for Hint<T> {
    fn default() -> Self {
        Hint::Unspecified
    }
}

impl<T> Hint<T> {
    /// The explicit value, if any.
    pub fn explicit(&self) -> Option<&T> {
        match self {
            Hint::Explicit(value) => Some(value),
            _ => None,
        }
    }

    /// Whether a value was given.
    pub fn is_explicit(&self) -> bool {
        matches!(self, Hint::Explicit(_))
    }

    /// Whether the user refused one.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Hint::Forbidden)
    }

    /// Whether nothing was said.
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Hint::Unspecified)
    }
}

impl<T: Clone> Hint<T> {
    /// Take the other hint when this one says nothing.
    pub fn fill_from(&mut self, other: &Hint<T>) {
        if self.is_unspecified() {
            *self = other.clone();
        }
    }
}

impl<T> From<Option<T>> for Hint<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Hint::Explicit(value),
            None => Hint::Unspecified,
        }
    }
}

/// Which side of a join holds the foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinDirection {
    /// No join.
    #[default]
    None,
    /// The key lives in the local table.
    Forward,
    /// The key lives in the related table.
    Inverse,
}
