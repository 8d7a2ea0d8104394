//! ACL actions as a typed enum.
//!
//! Token permissions grant actions, not HTTP methods. Four methods map to an
//! action; every other method (`HEAD`, `PATCH`, `OPTIONS`, ...) has no action
//! and is never authorized by an ACL.

use std::fmt;
use std::str::FromStr;

use http::Method;

/// An action that can be granted on a path.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Maps a request method to the action it performs.
    ///
    /// ```rust
    /// use http::Method;
    /// use portico::Action;
    ///
    /// assert_eq!(Action::from_method(&Method::POST), Some(Action::Create));
    /// assert_eq!(Action::from_method(&Method::PATCH), None);
    /// ```
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET    => Some(Self::Read),
            Method::POST   => Some(Self::Create),
            Method::PUT    => Some(Self::Update),
            Method::DELETE => Some(Self::Delete),
            _              => None,
        }
    }

    /// Returns the name used in token permissions (e.g. `"read"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read   => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Parses a lowercase action name. Case-sensitive, like the permission sets.
impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read"   => Ok(Self::Read),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _        => Err(()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Method::GET, Some(Action::Read))]
    #[case(Method::POST, Some(Action::Create))]
    #[case(Method::PUT, Some(Action::Update))]
    #[case(Method::DELETE, Some(Action::Delete))]
    #[case(Method::HEAD, None)]
    #[case(Method::PATCH, None)]
    #[case(Method::OPTIONS, None)]
    fn method_mapping(#[case] method: Method, #[case] expected: Option<Action>) {
        assert_eq!(Action::from_method(&method), expected);
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for action in [Action::Read, Action::Create, Action::Update, Action::Delete] {
            assert_eq!(action.as_str().parse::<Action>(), Ok(action));
        }
        assert_eq!("READ".parse::<Action>(), Err(()));
    }
}
