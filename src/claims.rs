//! Typed token claims.
//!
//! A validated token carries its grants under `user.acl.permissions`:
//!
//! ```json
//! {
//!   "user": {
//!     "id": 7,
//!     "acl": {
//!       "permissions": {
//!         "inventory": { "/items": ["read", "create"], "/items/42": ["read"] },
//!         "billing":   { "/invoices": ["read"] }
//!       }
//!     }
//!   },
//!   "exp": 1767225600
//! }
//! ```
//!
//! The grouping keys (`inventory`, `billing`) carry no meaning for
//! authorization; only the path → actions sets inside them do. Claims are
//! decoded once per request and dropped with it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::Action;

/// Group key → path → granted action names.
pub type Permissions = HashMap<String, HashMap<String, Vec<String>>>;

/// Decoded payload of a validated token.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Claims {
    pub user: User,
    /// Every other claim (`exp`, `sub`, `iss`, ...), kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct User {
    pub acl: Acl,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Acl {
    pub permissions: Permissions,
}

impl Claims {
    /// Claims granting `permissions` and nothing else.
    pub fn with_permissions(permissions: Permissions) -> Self {
        Self { user: User { acl: Acl { permissions }, ..User::default() }, ..Self::default() }
    }

    /// `true` iff some permission group grants `action` on exactly `path`.
    ///
    /// No prefix or wildcard matching: `/items` does not cover `/items/42`.
    pub fn permits(&self, path: &str, action: Action) -> bool {
        self.user.acl.permissions.values().any(|apis| {
            apis.get(path)
                .is_some_and(|actions| actions.iter().any(|a| a == action.as_str()))
        })
    }

    /// Looks up a top-level claim other than `user`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}
