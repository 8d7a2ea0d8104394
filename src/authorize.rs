//! Authorization decisions against token claims.

use http::Method;

use crate::action::Action;
use crate::claims::Claims;

/// Decides whether the holder of `claims` may perform `method` on `path`.
///
/// Implementations must be pure: the verdict depends only on the arguments.
pub trait Authorize: Send + Sync + 'static {
    fn authorize(&self, claims: &Claims, method: &Method, path: &str) -> bool;
}

/// The default decider: maps the method to an [`Action`] and asks whether any
/// permission group grants it on exactly `path`.
///
/// Methods without an action (`PATCH`, `HEAD`, ...) are always denied.
#[derive(Clone, Copy, Debug, Default)]
pub struct AclAuthorizer;

impl Authorize for AclAuthorizer {
    fn authorize(&self, claims: &Claims, method: &Method, path: &str) -> bool {
        Action::from_method(method).is_some_and(|action| claims.permits(path, action))
    }
}

impl<F> Authorize for F
where
    F: Fn(&Claims, &Method, &str) -> bool + Send + Sync + 'static,
{
    fn authorize(&self, claims: &Claims, method: &Method, path: &str) -> bool {
        self(claims, method, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn claims() -> Claims {
        serde_json::from_value(json!({"user": {"acl": {"permissions": {
            "inventory": {"/items": ["read", "create"], "/items/42": ["read", "update", "delete"]},
        }}}}))
        .unwrap()
    }

    #[rstest]
    #[case(Method::GET, "/items", true)]
    #[case(Method::POST, "/items", true)]
    #[case(Method::PUT, "/items", false)]
    #[case(Method::DELETE, "/items/42", true)]
    #[case(Method::PUT, "/items/42", true)]
    #[case(Method::POST, "/items/42", false)]
    #[case(Method::GET, "/items/43", false)]
    #[case(Method::PATCH, "/items/42", false)]
    #[case(Method::HEAD, "/items", false)]
    fn acl_decisions(#[case] method: Method, #[case] path: &str, #[case] allowed: bool) {
        assert_eq!(AclAuthorizer.authorize(&claims(), &method, path), allowed);
    }

    #[test]
    fn closures_are_deciders() {
        let only_gets = |_: &Claims, method: &Method, _: &str| method == Method::GET;
        assert!(only_gets.authorize(&Claims::default(), &Method::GET, "/anything"));
        assert!(!only_gets.authorize(&Claims::default(), &Method::POST, "/anything"));
    }
}
