//! Security checker interface and the implementations shipped with this crate.

use crate::error::Result;

/// Asks whether the caller holds the required permissions to access an
/// endpoint or field. A `"*"` entry in `required` is never produced by this
/// crate; wildcard matching happens on the *policy* side (see
/// [`SecurityPolicy::is_wildcard`](super::SecurityPolicy::is_wildcard)).
pub trait SecurityChecker: Send + Sync {
    fn allow(&self, required: &[String]) -> Result<bool>;
}

/// Allows everything. The default when no checker is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveChecker;

impl SecurityChecker for PermissiveChecker {
    fn allow(&self, _required: &[String]) -> Result<bool> {
        Ok(true)
    }
}

/// Allows a fixed, pre-computed set of grants.
#[derive(Debug, Clone)]
pub struct StaticChecker {
    grants: std::collections::HashSet<String>,
}

impl StaticChecker {
    pub fn new(grants: impl IntoIterator<Item = String>) -> Self {
        Self {
            grants: grants.into_iter().collect(),
        }
    }
}

impl SecurityChecker for StaticChecker {
    fn allow(&self, required: &[String]) -> Result<bool> {
        Ok(required
            .iter()
            .all(|perm| perm == "*" || self.grants.contains(perm)))
    }
}

/// Delegates to a caller-supplied closure, typically evaluated against a
/// caller's roles.
pub struct RoleChecker {
    check: Box<dyn Fn(&[String]) -> Result<bool> + Send + Sync>,
}

impl RoleChecker {
    pub fn new(check: impl Fn(&[String]) -> Result<bool> + Send + Sync + 'static) -> Self {
        Self {
            check: Box::new(check),
        }
    }
}

impl SecurityChecker for RoleChecker {
    fn allow(&self, required: &[String]) -> Result<bool> {
        (self.check)(required)
    }
}

impl std::fmt::Debug for RoleChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleChecker").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_checker_allows_everything() {
        let checker = PermissiveChecker;
        assert!(checker.allow(&["admin".to_string()]).unwrap());
    }

    #[test]
    fn static_checker_allows_only_granted_permissions() {
        let checker = StaticChecker::new(["read".to_string()]);
        assert!(checker.allow(&["read".to_string()]).unwrap());
        assert!(!checker.allow(&["write".to_string()]).unwrap());
    }

    #[test]
    fn static_checker_wildcard_permission_always_allows() {
        let checker = StaticChecker::new(Vec::<String>::new());
        assert!(checker.allow(&["*".to_string()]).unwrap());
    }

    #[test]
    fn role_checker_delegates_to_closure() {
        let checker = RoleChecker::new(|required| Ok(required.contains(&"manager".to_string())));
        assert!(checker.allow(&["manager".to_string()]).unwrap());
        assert!(!checker.allow(&["intern".to_string()]).unwrap());
    }
}
