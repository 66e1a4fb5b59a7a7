//! Push key scope authorization.
//!
//! A scope is either a bare repository name or a `namespace/repo` /
//! `namespace/` pattern. `r` is the default namespace. A key carrying scopes
//! may only act on targets one of its scopes unblocks.

use shared_types::Namespace;

/// Name of the default namespace.
pub const DEFAULT_NAMESPACE: &str = "r";

/// Whether `scopes` forbid acting on `repo_name` addressed through
/// `namespace` (empty when not namespaced).
///
/// `ns` is the resolved namespace record, used to map a namespaced domain to
/// the real repository it targets.
pub fn is_blocked_by_scope(
    scopes: &[String],
    repo_name: &str,
    namespace: &str,
    ns: Option<&Namespace>,
) -> bool {
    !scopes
        .iter()
        .any(|scope| scope_unblocks(scope, repo_name, namespace, ns))
}

fn scope_unblocks(scope: &str, repo_name: &str, namespace: &str, ns: Option<&Namespace>) -> bool {
    if let Some((scope_ns, scope_repo)) = scope.split_once('/') {
        // r/ or r/<repo>
        if scope_ns == DEFAULT_NAMESPACE
            && namespace.is_empty()
            && (scope_repo.is_empty() || scope_repo == repo_name)
        {
            return true;
        }

        // <ns>/<repo> or <ns>/
        if scope_ns != DEFAULT_NAMESPACE
            && scope_ns == namespace
            && (scope_repo.is_empty() || scope_repo == repo_name)
        {
            return true;
        }
    }

    if namespace.is_empty() {
        return scope == repo_name;
    }

    // Bare scope naming the repository the namespaced domain points at
    ns.and_then(|ns| ns.domains.get(repo_name))
        .and_then(|target| target.get(2..))
        .is_some_and(|target| !target.is_empty() && target == scope)
}
