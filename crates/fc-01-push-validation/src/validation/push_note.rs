//! Push note sanity and consistency.

use crate::config::ValidationConfig;
use crate::domain::errors::{field_err, field_err_at, ValidationError, ValidationResult};
use crate::domain::names::is_valid_name;
use crate::domain::reference::is_merge_request_reference;
use crate::domain::scope::is_blocked_by_scope;
use crate::ports::outbound::{LocalRepo, Logic};
use crate::validation::pushed_reference::{
    check_pushed_reference_consistency, check_pushed_reference_sanity,
};
use crate::validation::tx_detail::tx_details_from_note;
use shared_crypto::{hash_namespace, verify_ed25519, Ed25519PublicKey};
use shared_types::{Amount, Namespace, PushKey, PushNote};
use tracing::debug;

/// State-independent checks. `now` is the local unix time in seconds.
pub fn check_push_note_sanity(
    config: &ValidationConfig,
    note: &PushNote,
    now: u64,
) -> ValidationResult<()> {
    if note.repo_name.is_empty() {
        return field_err("repo", "repo name is required");
    }
    if !is_valid_name(&note.repo_name) {
        return field_err("repo", "repo name is not valid");
    }

    if let Some(ns) = note.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        if !is_valid_name(ns) {
            return field_err("namespace", "namespace is not valid");
        }
    }

    for (i, pushed) in note.references.iter().enumerate() {
        check_pushed_reference_sanity(config, pushed, Some(i))?;
    }

    if note.pusher_key_id.is_empty() {
        return field_err("pusherKeyId", "push key id is required");
    }
    if note.pusher_key().is_none() {
        return field_err("pusherKeyId", "push key id is not valid");
    }

    if note.timestamp == 0 {
        return field_err("timestamp", "timestamp is required");
    }
    if note.timestamp > now.saturating_add(config.max_future_drift_secs) {
        return field_err("timestamp", "timestamp cannot be a future time");
    }

    if note.pusher_account_nonce == 0 {
        return field_err("accountNonce", "account nonce must be greater than zero");
    }

    if note.node_pub_key.is_empty() {
        return field_err("nodePubKey", "push node public key is required");
    }
    let Ok(node_key) = Ed25519PublicKey::from_slice(&note.node_pub_key) else {
        return field_err("nodePubKey", "push node public key is not valid");
    };

    if note.node_sig.is_empty() {
        return field_err("nodeSig", "push node signature is required");
    }
    if verify_ed25519(node_key.as_bytes(), &note.bytes_no_sig(), &note.node_sig).is_err() {
        return field_err("nodeSig", "failed to verify signature");
    }

    Ok(())
}

/// Sum of reference fees and of merge-request values.
pub fn note_totals(note: &PushNote) -> ValidationResult<(Amount, Amount)> {
    let mut fee = Amount::zero();
    let mut value = Amount::zero();
    for (i, pushed) in note.references.iter().enumerate() {
        let ref_fee = pushed.fee.parse::<Amount>().unwrap_or_default();
        fee = match fee.checked_add(ref_fee) {
            Some(total) => total,
            None => return field_err_at(Some(i), "references.fee", "total fee is out of range"),
        };

        if !is_merge_request_reference(&pushed.name) {
            continue;
        }
        let ref_value = pushed
            .value
            .as_deref()
            .and_then(|v| v.parse::<Amount>().ok())
            .unwrap_or_default();
        value = match value.checked_add(ref_value) {
            Some(total) => total,
            None => return field_err_at(Some(i), "value", "total value is out of range"),
        };
    }
    Ok((fee, value))
}

/// Checks against ledger state and, when given, the local working copy.
pub fn check_push_note_consistency(
    note: &PushNote,
    local: Option<&dyn LocalRepo>,
    logic: &dyn Logic,
) -> ValidationResult<()> {
    let repo = logic
        .repo_keeper()
        .get(&note.repo_name)
        .map_err(|e| ValidationError::ledger("failed to get repository", e))?;
    let Some(repo) = repo else {
        return field_err(
            "repo",
            format!("repository named '{}' is unknown", note.repo_name),
        );
    };

    let namespace = note.namespace.as_deref().unwrap_or_default();
    let mut ns_record = None;
    if !namespace.is_empty() {
        let ns = logic
            .namespace_keeper()
            .get(&hash_namespace(namespace))
            .map_err(|e| ValidationError::ledger("failed to get namespace", e))?;
        let Some(ns) = ns else {
            return field_err("namespace", format!("namespace '{}' is unknown", namespace));
        };
        if !ns.targets_repo(&note.repo_name) {
            return field_err(
                "repo",
                format!("repo not a target in namespace '{}'", namespace),
            );
        }
        ns_record = Some(ns);
    }

    let Some(key_id) = note.pusher_key() else {
        return field_err("pusherKeyId", "push key id is not valid");
    };
    let push_key = logic
        .push_key_keeper()
        .get(&key_id)
        .map_err(|e| ValidationError::ledger("failed to get push key", e))?;
    let Some(push_key) = push_key else {
        return field_err(
            "pusherKeyId",
            format!("pusher's public key id '{}' is unknown", key_id),
        );
    };
    if push_key.address != note.pusher_address {
        return field_err("pusherAddr", "push key does not belong to pusher");
    }
    if is_note_blocked_by_scope(&push_key, note, namespace, ns_record.as_ref()) {
        return field_err("scopes", "push key not permitted due to scope limitation");
    }

    let account = logic
        .account_keeper()
        .get(&note.pusher_address)
        .map_err(|e| ValidationError::ledger("failed to get pusher account", e))?;
    let Some(account) = account else {
        return field_err("pusherAddr", "pusher account not found");
    };
    let Some(next_nonce) = account.nonce.checked_add(1) else {
        return field_err("accountNonce", "pusher account nonce is out of range");
    };
    if note.pusher_account_nonce != next_nonce {
        return field_err(
            "accountNonce",
            format!(
                "wrong account nonce '{}', expecting '{}'",
                note.pusher_account_nonce, next_nonce
            ),
        );
    }

    let details = tx_details_from_note(note, &[]);
    for (i, (pushed, detail)) in note.references.iter().zip(&details).enumerate() {
        check_pushed_reference_consistency(local, pushed, &repo, Some(i))?;

        if verify_ed25519(&push_key.pub_key, &detail.bytes_no_sig(), &pushed.push_sig).is_err() {
            return field_err_at(
                Some(i),
                "references",
                format!("reference ({}) signature is invalid", pushed.name),
            );
        }
    }

    let (fee, value) = note_totals(note)?;
    let block = logic
        .sys_keeper()
        .last_block_info()
        .map_err(|e| ValidationError::ledger("failed to get last block info", e))?;
    logic
        .dry_send(
            &note.pusher_address,
            value,
            fee,
            note.pusher_account_nonce,
            block.height,
        )
        .map_err(ValidationError::Balance)?;

    debug!(repo = %note.repo_name, references = note.references.len(), "push note consistent");
    Ok(())
}

/// Whether the pusher's key scopes forbid pushing to the note's repository.
///
/// A namespaced note names the real repository, so the key passes if any
/// domain of the namespace that targets it is unblocked.
fn is_note_blocked_by_scope(
    push_key: &PushKey,
    note: &PushNote,
    namespace: &str,
    ns: Option<&Namespace>,
) -> bool {
    if push_key.scopes.is_empty() {
        return false;
    }
    let Some(ns) = ns else {
        return is_blocked_by_scope(&push_key.scopes, &note.repo_name, "", None);
    };
    let target = format!("r/{}", note.repo_name);
    !ns.domains
        .iter()
        .filter(|(_, t)| **t == target)
        .any(|(domain, _)| !is_blocked_by_scope(&push_key.scopes, domain, namespace, Some(ns)))
}

/// Sanity then consistency.
pub fn check_push_note(
    config: &ValidationConfig,
    note: &PushNote,
    local: Option<&dyn LocalRepo>,
    logic: &dyn Logic,
    now: u64,
) -> ValidationResult<()> {
    check_push_note_sanity(config, note, now)?;
    check_push_note_consistency(note, local, logic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{hash_of, Fixture};
    use shared_types::{Account, Namespace, PushKey, PushedReference, Reference};

    fn field_of(err: ValidationError) -> (String, String) {
        let f = err.as_field().cloned().expect("field error");
        (f.field, f.msg)
    }

    #[test]
    fn test_signed_note_passes() {
        let fx = Fixture::new();
        let note = fx.master_push_note();
        check_push_note(&fx.config, &note, Some(&fx.repo), fx.logic.as_ref(), fx.now).unwrap();
    }

    #[test]
    fn test_sanity_repo_and_namespace() {
        let fx = Fixture::new();
        let mut note = fx.master_push_note();
        note.repo_name.clear();
        assert_eq!(
            field_of(check_push_note_sanity(&fx.config, &note, fx.now).unwrap_err()),
            ("repo".into(), "repo name is required".into())
        );
        note.repo_name = "bad name".into();
        assert_eq!(
            field_of(check_push_note_sanity(&fx.config, &note, fx.now).unwrap_err()).1,
            "repo name is not valid"
        );

        let mut note = fx.master_push_note();
        note.namespace = Some("x!".into());
        assert_eq!(
            field_of(check_push_note_sanity(&fx.config, &note, fx.now).unwrap_err()).1,
            "namespace is not valid"
        );
    }

    #[test]
    fn test_sanity_key_timestamp_and_nonce() {
        let fx = Fixture::new();

        let mut note = fx.master_push_note();
        note.pusher_key_id = vec![1u8; 19];
        assert_eq!(
            field_of(check_push_note_sanity(&fx.config, &note, fx.now).unwrap_err()).1,
            "push key id is not valid"
        );

        let mut note = fx.master_push_note();
        note.timestamp = fx.now + 1;
        assert_eq!(
            field_of(check_push_note_sanity(&fx.config, &note, fx.now).unwrap_err()).1,
            "timestamp cannot be a future time"
        );

        let mut note = fx.master_push_note();
        note.pusher_account_nonce = 0;
        assert_eq!(
            field_of(check_push_note_sanity(&fx.config, &note, fx.now).unwrap_err()).1,
            "account nonce must be greater than zero"
        );
    }

    #[test]
    fn test_sanity_node_signature() {
        let fx = Fixture::new();

        let mut note = fx.master_push_note();
        note.node_pub_key = vec![1u8; 5];
        assert_eq!(
            field_of(check_push_note_sanity(&fx.config, &note, fx.now).unwrap_err()).1,
            "push node public key is not valid"
        );

        let mut note = fx.master_push_note();
        note.node_sig.clear();
        assert_eq!(
            field_of(check_push_note_sanity(&fx.config, &note, fx.now).unwrap_err()).1,
            "push node signature is required"
        );

        let mut note = fx.master_push_note();
        note.size += 1;
        assert_eq!(
            field_of(check_push_note_sanity(&fx.config, &note, fx.now).unwrap_err()),
            ("nodeSig".into(), "failed to verify signature".into())
        );
    }

    #[test]
    fn test_sanity_reference_errors_are_indexed() {
        let fx = Fixture::new();
        let mut note = fx.master_push_note();
        note.references.push(PushedReference {
            name: "refs/heads/dev".into(),
            ..Default::default()
        });
        let err = check_push_note_sanity(&fx.config, &note, fx.now).unwrap_err();
        assert_eq!(err.as_field().and_then(|f| f.index), Some(1));
    }

    #[test]
    fn test_consistency_unknown_repo_and_namespace() {
        let fx = Fixture::new();
        let mut note = fx.master_push_note();
        note.repo_name = "unknown".into();
        assert_eq!(
            field_of(check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap_err()).1,
            "repository named 'unknown' is unknown"
        );

        let mut note = fx.master_push_note();
        note.namespace = Some("ns1".into());
        assert_eq!(
            field_of(check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap_err()).1,
            "namespace 'ns1' is unknown"
        );

        let mut ns = Namespace::default();
        ns.domains.insert("web".into(), "r/other".into());
        fx.logic.add_namespace("ns1", ns);
        assert_eq!(
            field_of(check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap_err()).1,
            "repo not a target in namespace 'ns1'"
        );
    }

    #[test]
    fn test_consistency_pusher_identity() {
        let fx = Fixture::new();
        let mut note = fx.master_push_note();
        note.pusher_address = [7u8; 20];
        assert_eq!(
            field_of(check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap_err()).1,
            "push key does not belong to pusher"
        );

        let mut note = fx.master_push_note();
        note.pusher_key_id = vec![3u8; 20];
        let (field, msg) = field_of(check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap_err());
        assert_eq!(field, "pusherKeyId");
        assert!(msg.ends_with("is unknown"));
    }

    #[test]
    fn test_consistency_account_nonce() {
        let fx = Fixture::new();
        fx.logic.add_account(
            fx.pusher.address,
            Account { nonce: 5, balance: "100".parse().unwrap() },
        );
        let note = fx.master_push_note();
        assert_eq!(
            field_of(check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap_err()).1,
            "wrong account nonce '1', expecting '6'"
        );
    }

    #[test]
    fn test_consistency_account_nonce_at_max() {
        let fx = Fixture::new();
        fx.logic.add_account(
            fx.pusher.address,
            Account { nonce: u64::MAX, balance: "100".parse().unwrap() },
        );
        let note = fx.master_push_note();
        assert_eq!(
            field_of(check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap_err()),
            ("accountNonce".into(), "pusher account nonce is out of range".into())
        );
    }

    #[test]
    fn test_consistency_push_key_scopes() {
        let fx = Fixture::new();
        let note = fx.master_push_note();
        let scoped = |scopes: &[&str]| {
            fx.logic.add_push_key(PushKey {
                scopes: scopes.iter().map(|s| s.to_string()).collect(),
                ..fx.pusher.push_key()
            });
        };

        scoped(&["r/repo1"]);
        check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap();

        scoped(&["repo2", "ns1/"]);
        assert_eq!(
            field_of(check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap_err()),
            ("scopes".into(), "push key not permitted due to scope limitation".into())
        );
    }

    #[test]
    fn test_consistency_namespaced_scopes_resolve_through_domains() {
        let fx = Fixture::new();
        let mut ns = Namespace::default();
        ns.domains.insert("web".into(), "r/repo1".into());
        ns.domains.insert("docs".into(), "r/other".into());
        fx.logic.add_namespace("ns1", ns);

        let mut note = fx.master_push_note();
        note.namespace = Some("ns1".into());
        fx.pusher.sign_references(&mut note);
        fx.sign_note(&mut note);

        for allowed in [&["ns1/web"][..], &["ns1/"], &["repo1"]] {
            fx.logic.add_push_key(PushKey {
                scopes: allowed.iter().map(|s| s.to_string()).collect(),
                ..fx.pusher.push_key()
            });
            check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap();
        }

        for blocked in [&["ns1/docs"][..], &["r/repo1"], &["ns2/"], &["web"]] {
            fx.logic.add_push_key(PushKey {
                scopes: blocked.iter().map(|s| s.to_string()).collect(),
                ..fx.pusher.push_key()
            });
            let (field, _) =
                field_of(check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap_err());
            assert_eq!(field, "scopes", "scopes {:?}", blocked);
        }
    }

    #[test]
    fn test_consistency_reference_signature() {
        let fx = Fixture::new();
        let mut note = fx.master_push_note();
        note.references[0].push_sig = vec![0u8; 64];
        let err = check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"field:"references","index":"0","msg":"reference (refs/heads/master) signature is invalid""#
        );
    }

    #[test]
    fn test_consistency_propagates_dry_send_error() {
        let fx = Fixture::new();
        fx.logic.add_account(fx.pusher.address, Account::default());
        let note = fx.master_push_note();
        let err = check_push_note_consistency(&note, None, fx.logic.as_ref()).unwrap_err();
        assert!(matches!(err, ValidationError::Balance(_)));
        assert!(err.to_string().contains("insufficient"));
    }

    #[test]
    fn test_consistency_checks_local_old_hash() {
        let fx = Fixture::new();
        fx.logic.update_repo("repo1", |repo| {
            repo.references.insert(
                "refs/heads/master".into(),
                Reference { nonce: 1, hash: hash_of(1), ..Default::default() },
            );
        });
        let note = fx.push_note(vec![fx.pushed_ref("refs/heads/master", &hash_of(1), &hash_of(2), 2)]);
        fx.repo.set_ref("refs/heads/master", &hash_of(3));
        let err = check_push_note_consistency(&note, Some(&fx.repo), fx.logic.as_ref()).unwrap_err();
        assert!(field_of(err).1.contains("old hash does not match"));
    }

    #[test]
    fn test_totals_count_value_only_for_merge_requests() {
        let note = PushNote {
            references: vec![
                PushedReference {
                    name: "refs/heads/master".into(),
                    fee: "1".into(),
                    value: Some("5".into()),
                    ..Default::default()
                },
                PushedReference {
                    name: "refs/heads/merges/1".into(),
                    fee: "0.5".into(),
                    value: Some("2".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let (fee, value) = note_totals(&note).unwrap();
        assert_eq!(fee.to_string(), "1.5");
        assert_eq!(value.to_string(), "2");
    }
}
