//! Transaction detail checks.
//!
//! A [`TxDetail`] is the signed metadata bound to one reference change. It
//! is derived from a push note reference or supplied directly with a
//! single-reference push.

use crate::config::ValidationConfig;
use crate::domain::errors::{field_err_at, ValidationError, ValidationResult};
use crate::domain::names::{is_digits, is_valid_push_key_id};
use crate::domain::reference::{is_merge_request_reference, make_merge_request_proposal_id};
use crate::domain::scope::is_blocked_by_scope;
use crate::ports::outbound::Logic;
use shared_crypto::{decode_base58, encode_base58, hash_namespace, verify_ed25519};
use shared_types::{Amount, ProposalAction, PushKeyId, PushNote, TxDetail};
use tracing::debug;

/// Derive the transaction detail of every reference in `note`.
///
/// When `target_refs` is non-empty only the named references are returned.
pub fn tx_details_from_note(note: &PushNote, target_refs: &[&str]) -> Vec<TxDetail> {
    note.references
        .iter()
        .filter(|r| target_refs.is_empty() || target_refs.contains(&r.name.as_str()))
        .map(|r| TxDetail {
            repo_name: note.repo_name.clone(),
            repo_namespace: note.namespace.clone(),
            reference: r.name.clone(),
            fee: r.fee.clone(),
            value: r.value.clone(),
            nonce: note.pusher_account_nonce,
            push_key_id: note.pusher_key_id_string(),
            signature: encode_base58(&r.push_sig),
            merge_proposal_id: r.merge_proposal_id.clone(),
            head: Some(r.new_hash.clone()),
        })
        .collect()
}

/// Syntax of a merge proposal ID: digits only, bounded length.
pub fn check_merge_proposal_id(
    id: &str,
    field: &str,
    index: Option<usize>,
    max_len: usize,
) -> ValidationResult<()> {
    if !is_digits(id) {
        return field_err_at(index, field, "merge proposal id must be numeric");
    }
    if id.len() > max_len {
        return field_err_at(
            index,
            field,
            format!("merge proposal id exceeded {} bytes limit", max_len),
        );
    }
    Ok(())
}

/// State-independent checks.
pub fn check_tx_detail_sanity(
    config: &ValidationConfig,
    detail: &TxDetail,
    index: Option<usize>,
) -> ValidationResult<()> {
    if detail.push_key_id.is_empty() {
        return field_err_at(index, "pkID", "push key id is required");
    }
    if !is_valid_push_key_id(&detail.push_key_id) {
        return field_err_at(index, "pkID", "push key id is not valid");
    }

    if detail.nonce == 0 {
        return field_err_at(index, "nonce", "nonce is required");
    }

    if detail.fee.is_empty() {
        return field_err_at(index, "fee", "fee is required");
    }
    if !Amount::is_numeric(&detail.fee) {
        return field_err_at(index, "fee", "fee must be numeric");
    }

    let has_value = detail.value.as_deref().is_some_and(|v| !v.is_empty());
    if has_value && !is_merge_request_reference(&detail.reference) {
        return field_err_at(index, "value", "field not expected");
    }

    if decode_base58(&detail.signature).is_err() {
        return field_err_at(index, "sig", "signature format is not valid");
    }

    if let Some(id) = detail.merge_proposal_id.as_deref().filter(|id| !id.is_empty()) {
        check_merge_proposal_id(id, "mergeID", index, config.max_merge_proposal_id_len)?;
    }

    Ok(())
}

/// Checks against ledger state, ending with signature verification.
pub fn check_tx_detail_consistency(
    logic: &dyn Logic,
    detail: &TxDetail,
    index: Option<usize>,
) -> ValidationResult<()> {
    let key_id: PushKeyId = match detail.push_key_id.parse() {
        Ok(id) => id,
        Err(_) => return field_err_at(index, "pkID", "push key id is not valid"),
    };
    let push_key = match logic
        .push_key_keeper()
        .get(&key_id)
        .map_err(|e| ValidationError::ledger("failed to get push key", e))?
    {
        Some(key) => key,
        None => return field_err_at(index, "pkID", "push key not found"),
    };

    // Namespaced names resolve to the repository the domain targets
    let mut repo_name = detail.repo_name.clone();
    let namespace = detail.repo_namespace.as_deref().unwrap_or_default();
    let mut ns = None;
    if !namespace.is_empty() {
        let found = logic
            .namespace_keeper()
            .get(&hash_namespace(namespace))
            .map_err(|e| ValidationError::ledger("failed to get namespace", e))?;
        let Some(found) = found else {
            return field_err_at(index, "namespace", "namespace not found");
        };
        match found.domains.get(&detail.repo_name).and_then(|t| t.get(2..)) {
            Some(target) if !target.is_empty() => repo_name = target.to_string(),
            _ => {
                return field_err_at(
                    index,
                    "repo",
                    format!("repo not a target in namespace '{}'", namespace),
                )
            }
        }
        ns = Some(found);
    }

    if !push_key.scopes.is_empty()
        && is_blocked_by_scope(&push_key.scopes, &detail.repo_name, namespace, ns.as_ref())
    {
        return field_err_at(index, "scopes", "push key not permitted due to scope limitation");
    }

    let owner_nonce = logic
        .account_keeper()
        .get(&push_key.address)
        .map_err(|e| ValidationError::ledger("failed to get push key owner", e))?
        .map(|a| a.nonce)
        .unwrap_or(0);
    if detail.nonce <= owner_nonce {
        return field_err_at(
            index,
            "nonce",
            format!(
                "nonce ({}) must be greater than current key owner nonce ({})",
                detail.nonce, owner_nonce
            ),
        );
    }

    if let Some(id) = detail.merge_proposal_id.as_deref().filter(|id| !id.is_empty()) {
        let repo = logic
            .repo_keeper()
            .get(&repo_name)
            .map_err(|e| ValidationError::ledger("failed to get repository", e))?;
        let Some(repo) = repo else {
            return field_err_at(
                index,
                "repo",
                format!("repository named '{}' is unknown", repo_name),
            );
        };
        let Some(proposal) = repo.proposals.get(&make_merge_request_proposal_id(id)) else {
            return field_err_at(index, "mergeID", "merge proposal not found");
        };
        if proposal.action != ProposalAction::MergeRequest {
            return field_err_at(index, "mergeID", "proposal is not a merge request");
        }
        if proposal.creator != push_key.address {
            return field_err_at(index, "mergeID", "merge proposal not created by the push key owner");
        }
    }

    let signature = decode_base58(&detail.signature).unwrap_or_default();
    if verify_ed25519(&push_key.pub_key, &detail.bytes_no_sig(), &signature).is_err() {
        return field_err_at(index, "sig", "signature is not valid");
    }

    debug!(repo = %repo_name, reference = %detail.reference, "tx detail accepted");
    Ok(())
}

/// Sanity then consistency.
pub fn check_tx_detail(
    config: &ValidationConfig,
    logic: &dyn Logic,
    detail: &TxDetail,
    index: Option<usize>,
) -> ValidationResult<()> {
    check_tx_detail_sanity(config, detail, index)?;
    check_tx_detail_consistency(logic, detail, index)
}
