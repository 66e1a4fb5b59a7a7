//! Per-reference checks of a push note.

use crate::config::ValidationConfig;
use crate::domain::errors::{field_err_at, ValidationResult};
use crate::domain::names::is_valid_hash;
use crate::domain::reference::is_merge_request_reference;
use crate::ports::outbound::LocalRepo;
use crate::validation::tx_detail::check_merge_proposal_id;
use shared_types::{Amount, PushedReference, Repository};

/// Syntax of one pushed reference.
pub fn check_pushed_reference_sanity(
    config: &ValidationConfig,
    pushed: &PushedReference,
    index: Option<usize>,
) -> ValidationResult<()> {
    if pushed.name.is_empty() {
        return field_err_at(index, "references.name", "name is required");
    }

    if pushed.old_hash.is_empty() {
        return field_err_at(index, "references.oldHash", "old hash is required");
    }
    if !is_valid_hash(&pushed.old_hash) {
        return field_err_at(index, "references.oldHash", "old hash is not valid");
    }

    if pushed.new_hash.is_empty() {
        return field_err_at(index, "references.newHash", "new hash is required");
    }
    if !is_valid_hash(&pushed.new_hash) {
        return field_err_at(index, "references.newHash", "new hash is not valid");
    }

    if pushed.nonce == 0 {
        return field_err_at(
            index,
            "references.nonce",
            "reference nonce must be greater than zero",
        );
    }

    if pushed.fee.is_empty() {
        return field_err_at(index, "references.fee", "fee is required");
    }
    if !Amount::is_numeric(&pushed.fee) {
        return field_err_at(index, "references.fee", "fee must be numeric");
    }

    if let Some(value) = pushed.value.as_deref().filter(|v| !v.is_empty()) {
        if !Amount::is_numeric(value) {
            return field_err_at(index, "value", "value must be numeric");
        }
    }

    if let Some(id) = pushed.merge_proposal_id.as_deref().filter(|id| !id.is_empty()) {
        check_merge_proposal_id(id, "mergeProposalID", index, config.max_merge_proposal_id_len)?;
    }

    if pushed.push_sig.is_empty() {
        return field_err_at(index, "references.pushSig", "signature is required");
    }

    Ok(())
}

/// Check a pushed reference against on-chain `repo` state and, when given,
/// the local working copy.
pub fn check_pushed_reference_consistency(
    local: Option<&dyn LocalRepo>,
    pushed: &PushedReference,
    repo: &Repository,
    index: Option<usize>,
) -> ValidationResult<()> {
    let name = pushed.name.as_str();
    let on_chain = repo.references.get(name);

    if !pushed.is_new() && on_chain.is_none() {
        return field_err_at(index, "references", format!("reference '{}' is unknown", name));
    }

    // Local and on-chain views must both agree on the old hash
    if let Some(local) = local.filter(|_| !pushed.is_new()) {
        let Ok(local_hash) = local.reference(name) else {
            return field_err_at(
                index,
                "references",
                format!("reference '{}' does not exist locally", name),
            );
        };
        if local_hash != pushed.old_hash {
            return field_err_at(
                index,
                "references",
                format!("reference '{}' old hash does not match its local version", name),
            );
        }
    }

    let Some(next_nonce) = on_chain.map(|r| r.nonce).unwrap_or(0).checked_add(1) else {
        return field_err_at(
            index,
            "references",
            format!("reference '{}' nonce is out of range", name),
        );
    };
    if pushed.nonce != next_nonce {
        return field_err_at(
            index,
            "references",
            format!(
                "reference '{}' has nonce '{}', expecting '{}'",
                name, pushed.nonce, next_nonce
            ),
        );
    }

    if pushed.is_new() && is_merge_request_reference(name) {
        check_proposal_fee(pushed, repo, index)?;
    }

    Ok(())
}

fn check_proposal_fee(
    pushed: &PushedReference,
    repo: &Repository,
    index: Option<usize>,
) -> ValidationResult<()> {
    let gov = &repo.config.gov;
    let value = pushed
        .value
        .as_deref()
        .and_then(|v| v.parse::<Amount>().ok())
        .unwrap_or_default();

    if gov.prop_fee.is_zero() {
        if !value.is_zero() {
            return field_err_at(index, "value", "proposal fee not expected");
        }
        return Ok(());
    }

    // Partial deposits are settled by governance, not here
    if !gov.no_prop_fee_for_merge_req && gov.prop_fee_deposit_dur == 0 && value < gov.prop_fee {
        return field_err_at(index, "value", "proposal fee cannot be less than repo minimum");
    }

    Ok(())
}
