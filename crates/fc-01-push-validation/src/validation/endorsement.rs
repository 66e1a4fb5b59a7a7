//! Endorsement checks.
//!
//! A standalone endorsement names the note it endorses and carries the
//! endorser's BLS signature. Endorsements embedded in a push note omit both;
//! only the first of them lists the endorsed references.

use crate::domain::errors::{field_err_at, ValidationError, ValidationResult};
use crate::ports::outbound::Logic;
use shared_crypto::{BlsPublicKey, BlsSignature};
use shared_types::PushEndorsement;
use tracing::debug;

/// State-independent checks.
///
/// `from_push_note` selects the embedded rules.
pub fn check_endorsement_sanity(
    endorsement: &PushEndorsement,
    from_push_note: bool,
    index: Option<usize>,
) -> ValidationResult<()> {
    if !from_push_note && endorsement.note_id.is_none() {
        return field_err_at(index, "noteID", "push note id is required");
    }
    if from_push_note && endorsement.note_id.is_some() {
        return field_err_at(index, "noteID", "push note id is not expected");
    }

    if endorsement.endorser_pub_key.is_none() {
        return field_err_at(index, "pubKey", "endorser's public key is required");
    }

    let first = index.unwrap_or(0) == 0;
    if (!from_push_note || first) && endorsement.references.is_empty() {
        return field_err_at(index, "endorsements.refs", "at least one reference is required");
    }
    if from_push_note && !first && !endorsement.references.is_empty() {
        return field_err_at(index, "endorsements.refs", "references not expected");
    }

    let has_sig = endorsement.sig_bls.as_ref().is_some_and(|s| !s.is_empty());
    if !from_push_note && !has_sig {
        return field_err_at(index, "sigBLS", "endorser's BLS signature is required");
    }
    if from_push_note && endorsement.sig_bls.is_some() {
        return field_err_at(index, "sigBLS", "BLS signature is not expected");
    }

    Ok(())
}

/// The endorser must be an active top host and, unless `no_sig_check` is
/// set, its BLS signature must verify.
pub fn check_endorsement_consistency(
    endorsement: &PushEndorsement,
    logic: &dyn Logic,
    num_top_hosts: usize,
    no_sig_check: bool,
    index: Option<usize>,
) -> ValidationResult<()> {
    let hosts = logic
        .ticket_manager()
        .top_hosts(num_top_hosts)
        .map_err(|e| ValidationError::ledger("failed to get top hosts", e))?;

    let endorser = endorsement.endorser_pub_key;
    let Some(host) = hosts
        .iter()
        .find(|h| Some(h.ticket.proposer_pub_key) == endorser)
    else {
        return field_err_at(
            index,
            "pubKey",
            "endorser public key does not belong to an active host",
        );
    };

    if no_sig_check {
        return Ok(());
    }

    let bls_key = BlsPublicKey::from_slice(&host.ticket.bls_pub_key)
        .map_err(ValidationError::InvalidEndorserBlsKey)?;
    let verified = endorsement
        .sig_bls
        .as_deref()
        .and_then(|sig| BlsSignature::from_slice(sig).ok())
        .is_some_and(|sig| bls_key.verify(&endorsement.bytes_for_bls_sig(), &sig));
    if !verified {
        return field_err_at(index, "signature", "signature could not be verified");
    }

    debug!(hosts = hosts.len(), "endorsement verified");
    Ok(())
}

/// Sanity then consistency of a standalone endorsement.
pub fn check_endorsement(
    endorsement: &PushEndorsement,
    logic: &dyn Logic,
    num_top_hosts: usize,
    index: Option<usize>,
) -> ValidationResult<()> {
    check_endorsement_sanity(endorsement, false, index)?;
    check_endorsement_consistency(endorsement, logic, num_top_hosts, false, index)
}

/// Check the endorsements embedded in a push note.
///
/// Their aggregated signature is verified elsewhere, so only membership of
/// the top host set is checked here.
pub fn check_note_endorsements(
    endorsements: &[PushEndorsement],
    logic: &dyn Logic,
    num_top_hosts: usize,
) -> ValidationResult<()> {
    for (i, endorsement) in endorsements.iter().enumerate() {
        check_endorsement_sanity(endorsement, true, Some(i))?;
        check_endorsement_consistency(endorsement, logic, num_top_hosts, true, Some(i))?;
    }
    Ok(())
}
