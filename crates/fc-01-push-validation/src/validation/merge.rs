//! Merge compliance.
//!
//! A push that names a merge proposal must land exactly the commit the
//! accepted proposal describes, on the branch it targets, from the hash it
//! was based on.

use crate::domain::errors::{field_err, MergeError, ValidationError, ValidationResult};
use crate::domain::git::Commit;
use crate::domain::reference::{make_merge_request_proposal_id, short_name, ReferenceKind};
use crate::ports::outbound::{LocalRepo, Logic};
use shared_types::{action_data, ProposalOutcome, PushKeyId, PushedReference, ZERO_HASH};
use tracing::debug;

/// Check that `change` satisfies merge proposal `merge_proposal_id`.
pub fn check_merge_compliance(
    repo: &dyn LocalRepo,
    logic: &dyn Logic,
    change: &PushedReference,
    merge_proposal_id: &str,
    push_key_id: &PushKeyId,
) -> ValidationResult<()> {
    if ReferenceKind::of(&change.name) != Some(ReferenceKind::Branch) {
        return Err(MergeError::NotBranch.into());
    }

    let proposal_id = make_merge_request_proposal_id(merge_proposal_id);
    let state = repo.state();
    let Some(proposal) = state.proposals.get(&proposal_id) else {
        return Err(MergeError::ProposalNotFound(merge_proposal_id.to_string()).into());
    };

    let push_key = logic
        .push_key_keeper()
        .get(push_key_id)
        .map_err(|e| ValidationError::ledger("failed to get push key", e))?;
    let Some(push_key) = push_key else {
        return field_err("pkID", "push key not found");
    };
    if proposal.creator != push_key.address {
        return Err(MergeError::NotCreator.into());
    }

    let closed = logic
        .repo_keeper()
        .is_proposal_closed(repo.name(), &proposal_id)
        .map_err(|e| ValidationError::ledger("failed to check proposal status", e))?;
    if closed {
        return Err(MergeError::ProposalClosed.into());
    }

    if proposal.action_str(action_data::BASE_BRANCH) != short_name(&change.name) {
        return Err(MergeError::BaseMismatch.into());
    }

    match proposal.outcome {
        ProposalOutcome::Accepted => {}
        ProposalOutcome::Undecided => return Err(MergeError::Undecided.into()),
        _ => return Err(MergeError::NotAccepted.into()),
    }

    let target_hash = proposal.action_str(action_data::TARGET_COMMIT_HASH);
    let pushed = repo
        .commit_object(&change.new_hash)
        .map_err(|e| ValidationError::git("unable to get commit object", e))?;
    let target = resolve_target_commit(repo, &pushed, &target_hash)?;

    if pushed.tree_hash != target.tree_hash {
        return Err(MergeError::TreeMismatch.into());
    }
    if pushed.author != target.author {
        return Err(MergeError::AuthorMismatch.into());
    }
    if pushed.committer != target.committer {
        return Err(MergeError::CommitterMismatch.into());
    }

    let mut base_hash = proposal.action_str(action_data::BASE_BRANCH_HASH);
    if base_hash.is_empty() {
        base_hash = ZERO_HASH.to_string();
    }
    if base_hash != change.old_hash {
        return Err(MergeError::StaleBaseHash.into());
    }

    if target.hash != target_hash {
        return Err(MergeError::TargetHashMismatch.into());
    }

    debug!(reference = %change.name, proposal = %proposal_id, "merge compliant");
    Ok(())
}

/// The commit the proposal's target hash refers to: the pushed commit
/// itself, the matching parent of a merge commit, or the sole parent.
fn resolve_target_commit(
    repo: &dyn LocalRepo,
    pushed: &Commit,
    target_hash: &str,
) -> ValidationResult<Commit> {
    if pushed.hash == target_hash {
        return Ok(pushed.clone());
    }

    let parent = if pushed.is_merge() {
        if !pushed.is_parent(target_hash) {
            return Err(MergeError::TargetParentNotFound.into());
        }
        target_hash
    } else {
        match pushed.parent_hashes.first() {
            Some(parent) => parent.as_str(),
            None => return Err(MergeError::TargetParentNotFound.into()),
        }
    };

    repo.commit_object(parent)
        .map_err(|e| ValidationError::git("unable to get target commit", e))
}
