//! Reference-kind dispatch for changed references.

use crate::config::ValidationConfig;
use crate::domain::errors::{ValidationError, ValidationResult};
use crate::domain::git::{Commit, Tag};
use crate::domain::outcome::PostOutcome;
use crate::domain::reference::ReferenceKind;
use crate::ports::outbound::{LocalRepo, Logic};
use crate::validation::post_commit::validate_post_commit;
use shared_types::{PushedReference, TxDetail};
use tracing::debug;

/// The pushed commit must be the head the pusher signed.
pub fn check_commit(commit: &Commit, detail: &TxDetail) -> ValidationResult<()> {
    if detail.head.as_deref() != Some(commit.hash.as_str()) {
        return Err(ValidationError::PushedAndSignedHeadMismatch);
    }
    Ok(())
}

/// The pushed annotated tag must be the head the pusher signed.
pub fn check_annotated_tag(tag: &Tag, detail: &TxDetail) -> ValidationResult<()> {
    if detail.head.as_deref() != Some(tag.hash.as_str()) {
        return Err(ValidationError::PushedAndSignedHeadMismatch);
    }
    Ok(())
}

/// The note reference must currently resolve to the signed head.
pub fn check_note(repo: &dyn LocalRepo, detail: &TxDetail) -> ValidationResult<()> {
    let note_hash = repo
        .ref_get(&detail.reference)
        .map_err(|e| ValidationError::git("failed to get note", e))?;
    if detail.head.as_deref() != Some(note_hash.as_str()) {
        return Err(ValidationError::NoteHashMismatch);
    }
    Ok(())
}

/// Validate one changed reference according to its kind.
///
/// Post references return the derived [`PostOutcome`].
pub fn validate_change(
    config: &ValidationConfig,
    repo: &dyn LocalRepo,
    logic: &dyn Logic,
    change: &PushedReference,
    detail: &TxDetail,
) -> ValidationResult<Option<PostOutcome>> {
    let Some(kind) = ReferenceKind::of(&change.name) else {
        return Err(ValidationError::UnrecognisedChange(change.name.clone()));
    };
    debug!(reference = %change.name, ?kind, "validating change");

    match kind {
        ReferenceKind::IssuePost | ReferenceKind::MergeRequestPost => {
            validate_post_commit(config, repo, logic, change, detail).map(Some)
        }
        ReferenceKind::Branch => {
            let commit = repo
                .commit_object(&change.new_hash)
                .map_err(|e| ValidationError::git("unable to get commit object", e))?;
            check_commit(&commit, detail).map(|_| None)
        }
        ReferenceKind::Tag => {
            let target = repo
                .reference(&change.name)
                .map_err(|e| ValidationError::git("failed to get tag object", e))?;
            let tag = repo
                .tag_object(&target)
                .map_err(|e| ValidationError::git("failed to get tag object", e))?;
            match tag {
                Some(tag) => check_annotated_tag(&tag, detail)?,
                None => {
                    // Lightweight tag: the referenced commit carries the signature
                    let commit = repo
                        .commit_object(&target)
                        .map_err(|e| ValidationError::git("unable to get commit", e))?;
                    check_commit(&commit, detail)?;
                }
            }
            Ok(None)
        }
        ReferenceKind::Note => check_note(repo, detail).map(|_| None),
    }
}
