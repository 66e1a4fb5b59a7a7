//! Driving ports (Inbound API)

use crate::domain::{PostOutcome, PushOutcome, ValidationResult};
use crate::ports::outbound::LocalRepo;
use async_trait::async_trait;
use shared_types::{PushEndorsement, PushKeyId, PushNote, PushedReference, TxDetail};

/// Primary push validation API
///
/// Called by the push-receiving service and by the endorsement gossip
/// handlers. Every method is read-only with respect to ledger state.
#[async_trait]
pub trait PushValidationApi: Send + Sync {
    /// Sanity and consistency of a push note.
    ///
    /// When `local` is given, each existing reference's local hash must match
    /// the note's old hash.
    fn check_push_note(&self, note: &PushNote, local: Option<&dyn LocalRepo>)
        -> ValidationResult<()>;

    /// Full admission of a push note whose reference updates have been
    /// applied to `repo`.
    ///
    /// Returns the per-reference transaction details and post outcomes the
    /// caller must apply.
    async fn validate_push(
        &self,
        note: &PushNote,
        repo: &dyn LocalRepo,
    ) -> ValidationResult<PushOutcome>;

    /// Sanity and consistency of a single transaction detail supplied with
    /// a direct push. A namespaced detail names the domain, not the
    /// repository it targets.
    fn check_tx_detail(&self, detail: &TxDetail, index: Option<usize>) -> ValidationResult<()>;

    /// Kind-specific validation of one changed reference.
    fn validate_change(
        &self,
        repo: &dyn LocalRepo,
        change: &PushedReference,
        detail: &TxDetail,
    ) -> ValidationResult<Option<PostOutcome>>;

    /// Check that a branch push lands the commit an accepted merge
    /// proposal describes.
    fn check_merge_compliance(
        &self,
        repo: &dyn LocalRepo,
        change: &PushedReference,
        merge_proposal_id: &str,
        push_key_id: &PushKeyId,
    ) -> ValidationResult<()>;

    /// A standalone endorsement, BLS signature included.
    fn check_endorsement(&self, endorsement: &PushEndorsement) -> ValidationResult<()>;

    /// Endorsements embedded in a push note.
    fn check_note_endorsements(&self, endorsements: &[PushEndorsement]) -> ValidationResult<()>;

    /// Fetch any object of `note` missing from `repo` and check the
    /// declared note size.
    async fn fetch_and_check_reference_objects(
        &self,
        note: &PushNote,
        repo: &dyn LocalRepo,
    ) -> ValidationResult<()>;
}
