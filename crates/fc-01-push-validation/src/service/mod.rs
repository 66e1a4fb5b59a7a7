//! Push Validation Service
//!
//! Wires the checkers to their collaborators and implements
//! [`PushValidationApi`].
//!
//! # Pipeline
//!
//! ```text
//! PushNote ──sanity──→ consistency ──→ per reference:
//!                                        change ─→ merge compliance
//!                                                  (merge ID only)
//! ```
//!
//! Consistency already authorizes the pusher's key, scopes and reference
//! signatures against the note's real repository name. Details derived from
//! a note carry that name, so they are not re-run through
//! [`PushValidationApi::check_tx_detail`], which expects the namespaced
//! domain name of a directly supplied detail.
//!
//! The service holds no mutable state; concurrent calls on independent
//! notes are safe. Callers must serialize pushes to the same reference.

use crate::config::ValidationConfig;
use crate::domain::{
    FieldError, PostOutcome, PushOutcome, ValidatedReference, ValidationError, ValidationResult,
};
use crate::metrics;
use crate::ports::{DhtNode, LocalRepo, Logic, PushValidationApi, SystemTimeSource, TimeSource};
use crate::validation;
use async_trait::async_trait;
use shared_types::{PushEndorsement, PushKeyId, PushNote, PushedReference, TxDetail};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Push Validation Service
pub struct PushValidationService<L, D>
where
    L: Logic,
    D: DhtNode,
{
    logic: Arc<L>,
    dht: Arc<D>,
    config: ValidationConfig,
    time_source: Box<dyn TimeSource>,
}

impl<L, D> PushValidationService<L, D>
where
    L: Logic,
    D: DhtNode,
{
    /// Create a new PushValidationService
    pub fn new(logic: Arc<L>, dht: Arc<D>, config: ValidationConfig) -> Self {
        Self {
            logic,
            dht,
            config,
            time_source: Box::new(SystemTimeSource),
        }
    }

    /// Set custom time source (for testing)
    pub fn with_time_source(mut self, time_source: Box<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    fn validate_references(
        &self,
        note: &PushNote,
        repo: &dyn LocalRepo,
    ) -> ValidationResult<Vec<ValidatedReference>> {
        let details = validation::tx_details_from_note(note, &[]);
        let mut validated = Vec::with_capacity(details.len());

        for (change, detail) in note.references.iter().zip(details) {
            let post = validation::validate_change(&self.config, repo, self.logic.as_ref(), change, &detail)?;

            if let Some(id) = change.merge_proposal_id.as_deref().filter(|id| !id.is_empty()) {
                let Some(key_id) = note.pusher_key() else {
                    return Err(ValidationError::Field(FieldError::new(
                        "pusherKeyId",
                        "push key id is not valid",
                    )));
                };
                validation::check_merge_compliance(repo, self.logic.as_ref(), change, id, &key_id)?;
            }

            debug!(reference = %change.name, post = post.is_some(), "reference accepted");
            validated.push(ValidatedReference { detail, post });
        }

        Ok(validated)
    }
}

#[async_trait]
impl<L, D> PushValidationApi for PushValidationService<L, D>
where
    L: Logic + 'static,
    D: DhtNode + 'static,
{
    #[instrument(skip(self, note, local), fields(repo = %note.repo_name))]
    fn check_push_note(
        &self,
        note: &PushNote,
        local: Option<&dyn LocalRepo>,
    ) -> ValidationResult<()> {
        let result = validation::check_push_note(
            &self.config,
            note,
            local,
            self.logic.as_ref(),
            self.time_source.now(),
        );
        if let Err(e) = &result {
            warn!(reason = e.reason(), error = %e, "push note rejected");
        }
        result
    }

    #[instrument(skip(self, note, repo), fields(repo = %note.repo_name, note_id = %hex::encode(note.id())))]
    async fn validate_push(
        &self,
        note: &PushNote,
        repo: &dyn LocalRepo,
    ) -> ValidationResult<PushOutcome> {
        let started = Instant::now();

        let result = validation::check_push_note(
            &self.config,
            note,
            None,
            self.logic.as_ref(),
            self.time_source.now(),
        )
        .and_then(|_| self.validate_references(note, repo));

        metrics::record_validation_latency(started.elapsed().as_secs_f64());
        match result {
            Ok(references) => {
                metrics::record_push_note_validated();
                debug!(references = references.len(), "push note accepted");
                Ok(PushOutcome {
                    note_id: note.id(),
                    references,
                })
            }
            Err(e) => {
                metrics::record_push_note_rejected(e.reason());
                warn!(reason = e.reason(), error = %e, "push note rejected");
                Err(e)
            }
        }
    }

    fn check_tx_detail(&self, detail: &TxDetail, index: Option<usize>) -> ValidationResult<()> {
        validation::check_tx_detail(&self.config, self.logic.as_ref(), detail, index)
    }

    fn validate_change(
        &self,
        repo: &dyn LocalRepo,
        change: &PushedReference,
        detail: &TxDetail,
    ) -> ValidationResult<Option<PostOutcome>> {
        validation::validate_change(&self.config, repo, self.logic.as_ref(), change, detail)
    }

    fn check_merge_compliance(
        &self,
        repo: &dyn LocalRepo,
        change: &PushedReference,
        merge_proposal_id: &str,
        push_key_id: &PushKeyId,
    ) -> ValidationResult<()> {
        validation::check_merge_compliance(
            repo,
            self.logic.as_ref(),
            change,
            merge_proposal_id,
            push_key_id,
        )
    }

    #[instrument(skip_all)]
    fn check_endorsement(&self, endorsement: &PushEndorsement) -> ValidationResult<()> {
        let result = validation::check_endorsement(
            endorsement,
            self.logic.as_ref(),
            self.config.num_top_hosts,
            None,
        );
        if let Err(e) = &result {
            metrics::record_endorsement_rejected(e.reason());
            warn!(reason = e.reason(), error = %e, "endorsement rejected");
        }
        result
    }

    fn check_note_endorsements(&self, endorsements: &[PushEndorsement]) -> ValidationResult<()> {
        validation::check_note_endorsements(
            endorsements,
            self.logic.as_ref(),
            self.config.num_top_hosts,
        )
        .map_err(|e| {
            metrics::record_endorsement_rejected(e.reason());
            e
        })
    }

    #[instrument(skip(self, note, repo), fields(repo = %note.repo_name))]
    async fn fetch_and_check_reference_objects(
        &self,
        note: &PushNote,
        repo: &dyn LocalRepo,
    ) -> ValidationResult<()> {
        validation::fetch_and_check_reference_objects(
            note,
            repo,
            self.dht.as_ref(),
            self.config.object_fetch_timeout,
        )
        .await
        .map_err(|e| {
            warn!(reason = e.reason(), error = %e, "pushed objects unavailable");
            e
        })
    }
}
