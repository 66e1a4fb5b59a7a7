//! # Push Admission Flows
//!
//! A node receiving a push runs, in order:
//!
//! 1. **Arrival**: `check_push_note` against chain state and the local copy
//! 2. **Objects**: `fetch_and_check_reference_objects` pulls what is missing
//! 3. **Apply**: reference updates land in the working copy
//! 4. **Admission**: `validate_push` returns what the ledger must record
//! 5. **Endorsement**: top hosts vouch for the note

#[cfg(test)]
mod tests {
    use fc_01_push_validation::ports::outbound::make_repo_object_dht_key;
    use fc_01_push_validation::test_utils::{
        commit, hash_of, FixedTimeSource, Fixture, Host, MemDht, MemLogic,
    };
    use fc_01_push_validation::{
        LocalRepo, MergeError, PushValidationApi, PushValidationService, ValidationError,
    };
    use rand::RngCore;
    use shared_types::{
        action_data, EndorsedReference, ProposalAction, ProposalOutcome, RepoProposal,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn service(fx: &Fixture, dht: Arc<MemDht>) -> PushValidationService<MemLogic, MemDht> {
        PushValidationService::new(fx.logic.clone(), dht, fx.config.clone())
            .with_time_source(Box::new(FixedTimeSource::new(fx.now)))
    }

    fn random_object(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    /// Proposal MR1: merge target commit 3 into master at commit 1.
    fn accepted_merge_proposal(fx: &Fixture) {
        let mut data = BTreeMap::new();
        data.insert(action_data::BASE_BRANCH.to_string(), b"master".to_vec());
        data.insert(action_data::BASE_BRANCH_HASH.to_string(), hash_of(1).into_bytes());
        data.insert(action_data::TARGET_BRANCH.to_string(), b"feature".to_vec());
        data.insert(action_data::TARGET_COMMIT_HASH.to_string(), hash_of(3).into_bytes());
        let proposal = RepoProposal {
            action: ProposalAction::MergeRequest,
            creator: fx.pusher.address,
            outcome: ProposalOutcome::Accepted,
            action_data: data,
            finalized: true,
        };

        fx.logic.update_repo("repo1", |r| {
            r.proposals.insert("MR1".into(), proposal.clone());
        });
        fx.repo.update_state(|r| {
            r.proposals.insert("MR1".into(), proposal);
        });
    }

    // =============================================================================
    // BRANCH PUSH LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_branch_push_end_to_end() {
        let fx = Fixture::new();
        let object = random_object(128);
        let dht = Arc::new(MemDht::new());
        dht.insert(&make_repo_object_dht_key("repo1", &hash_of(20)), object.clone());
        let svc = service(&fx, dht.clone());

        let mut note = fx.master_push_note();
        note.references[0].objects = vec![hash_of(20)];
        note.size = object.len() as u64;
        fx.sign_note(&mut note);

        // Arrival
        svc.check_push_note(&note, Some(&fx.repo)).unwrap();

        // Objects
        svc.fetch_and_check_reference_objects(&note, &fx.repo)
            .await
            .unwrap();
        assert_eq!(dht.calls(), 1);
        assert_eq!(fx.repo.blob(&hash_of(20)).unwrap(), object);

        // Apply, then admit
        fx.repo.set_ref(Fixture::MASTER, &hash_of(2));
        let outcome = svc.validate_push(&note, &fx.repo).await.unwrap();
        assert_eq!(outcome.note_id, note.id());
        assert_eq!(outcome.references[0].detail.nonce, 1);

        // The local copy has moved on; the old hash no longer matches
        assert!(svc.check_push_note(&note, Some(&fx.repo)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_dht_times_out() {
        let mut fx = Fixture::new();
        fx.config.object_fetch_timeout = Duration::from_secs(5);
        let dht = Arc::new(MemDht::new().with_delay(Duration::from_secs(30)));
        dht.insert(&make_repo_object_dht_key("repo1", &hash_of(20)), random_object(8));
        let svc = service(&fx, dht);

        let mut note = fx.master_push_note();
        note.references[0].objects = vec![hash_of(20)];
        note.size = 8;

        let err = svc
            .fetch_and_check_reference_objects(&note, &fx.repo)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "dht");
        assert!(fx.repo.object_size(&hash_of(20)).is_err());
    }

    #[tokio::test]
    async fn test_replayed_note_fails_after_ledger_moves() {
        let fx = Fixture::new();
        let svc = service(&fx, Arc::new(MemDht::new()));
        let note = fx.master_push_note();
        fx.repo.set_ref(Fixture::MASTER, &hash_of(2));
        svc.validate_push(&note, &fx.repo).await.unwrap();

        // Ledger records the push
        fx.logic.update_repo("repo1", |r| {
            if let Some(master) = r.references.get_mut(Fixture::MASTER) {
                master.nonce = 2;
                master.hash = hash_of(2);
            }
        });

        let err = svc.validate_push(&note, &fx.repo).await.unwrap_err();
        let field = err.as_field().cloned().expect("field error");
        assert_eq!(field.field, "references");
        assert_eq!(field.index, Some(0));
    }

    // =============================================================================
    // MERGE PUSH
    // =============================================================================

    #[tokio::test]
    async fn test_merge_push_lands_accepted_proposal() {
        let fx = Fixture::new();
        let svc = service(&fx, Arc::new(MemDht::new()));
        accepted_merge_proposal(&fx);

        fx.repo.add_commit(commit(&hash_of(3), &[&hash_of(1)]));
        fx.repo.add_commit(commit(&hash_of(4), &[&hash_of(1), &hash_of(3)]));

        let mut merge = fx.pushed_ref(Fixture::MASTER, &hash_of(1), &hash_of(4), 2);
        merge.merge_proposal_id = Some("1".into());
        let note = fx.push_note(vec![merge]);

        svc.check_push_note(&note, Some(&fx.repo)).unwrap();
        fx.repo.set_ref(Fixture::MASTER, &hash_of(4));
        let outcome = svc.validate_push(&note, &fx.repo).await.unwrap();
        assert_eq!(
            outcome.references[0].detail.merge_proposal_id.as_deref(),
            Some("1")
        );

        fx.logic.close_proposal("repo1", "MR1");
        assert!(matches!(
            svc.validate_push(&note, &fx.repo).await,
            Err(ValidationError::Merge(MergeError::ProposalClosed))
        ));
    }

    #[tokio::test]
    async fn test_merge_push_with_unrelated_commit_rejected() {
        let fx = Fixture::new();
        let svc = service(&fx, Arc::new(MemDht::new()));
        accepted_merge_proposal(&fx);

        fx.repo.add_commit(commit(&hash_of(3), &[&hash_of(1)]));
        fx.repo.add_commit(commit(&hash_of(5), &[&hash_of(1), &hash_of(2)]));

        let mut merge = fx.pushed_ref(Fixture::MASTER, &hash_of(1), &hash_of(5), 2);
        merge.merge_proposal_id = Some("1".into());
        let note = fx.push_note(vec![merge]);
        fx.repo.set_ref(Fixture::MASTER, &hash_of(5));

        assert!(matches!(
            svc.validate_push(&note, &fx.repo).await,
            Err(ValidationError::Merge(MergeError::TargetParentNotFound))
        ));
    }

    // =============================================================================
    // ENDORSEMENT
    // =============================================================================

    #[test]
    fn test_endorsement_quorum_from_top_hosts() {
        let mut fx = Fixture::new();
        fx.config.num_top_hosts = 2;
        let svc = service(&fx, Arc::new(MemDht::new()));

        let hosts: Vec<Host> = (10..13).map(Host::new).collect();
        for host in &hosts {
            fx.logic.add_host(host.ticket());
        }

        let note = fx.master_push_note();
        let refs = vec![EndorsedReference {
            hash: hex::decode(hash_of(1)).unwrap_or_default(),
        }];

        let accepted = hosts
            .iter()
            .map(|h| h.endorse(note.id(), refs.clone()))
            .filter(|e| svc.check_endorsement(e).is_ok())
            .count();
        assert_eq!(accepted, 2);

        let embedded = vec![hosts[0].embedded(refs), hosts[1].embedded(vec![])];
        svc.check_note_endorsements(&embedded).unwrap();

        let outsider = vec![hosts[2].embedded(vec![EndorsedReference::default()])];
        let err = svc.check_note_endorsements(&outsider).unwrap_err();
        assert_eq!(err.as_field().and_then(|f| f.index), Some(0));
    }
}
