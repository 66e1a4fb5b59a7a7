//! # Post Threads
//!
//! Issues and merge requests are git references whose commits each carry a
//! `body` file. A thread grows one push at a time; between pushes the ledger
//! records the new reference state and the pusher's account nonce.

#[cfg(test)]
mod tests {
    use fc_01_push_validation::test_utils::{
        commit, hash_of, FixedTimeSource, Fixture, MemDht, MemLogic,
    };
    use fc_01_push_validation::{
        LocalRepo, PushOutcome, PushValidationApi, PushValidationService, ValidationError, ValidationResult,
    };
    use shared_types::{
        Account, ProposalAction, ProposalOutcome, PushNote, PushedReference, Reference,
        RepoProposal, ZERO_HASH,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    const ISSUE: &str = "refs/heads/issues/1";
    const MERGE_REQUEST: &str = "refs/heads/merges/1";

    /// Tracks what the ledger has recorded between pushes.
    struct Thread {
        fx: Fixture,
        svc: PushValidationService<MemLogic, MemDht>,
        account_nonce: u64,
    }

    impl Thread {
        fn new() -> Self {
            let fx = Fixture::new();
            let svc = PushValidationService::new(
                fx.logic.clone(),
                Arc::new(MemDht::new()),
                fx.config.clone(),
            )
            .with_time_source(Box::new(FixedTimeSource::new(fx.now)));
            Self {
                fx,
                svc,
                account_nonce: 0,
            }
        }

        fn tip(&self, name: &str) -> (String, u64) {
            let state = self.fx.repo.state();
            match state.references.get(name) {
                Some(r) => (r.hash.clone(), r.nonce),
                None => (ZERO_HASH.to_string(), 0),
            }
        }

        fn note(&self, change: PushedReference) -> PushNote {
            let mut note = self.fx.push_note(vec![change]);
            note.pusher_account_nonce = self.account_nonce + 1;
            self.fx.pusher.sign_references(&mut note);
            self.fx.sign_note(&mut note);
            note
        }

        /// Commit `body` on top of `name` and push it.
        async fn post(&self, name: &str, n: u64, body: &str) -> ValidationResult<PushOutcome> {
            let (old, nonce) = self.tip(name);
            let parents: Vec<&str> = if nonce == 0 { vec![] } else { vec![old.as_str()] };
            self.fx.repo.add_post_commit(&hash_of(n), &parents, body);

            let note = self.note(self.fx.pushed_ref(name, &old, &hash_of(n), nonce + 1));
            self.svc.check_push_note(&note, Some(&self.fx.repo))?;

            self.fx.repo.set_ref(name, &hash_of(n));
            let result = self.svc.validate_push(&note, &self.fx.repo).await;
            if result.is_err() && nonce > 0 {
                self.fx.repo.set_ref(name, &old);
            }
            result
        }

        /// Record an accepted push the way the ledger would.
        fn record(&mut self, name: &str, outcome: &PushOutcome) {
            let (_, nonce) = self.tip(name);
            let hash = outcome.references[0].detail.head.clone().unwrap_or_default();
            let closed = outcome.references[0]
                .post
                .as_ref()
                .and_then(|p| p.data.close);

            let update = |r: &mut shared_types::Repository| {
                let entry = r.references.entry(name.to_string()).or_insert_with(Reference::default);
                entry.nonce = nonce + 1;
                entry.hash = hash.clone();
                if let Some(closed) = closed {
                    entry.data.closed = closed;
                }
            };
            self.fx.logic.update_repo("repo1", &update);
            self.fx.repo.update_state(&update);

            self.account_nonce += 1;
            self.fx.logic.add_account(
                self.fx.pusher.address,
                Account {
                    balance: "100".parse().unwrap(),
                    nonce: self.account_nonce,
                },
            );
        }
    }

    // =============================================================================
    // ISSUES
    // =============================================================================

    #[tokio::test]
    async fn test_issue_thread_open_reply_close_reopen() {
        let mut t = Thread::new();

        let opened = t
            .post(ISSUE, 10, "---\ntitle: Crash on start\nlabels: [bug]\n---\nIt panics")
            .await
            .unwrap();
        let post = opened.references[0].post.clone().unwrap();
        assert!(post.requires_admin_policy);
        assert_eq!(post.data.labels, Some(vec!["bug".to_string()]));
        t.record(ISSUE, &opened);

        let reply = format!("---\nreplyTo: \"{}\"\n---\nSame here", hash_of(10));
        let replied = t.post(ISSUE, 11, &reply).await.unwrap();
        assert!(!replied.references[0].post.as_ref().unwrap().requires_admin_policy);
        t.record(ISSUE, &replied);

        let closed = t.post(ISSUE, 12, "---\nclose: true\n---\n").await.unwrap();
        assert_eq!(closed.references[0].post.as_ref().unwrap().data.close, Some(true));
        t.record(ISSUE, &closed);

        assert!(matches!(
            t.post(ISSUE, 13, "---\n---\nping").await,
            Err(ValidationError::CannotWriteToClosedRef)
        ));

        let reopened = t
            .post(ISSUE, 14, "---\nclose: false\n---\nFound another case")
            .await
            .unwrap();
        t.record(ISSUE, &reopened);
        assert!(!t.fx.repo.state().references[ISSUE].data.closed);
    }

    #[tokio::test]
    async fn test_issue_body_rules_enforced_on_push() {
        let t = Thread::new();

        let err = t.post(ISSUE, 10, "---\n---\nno title").await.unwrap_err();
        assert_eq!(err.as_field().map(|f| f.msg.as_str()), Some("title is required"));

        let err = t
            .post(ISSUE, 11, "---\ntitle: Hi\nreactions: [not_an_emoji]\n---\nbody")
            .await
            .unwrap_err();
        assert_eq!(err.as_field().map(|f| f.field.as_str()), Some("reactions"));
    }

    // =============================================================================
    // MERGE REQUESTS
    // =============================================================================

    #[tokio::test]
    async fn test_merge_request_thread_freezes_after_finalization() {
        let mut t = Thread::new();
        t.fx.repo.add_commit(commit(&hash_of(3), &[&hash_of(1)]));
        let feature = Reference {
            nonce: 1,
            hash: hash_of(3),
            ..Default::default()
        };
        t.fx.logic.update_repo("repo1", |r| {
            r.references.insert("refs/heads/feature".into(), feature.clone());
        });
        t.fx.repo.update_state(|r| {
            r.references.insert("refs/heads/feature".into(), feature);
        });

        let body = format!(
            "---\ntitle: Add feature\nbase: master\nbaseHash: \"{}\"\ntarget: feature\ntargetHash: \"{}\"\n---\nPlease merge",
            hash_of(1),
            hash_of(3)
        );
        let opened = t.post(MERGE_REQUEST, 20, &body).await.unwrap();
        let post = opened.references[0].post.clone().unwrap();
        assert_eq!(post.data.base_branch.as_deref(), Some("master"));
        assert_eq!(post.data.target_branch_hash, Some(hash_of(3)));
        t.record(MERGE_REQUEST, &opened);

        // Governance finalizes the proposal
        t.fx.repo.update_state(|r| {
            r.proposals.insert(
                "MR1".into(),
                RepoProposal {
                    action: ProposalAction::MergeRequest,
                    creator: t.fx.pusher.address,
                    outcome: ProposalOutcome::Accepted,
                    action_data: BTreeMap::new(),
                    finalized: true,
                },
            );
        });

        let comment = t.post(MERGE_REQUEST, 21, "---\n---\nLGTM").await.unwrap();
        t.record(MERGE_REQUEST, &comment);

        let retarget = format!("---\ntargetHash: \"{}\"\n---\n", hash_of(2));
        let err = t.post(MERGE_REQUEST, 22, &retarget).await.unwrap_err();
        let field = err.as_field().cloned().expect("field error");
        assert_eq!(field.field, "targetHash");
        assert_eq!(field.msg, "not allowed when the merge request proposal is finalized");
    }

    #[tokio::test]
    async fn test_merge_request_against_stale_base_rejected() {
        let t = Thread::new();
        let body = format!(
            "---\ntitle: Stale\nbase: master\nbaseHash: \"{}\"\ntarget: master\ntargetHash: \"{}\"\n---\nx",
            hash_of(2),
            hash_of(1)
        );
        let err = t.post(MERGE_REQUEST, 20, &body).await.unwrap_err();
        let field = err.as_field().cloned().expect("field error");
        assert_eq!(field.field, "baseHash");
        assert_eq!(field.msg, "hash is not the same as the current hash of base branch");
    }
}
