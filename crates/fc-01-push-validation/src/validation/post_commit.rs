//! Post reference replay.
//!
//! Every commit added to an issue or merge-request reference is checked in
//! chronological order. Each step carries a [`ReplayState`] forward so the
//! rules that depend on history (orphan first commit, no rewrites) see the
//! commit that precedes it.

use crate::config::ValidationConfig;
use crate::domain::errors::{PostCommitError, ValidationError, ValidationResult};
use crate::domain::front_matter::{PostDocument, PostFrontMatter, PostKind};
use crate::domain::git::Commit;
use crate::domain::outcome::{PostData, PostOutcome};
use crate::domain::reference::{post_id, ReferenceKind};
use crate::ports::outbound::{LocalRepo, Logic};
use crate::validation::change::check_commit;
use crate::validation::post_body::{check_post_body, PostBody};
use shared_types::{PushedReference, TxDetail};
use tracing::debug;

/// Name of the single file a post commit tree carries.
pub const POST_BODY_FILE: &str = "body";

/// Position of the replay within a post's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayState {
    /// The next commit starts a post that does not exist yet.
    pub is_new: bool,
    /// Hash of the commit preceding the next one.
    pub old_hash: String,
}

impl ReplayState {
    /// State before the first commit of `change` is replayed.
    pub fn start(change: &PushedReference) -> Self {
        Self {
            is_new: change.is_new(),
            old_hash: change.old_hash.clone(),
        }
    }

    /// State after `commit` has been accepted.
    pub fn advance(&self, commit: &Commit) -> Self {
        Self {
            is_new: false,
            old_hash: commit.hash.clone(),
        }
    }
}

/// Check one post commit and return its decoded front matter.
pub fn check_post_commit(
    config: &ValidationConfig,
    repo: &dyn LocalRepo,
    logic: &dyn Logic,
    reference: &str,
    commit: &Commit,
    state: &ReplayState,
) -> ValidationResult<PostFrontMatter> {
    let kind = match ReferenceKind::of(reference) {
        Some(ReferenceKind::MergeRequestPost) => PostKind::MergeRequest,
        _ => PostKind::Issue,
    };
    if post_id(reference).is_none() {
        return Err(PostCommitError::InvalidPostId.into());
    }

    if commit.num_parents() > 1 {
        return Err(PostCommitError::MultipleParents.into());
    }
    if state.is_new && commit.num_parents() > 0 {
        return Err(PostCommitError::NotOrphan.into());
    }

    if !state.is_new {
        let extends = repo
            .is_ancestor(&state.old_hash, &commit.hash)
            .map_err(|e| ValidationError::git("failed to check post ancestry", e))?;
        if !extends {
            return Err(PostCommitError::AlteredHistory.into());
        }
    }

    let tree = repo
        .tree(&commit.tree_hash)
        .map_err(|e| ValidationError::git("unable to read post commit tree", e))?;
    let body_entry = match tree.entries.as_slice() {
        [entry] if entry.name == POST_BODY_FILE && entry.mode.is_file() => entry,
        _ => return Err(PostCommitError::MissingBody.into()),
    };
    let raw = repo
        .blob(&body_entry.hash)
        .map_err(|e| ValidationError::git("unable to read post body", e))?;

    let doc = PostDocument::parse(&raw).map_err(PostCommitError::MalformedBody)?;
    let front_matter = PostFrontMatter::decode(&doc.front_matter, kind)?;

    check_post_body(
        config,
        repo,
        logic,
        &PostBody {
            reference,
            kind,
            commit,
            is_new: state.is_new,
            front_matter: &front_matter,
            content: &doc.content,
        },
    )?;

    Ok(front_matter)
}

/// Replay the commits a push adds to a post reference and derive the
/// outcome from the newest one.
pub fn validate_post_commit(
    config: &ValidationConfig,
    repo: &dyn LocalRepo,
    logic: &dyn Logic,
    change: &PushedReference,
    detail: &TxDetail,
) -> ValidationResult<PostOutcome> {
    let has_merges = repo
        .has_merge_commits(&change.name)
        .map_err(|e| ValidationError::git("failed to check post history", e))?;
    if has_merges {
        return Err(PostCommitError::HasMergeCommit.into());
    }

    let tip = repo
        .commit_object(&change.new_hash)
        .map_err(|e| ValidationError::git("unable to get commit object", e))?;
    check_commit(&tip, detail)?;

    let ancestors = repo
        .ancestors(&tip, &change.old_hash, true)
        .map_err(|e| ValidationError::git("failed to get post commits", e))?;

    let state = ancestors
        .iter()
        .try_fold(ReplayState::start(change), |state, commit| {
            check_post_commit(config, repo, logic, &change.name, commit, &state)?;
            Ok::<_, ValidationError>(state.advance(commit))
        })?;
    let front_matter = check_post_commit(config, repo, logic, &change.name, &tip, &state)?;

    let closed = repo
        .state()
        .references
        .get(&change.name)
        .is_some_and(|r| r.data.closed);
    if closed && front_matter.close != Some(false) {
        return Err(ValidationError::CannotWriteToClosedRef);
    }

    let data = PostData::from(&front_matter);
    let requires_admin_policy = data.touches_admin_fields();
    debug!(
        reference = %change.name,
        commits = ancestors.len() + 1,
        requires_admin_policy,
        "post commits replayed"
    );

    Ok(PostOutcome {
        data,
        requires_admin_policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{hash_of, MemLogic, MemRepo};
    use shared_types::{Reference, ReferenceData, ZERO_HASH};

    const ISSUE: &str = "refs/heads/issues/1";

    fn change(name: &str, old: &str, new: &str) -> PushedReference {
        PushedReference {
            name: name.into(),
            old_hash: old.into(),
            new_hash: new.into(),
            nonce: 1,
            ..Default::default()
        }
    }

    fn detail(head: &str) -> TxDetail {
        TxDetail {
            head: Some(head.into()),
            ..Default::default()
        }
    }

    fn run(repo: &MemRepo, change: &PushedReference) -> ValidationResult<PostOutcome> {
        validate_post_commit(
            &ValidationConfig::default(),
            repo,
            &MemLogic::new(),
            change,
            &detail(&change.new_hash),
        )
    }

    #[test]
    fn test_new_issue_single_commit() {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: Crash on start\n---\nIt panics");

        let outcome = run(&repo, &change(ISSUE, ZERO_HASH, &hash_of(1))).unwrap();
        assert!(!outcome.requires_admin_policy);
        assert_eq!(outcome.data, PostData::default());
    }

    #[test]
    fn test_new_issue_multiple_commits_replayed_in_order() {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: Crash\n---\nIt panics");
        repo.add_post_commit(&hash_of(2), &[&hash_of(1)], "---\nlabels: [bug]\n---\n");

        let outcome = run(&repo, &change(ISSUE, ZERO_HASH, &hash_of(2))).unwrap();
        assert!(outcome.requires_admin_policy);
        assert_eq!(outcome.data.labels, Some(vec!["bug".to_string()]));
    }

    #[test]
    fn test_first_commit_of_new_post_must_be_orphan() {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: a\n---\nb");
        repo.add_post_commit(&hash_of(2), &[&hash_of(1)], "---\ntitle: a\n---\nb");

        let c = repo.commit(&hash_of(2));
        let state = ReplayState {
            is_new: true,
            old_hash: ZERO_HASH.into(),
        };
        let err = check_post_commit(&ValidationConfig::default(), &repo, &MemLogic::new(), ISSUE, &c, &state)
            .unwrap_err();
        assert!(matches!(err, ValidationError::PostCommit(PostCommitError::NotOrphan)));
    }

    #[test]
    fn test_merge_commit_rejected() {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: a\n---\nb");
        repo.add_post_commit(&hash_of(2), &[&hash_of(1)], "---\n---\nreply");
        repo.add_post_commit(&hash_of(3), &[&hash_of(1), &hash_of(2)], "---\n---\nc");
        repo.set_ref(ISSUE, &hash_of(1));

        let err = run(&repo, &change(ISSUE, &hash_of(1), &hash_of(3))).unwrap_err();
        assert!(matches!(err, ValidationError::PostCommit(PostCommitError::MultipleParents)));
    }

    #[test]
    fn test_existing_history_with_merge_rejected() {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: a\n---\nb");
        repo.add_post_commit(&hash_of(2), &[], "---\ntitle: a\n---\nb");
        repo.add_post_commit(&hash_of(3), &[&hash_of(1), &hash_of(2)], "---\n---\nc");
        repo.add_post_commit(&hash_of(4), &[&hash_of(3)], "---\n---\nd");
        repo.set_ref(ISSUE, &hash_of(3));

        let err = run(&repo, &change(ISSUE, &hash_of(3), &hash_of(4))).unwrap_err();
        assert!(matches!(err, ValidationError::PostCommit(PostCommitError::HasMergeCommit)));
    }

    #[test]
    fn test_rewritten_history_rejected() {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: a\n---\nb");
        repo.add_post_commit(&hash_of(5), &[], "---\ntitle: x\n---\ny");
        repo.add_post_commit(&hash_of(6), &[&hash_of(5)], "---\n---\nz");
        repo.set_ref(ISSUE, &hash_of(1));

        let err = run(&repo, &change(ISSUE, &hash_of(1), &hash_of(6))).unwrap_err();
        assert!(matches!(err, ValidationError::PostCommit(PostCommitError::AlteredHistory)));
    }

    #[test]
    fn test_tree_must_hold_only_body() {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: a\n---\nb");
        repo.add_tree_entry(&hash_of(1), "extra.txt", b"x");

        let err = run(&repo, &change(ISSUE, ZERO_HASH, &hash_of(1))).unwrap_err();
        assert!(matches!(err, ValidationError::PostCommit(PostCommitError::MissingBody)));
    }

    #[test]
    fn test_malformed_and_unexpected_front_matter() {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: [unterminated\n---\nb");
        let err = run(&repo, &change(ISSUE, ZERO_HASH, &hash_of(1))).unwrap_err();
        assert!(matches!(err, ValidationError::PostCommit(PostCommitError::MalformedBody(_))));

        repo.add_post_commit(&hash_of(2), &[], "---\ntitle: a\nbase: master\n---\nb");
        let err = run(&repo, &change(ISSUE, ZERO_HASH, &hash_of(2))).unwrap_err();
        assert_eq!(err.as_field().map(|f| f.msg.as_str()), Some("unexpected field"));
    }

    #[test]
    fn test_invalid_post_id() {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: a\n---\nb");
        let err = run(&repo, &change("refs/heads/issues/01", ZERO_HASH, &hash_of(1))).unwrap_err();
        assert!(matches!(err, ValidationError::PostCommit(PostCommitError::InvalidPostId)));
    }

    #[test]
    fn test_signed_head_must_match_tip() {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: a\n---\nb");
        let err = validate_post_commit(
            &ValidationConfig::default(),
            &repo,
            &MemLogic::new(),
            &change(ISSUE, ZERO_HASH, &hash_of(1)),
            &detail(&hash_of(2)),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::PushedAndSignedHeadMismatch));
    }

    #[test]
    fn test_closed_post_requires_reopen() {
        let repo = MemRepo::new("repo1");
        repo.add_post_commit(&hash_of(1), &[], "---\ntitle: a\n---\nb");
        repo.add_post_commit(&hash_of(2), &[&hash_of(1)], "---\n---\nmore");
        repo.add_post_commit(&hash_of(3), &[&hash_of(1)], "---\nclose: false\n---\nreopen");
        repo.add_post_commit(&hash_of(4), &[&hash_of(1)], "---\nclose: true\n---\nagain");
        repo.set_ref(ISSUE, &hash_of(1));
        repo.update_state(|s| {
            s.references.insert(
                ISSUE.into(),
                Reference {
                    nonce: 1,
                    hash: hash_of(1),
                    data: ReferenceData { closed: true, ..Default::default() },
                },
            );
        });

        let err = run(&repo, &change(ISSUE, &hash_of(1), &hash_of(2))).unwrap_err();
        assert!(matches!(err, ValidationError::CannotWriteToClosedRef));

        let err = run(&repo, &change(ISSUE, &hash_of(1), &hash_of(4))).unwrap_err();
        assert!(matches!(err, ValidationError::CannotWriteToClosedRef));

        let outcome = run(&repo, &change(ISSUE, &hash_of(1), &hash_of(3))).unwrap();
        assert_eq!(outcome.data.close, Some(false));
    }

    #[test]
    fn test_replay_state_advances() {
        let ch = change(ISSUE, ZERO_HASH, &hash_of(1));
        let start = ReplayState::start(&ch);
        assert!(start.is_new);

        let c = crate::test_utils::commit(&hash_of(1), &[]);
        let next = start.advance(&c);
        assert!(!next.is_new);
        assert_eq!(next.old_hash, hash_of(1));
    }
}
