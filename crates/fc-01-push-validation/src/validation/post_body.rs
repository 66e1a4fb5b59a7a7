//! Post body rules for issues and merge requests.

use crate::config::ValidationConfig;
use crate::domain::emoji::is_known_emoji;
use crate::domain::errors::{field_err, field_err_at, PostCommitError, ValidationError, ValidationResult};
use crate::domain::front_matter::{
    PostFrontMatter, PostKind, FIELD_BASE, FIELD_BASE_HASH, FIELD_TARGET, FIELD_TARGET_HASH,
};
use crate::domain::git::Commit;
use crate::domain::names::{is_valid_hash, is_valid_name, is_valid_push_key_id};
use crate::domain::reference::{make_branch_name, make_merge_request_proposal_id, post_id};
use crate::ports::outbound::{LocalRepo, Logic};
use shared_types::Repository;

/// Reply targets may be abbreviated down to this many characters.
const MIN_REPLY_TO_LEN: usize = 4;
const MAX_REPLY_TO_LEN: usize = 40;

/// One post commit's decoded body and where it sits.
#[derive(Debug, Clone, Copy)]
pub struct PostBody<'a> {
    pub reference: &'a str,
    pub kind: PostKind,
    pub commit: &'a Commit,
    /// First commit of a post that does not exist yet.
    pub is_new: bool,
    pub front_matter: &'a PostFrontMatter,
    pub content: &'a str,
}

/// Apply every body rule for the post's kind, content last.
pub fn check_post_body(
    config: &ValidationConfig,
    repo: &dyn LocalRepo,
    logic: &dyn Logic,
    body: &PostBody<'_>,
) -> ValidationResult<()> {
    check_common_post_body(config, repo, body)?;

    match body.kind {
        PostKind::Issue => check_issue_post_body(config, body.front_matter)?,
        PostKind::MergeRequest => {
            check_merge_request_post_body_sanity(body.front_matter, body.is_new)?;
            check_merge_request_post_body_consistency(
                repo,
                logic,
                body.reference,
                body.is_new,
                body.front_matter,
            )?;
        }
    }

    check_post_content(config, body.is_new, body.content)
}

/// Reply, title and reaction rules shared by all posts.
pub fn check_common_post_body(
    config: &ValidationConfig,
    repo: &dyn LocalRepo,
    body: &PostBody<'_>,
) -> ValidationResult<()> {
    let fm = body.front_matter;

    let reply_to = fm.reply_to();
    if !reply_to.is_empty() {
        if body.is_new {
            return field_err("replyTo", "not expected in a new post");
        }
        if !(MIN_REPLY_TO_LEN..=MAX_REPLY_TO_LEN).contains(&reply_to.len()) {
            return field_err("replyTo", "invalid hash value");
        }
        // Unresolvable hashes are simply not known ancestors
        if !matches!(repo.is_ancestor(reply_to, &body.commit.hash), Ok(true)) {
            return field_err("replyTo", "hash is not a known ancestor");
        }
    }

    let title = fm.title();
    if body.is_new && title.is_empty() {
        return field_err("title", "title is required");
    }
    if !reply_to.is_empty() && !title.is_empty() {
        return field_err("title", "title is not required when replying");
    }
    if title.chars().count() > config.max_title_len {
        return field_err(
            "title",
            format!("title is too long and cannot exceed {} characters", config.max_title_len),
        );
    }

    if let Some(reactions) = &fm.reactions {
        if reactions.len() > config.max_list_len {
            return field_err(
                "reactions",
                format!("too many reactions. Cannot exceed {}", config.max_list_len),
            );
        }
        for (i, reaction) in reactions.iter().enumerate() {
            let code = reaction.strip_prefix('-').unwrap_or(reaction);
            if !is_known_emoji(code) {
                return field_err_at(Some(i), "reactions", format!("reaction '{}' is not supported", reaction));
            }
        }
    }

    Ok(())
}

/// Label and assignee rules. A leading `-` requests removal.
pub fn check_issue_post_body(config: &ValidationConfig, fm: &PostFrontMatter) -> ValidationResult<()> {
    if let Some(labels) = &fm.labels {
        if labels.len() > config.max_list_len {
            return field_err(
                "labels",
                format!("too many labels. Cannot exceed {}", config.max_list_len),
            );
        }
        for (i, label) in labels.iter().enumerate() {
            if !is_valid_name(label.strip_prefix('-').unwrap_or(label)) {
                return field_err_at(Some(i), "labels", "label name is not valid");
            }
        }
    }

    if let Some(assignees) = &fm.assignees {
        if assignees.len() > config.max_list_len {
            return field_err(
                "assignees",
                format!("too many assignees. Cannot exceed {}", config.max_list_len),
            );
        }
        for (i, assignee) in assignees.iter().enumerate() {
            if !is_valid_push_key_id(assignee.strip_prefix('-').unwrap_or(assignee)) {
                return field_err_at(Some(i), "assignees", "invalid push key ID");
            }
        }
    }

    Ok(())
}

/// Merge-request fields required on a new post and hash syntax.
pub fn check_merge_request_post_body_sanity(
    fm: &PostFrontMatter,
    is_new: bool,
) -> ValidationResult<()> {
    let unset = |v: &Option<String>| v.as_deref().map_or(true, str::is_empty);

    if is_new && unset(&fm.base) {
        return field_err(FIELD_BASE, "base branch name is required");
    }
    if is_new && unset(&fm.base_hash) {
        return field_err(FIELD_BASE_HASH, "base branch hash is required");
    }
    if !unset(&fm.base_hash) && !is_valid_hash(fm.base_hash.as_deref().unwrap_or_default()) {
        return field_err(FIELD_BASE_HASH, "base branch hash is not valid");
    }

    if is_new && unset(&fm.target) {
        return field_err(FIELD_TARGET, "target branch name is required");
    }
    if is_new && unset(&fm.target_hash) {
        return field_err(FIELD_TARGET_HASH, "target branch hash is required");
    }
    if !unset(&fm.target_hash) && !is_valid_hash(fm.target_hash.as_deref().unwrap_or_default()) {
        return field_err(FIELD_TARGET_HASH, "target branch hash is not valid");
    }

    Ok(())
}

/// Merge-request fields against proposal and branch state.
///
/// `target` may name a branch of another repository as `/<repo>/<branch>`.
pub fn check_merge_request_post_body_consistency(
    repo: &dyn LocalRepo,
    logic: &dyn Logic,
    reference: &str,
    is_new: bool,
    fm: &PostFrontMatter,
) -> ValidationResult<()> {
    let state = repo.state();

    if !is_new {
        let id = post_id(reference).ok_or(PostCommitError::InvalidPostId)?;
        let Some(proposal) = state.proposals.get(&make_merge_request_proposal_id(id)) else {
            return field_err("id", "merge request proposal not found");
        };
        if proposal.finalized {
            let supplied = [
                (FIELD_BASE, &fm.base),
                (FIELD_BASE_HASH, &fm.base_hash),
                (FIELD_TARGET, &fm.target),
                (FIELD_TARGET_HASH, &fm.target_hash),
            ]
            .into_iter()
            .find(|(_, v)| v.is_some());
            if let Some((field, _)) = supplied {
                return field_err(field, "not allowed when the merge request proposal is finalized");
            }
        }
    }

    if let Some(base) = fm.base.as_deref().filter(|b| !b.is_empty()) {
        let Some(base_ref) = state.references.get(&make_branch_name(base)) else {
            return field_err(FIELD_BASE, "base branch is unknown");
        };
        if let Some(hash) = fm.base_hash.as_deref().filter(|h| !h.is_empty()) {
            if hash != base_ref.hash {
                return field_err(
                    FIELD_BASE_HASH,
                    "hash is not the same as the current hash of base branch",
                );
            }
        }
    }

    if let Some(target) = fm.target.as_deref().filter(|t| !t.is_empty()) {
        let other_repo: Repository;
        let (target_state, branch) = match target.strip_prefix('/') {
            Some(path) => {
                let Some((repo_name, branch)) = path
                    .split_once('/')
                    .filter(|(r, b)| !r.is_empty() && !b.is_empty())
                else {
                    return field_err(FIELD_TARGET, "target path is not valid");
                };
                // Only the fork's references are read
                other_repo = match logic
                    .repo_keeper()
                    .get_no_populate(repo_name)
                    .map_err(|e| ValidationError::ledger("failed to get target repository", e))?
                {
                    Some(r) => r,
                    None => return field_err(FIELD_TARGET, "target repository not found"),
                };
                (&other_repo, branch)
            }
            None => (&state, target),
        };

        let Some(target_ref) = target_state.references.get(&make_branch_name(branch)) else {
            return field_err(FIELD_TARGET, "target branch is unknown");
        };
        if let Some(hash) = fm.target_hash.as_deref().filter(|h| !h.is_empty()) {
            if hash != target_ref.hash {
                return field_err(
                    FIELD_TARGET_HASH,
                    "hash is not the same as the current hash of target branch",
                );
            }
        }
    }

    Ok(())
}

/// Content is required on a new post and bounded in size.
pub fn check_post_content(
    config: &ValidationConfig,
    is_new: bool,
    content: &str,
) -> ValidationResult<()> {
    if is_new && content.is_empty() {
        return field_err("content", "post content is required");
    }
    if content.len() > config.max_content_len {
        return field_err(
            "content",
            format!(
                "post content length exceeded. Max: {}kb",
                config.max_content_len / 1024
            ),
        );
    }
    Ok(())
}
