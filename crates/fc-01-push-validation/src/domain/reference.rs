//! Reference kinds and naming conventions.
//!
//! | Prefix | Kind |
//! |--------|------|
//! | `refs/heads/issues/<n>` | [`ReferenceKind::IssuePost`] |
//! | `refs/heads/merges/<n>` | [`ReferenceKind::MergeRequestPost`] |
//! | `refs/heads/` | [`ReferenceKind::Branch`] |
//! | `refs/tags/` | [`ReferenceKind::Tag`] |
//! | `refs/notes/` | [`ReferenceKind::Note`] |

use lazy_static::lazy_static;
use regex::Regex;

pub const BRANCH_PREFIX: &str = "refs/heads/";
pub const TAG_PREFIX: &str = "refs/tags/";
pub const NOTE_PREFIX: &str = "refs/notes/";
pub const ISSUE_PREFIX: &str = "refs/heads/issues/";
pub const MERGE_REQUEST_PREFIX: &str = "refs/heads/merges/";

/// Proposal IDs of merge requests are this prefix plus the post number.
pub const MERGE_REQUEST_PROPOSAL_PREFIX: &str = "MR";

lazy_static! {
    static ref POST_ID_RE: Regex = Regex::new(r"^[1-9][0-9]*$").expect("static regex");
}

/// What a reference name designates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Branch,
    Tag,
    Note,
    IssuePost,
    MergeRequestPost,
}

impl ReferenceKind {
    /// Classify a full reference name; `None` when it is not a known kind.
    pub fn of(name: &str) -> Option<Self> {
        if name.starts_with(ISSUE_PREFIX) {
            Some(Self::IssuePost)
        } else if name.starts_with(MERGE_REQUEST_PREFIX) {
            Some(Self::MergeRequestPost)
        } else if name.starts_with(BRANCH_PREFIX) {
            Some(Self::Branch)
        } else if name.starts_with(TAG_PREFIX) {
            Some(Self::Tag)
        } else if name.starts_with(NOTE_PREFIX) {
            Some(Self::Note)
        } else {
            None
        }
    }
}

pub fn is_merge_request_reference(name: &str) -> bool {
    ReferenceKind::of(name) == Some(ReferenceKind::MergeRequestPost)
}

/// Numeric post ID of an issue or merge-request reference.
pub fn post_id(name: &str) -> Option<u64> {
    let id = name
        .strip_prefix(ISSUE_PREFIX)
        .or_else(|| name.strip_prefix(MERGE_REQUEST_PREFIX))?;
    if !POST_ID_RE.is_match(id) {
        return None;
    }
    id.parse().ok()
}

/// Reference name without its `refs/<kind>/` prefix.
pub fn short_name(name: &str) -> &str {
    [BRANCH_PREFIX, TAG_PREFIX, NOTE_PREFIX]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}

pub fn make_branch_name(short: &str) -> String {
    format!("{}{}", BRANCH_PREFIX, short)
}

pub fn make_merge_request_proposal_id(id: impl std::fmt::Display) -> String {
    format!("{}{}", MERGE_REQUEST_PROPOSAL_PREFIX, id)
}
