//! Values returned by successful validation.

use super::front_matter::PostFrontMatter;
use serde::{Deserialize, Serialize};
use shared_types::{Hash, TxDetail};

/// Post-body fields derived from the tip commit of a post push.
///
/// The caller applies these to the reference once the push is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostData {
    pub close: Option<bool>,
    pub labels: Option<Vec<String>>,
    pub assignees: Option<Vec<String>>,
    pub base_branch: Option<String>,
    pub base_branch_hash: Option<String>,
    pub target_branch: Option<String>,
    pub target_branch_hash: Option<String>,
}

impl From<&PostFrontMatter> for PostData {
    fn from(fm: &PostFrontMatter) -> Self {
        Self {
            close: fm.close,
            labels: fm.labels.clone(),
            assignees: fm.assignees.clone(),
            base_branch: fm.base.clone(),
            base_branch_hash: fm.base_hash.clone(),
            target_branch: fm.target.clone(),
            target_branch_hash: fm.target_hash.clone(),
        }
    }
}

impl PostData {
    /// Fields only repository admins may change.
    pub fn touches_admin_fields(&self) -> bool {
        self.labels.is_some()
            || self.assignees.is_some()
            || self.base_branch.is_some()
            || self.base_branch_hash.is_some()
            || self.target_branch.is_some()
            || self.target_branch_hash.is_some()
    }
}

/// Result of replaying a post push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOutcome {
    pub data: PostData,
    /// Set when the caller must consult the repository's admin update policy.
    pub requires_admin_policy: bool,
}

/// One accepted reference of a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedReference {
    pub detail: TxDetail,
    pub post: Option<PostOutcome>,
}

/// Result of a fully validated push note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOutcome {
    pub note_id: Hash,
    pub references: Vec<ValidatedReference>,
}
