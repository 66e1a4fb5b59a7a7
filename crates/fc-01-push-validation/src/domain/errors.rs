//! Error types for push validation
//!
//! Sanity and consistency failures are reported as [`FieldError`]s so callers
//! can relay per-field feedback to git clients. Failures that callers branch on
//! get dedicated variants.

use crate::ports::outbound::{DhtError, GitError, LedgerError};
use shared_crypto::CryptoError;
use std::fmt;

/// A rejection tied to one input field.
///
/// Renders as `field:"<name>"[,"index":"<n>"],"msg":"<text>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub index: Option<usize>,
    pub msg: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            index: None,
            msg: msg.into(),
        }
    }

    /// Field error qualified by a list index (omitted when `None`).
    pub fn at(index: Option<usize>, field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            index,
            msg: msg.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field:\"{}\"", self.field)?;
        if let Some(index) = self.index {
            write!(f, ",\"index\":\"{}\"", index)?;
        }
        write!(f, ",\"msg\":\"{}\"", self.msg)
    }
}

impl std::error::Error for FieldError {}

/// Rejections raised while replaying post commits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostCommitError {
    #[error("post's history must not include a merge commit")]
    HasMergeCommit,

    #[error("post number is not valid. Must be numeric")]
    InvalidPostId,

    #[error("first commit of a new post must have no parent")]
    NotOrphan,

    #[error("post commit must have at most one parent")]
    MultipleParents,

    #[error("post commit must not alter history")]
    AlteredHistory,

    #[error("post commit must have a 'body' file")]
    MissingBody,

    #[error("failed to read post body: {0}")]
    MalformedBody(String),
}

/// Rejections raised by merge compliance checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("pushed reference must be a branch")]
    NotBranch,

    #[error("merge proposal ({0}) not found")]
    ProposalNotFound(String),

    #[error("push key owner did not create the proposal")]
    NotCreator,

    #[error("target merge proposal was already closed")]
    ProposalClosed,

    #[error("pushed branch name and proposal base branch name must match")]
    BaseMismatch,

    #[error("target merge proposal is undecided")]
    Undecided,

    #[error("target merge proposal was not accepted")]
    NotAccepted,

    #[error("unable to find parent that matches the target commit hash")]
    TargetParentNotFound,

    #[error("pushed commit content and target commit content do not match")]
    TreeMismatch,

    #[error("pushed commit author and target commit author must match")]
    AuthorMismatch,

    #[error("pushed commit committer and target commit committer must match")]
    CommitterMismatch,

    #[error("target merge proposal base branch hash is stale or invalid")]
    StaleBaseHash,

    #[error("target commit hash and the merge proposal target hash must match")]
    TargetHashMismatch,
}

/// Push validation error types
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{0}")]
    Field(#[from] FieldError),

    #[error("pushed object hash differs from signed head hash")]
    PushedAndSignedHeadMismatch,

    #[error("cannot write to a closed reference")]
    CannotWriteToClosedRef,

    #[error("current note hash differs from signed note hash")]
    NoteHashMismatch,

    #[error("unrecognised change item: {0}")]
    UnrecognisedChange(String),

    #[error(transparent)]
    PostCommit(#[from] PostCommitError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("failed to decode bls public key of endorser: {0}")]
    InvalidEndorserBlsKey(CryptoError),

    #[error("{context}: {source}")]
    Git {
        context: String,
        #[source]
        source: GitError,
    },

    #[error("{context}: {source}")]
    Ledger {
        context: String,
        #[source]
        source: LedgerError,
    },

    #[error("{context}: {source}")]
    Dht {
        context: String,
        #[source]
        source: DhtError,
    },

    /// Dry-run transfer failure, propagated verbatim.
    #[error(transparent)]
    Balance(LedgerError),
}

impl ValidationError {
    pub fn git(context: impl Into<String>, source: GitError) -> Self {
        Self::Git {
            context: context.into(),
            source,
        }
    }

    pub fn ledger(context: impl Into<String>, source: LedgerError) -> Self {
        Self::Ledger {
            context: context.into(),
            source,
        }
    }

    pub fn dht(context: impl Into<String>, source: DhtError) -> Self {
        Self::Dht {
            context: context.into(),
            source,
        }
    }

    /// The field error, if this is one.
    pub fn as_field(&self) -> Option<&FieldError> {
        match self {
            Self::Field(e) => Some(e),
            _ => None,
        }
    }

    /// Short label used for rejection metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Field(_) => "field",
            Self::PushedAndSignedHeadMismatch => "head_mismatch",
            Self::CannotWriteToClosedRef => "closed_ref",
            Self::NoteHashMismatch => "note_hash_mismatch",
            Self::UnrecognisedChange(_) => "unrecognised_change",
            Self::PostCommit(_) => "post_commit",
            Self::Merge(_) => "merge",
            Self::InvalidEndorserBlsKey(_) => "bls_key",
            Self::Git { .. } => "git",
            Self::Ledger { .. } => "ledger",
            Self::Dht { .. } => "dht",
            Self::Balance(_) => "balance",
        }
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Shorthand for an `Err(ValidationError::Field(..))` without an index.
pub(crate) fn field_err<T>(field: &str, msg: impl Into<String>) -> ValidationResult<T> {
    Err(FieldError::new(field, msg).into())
}

/// Shorthand for an index-qualified field error.
pub(crate) fn field_err_at<T>(
    index: Option<usize>,
    field: &str,
    msg: impl Into<String>,
) -> ValidationResult<T> {
    Err(FieldError::at(index, field, msg).into())
}
