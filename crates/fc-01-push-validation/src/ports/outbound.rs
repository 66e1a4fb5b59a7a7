//! Driven ports (Outbound dependencies)
//!
//! The validator owns no storage. Git objects, ledger state, the host set and
//! remote objects are read through these traits.

use crate::domain::errors::FieldError;
use crate::domain::git::{Commit, Tag, Tree};
use async_trait::async_trait;
use shared_types::{
    Account, Address, Amount, BlockInfo, Namespace, PushKey, PushKeyId, Repository,
    SelectedTicket,
};
use thiserror::Error;

// =============================================================================
// GIT
// =============================================================================

/// Errors from the local git store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitError {
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("git: {0}")]
    Other(String),
}

/// A local working copy of a repository.
pub trait LocalRepo: Send + Sync {
    /// Repository name.
    fn name(&self) -> &str;

    /// On-chain state snapshot of this repository.
    fn state(&self) -> Repository;

    /// Hash a local reference points at.
    fn reference(&self, name: &str) -> Result<String, GitError>;

    /// Hash a revision resolves to (`git rev-parse`).
    fn ref_get(&self, name: &str) -> Result<String, GitError>;

    fn commit_object(&self, hash: &str) -> Result<Commit, GitError>;

    /// The annotated tag object at `hash`, `None` when `hash` is not a tag object.
    fn tag_object(&self, hash: &str) -> Result<Option<Tag>, GitError>;

    fn tree(&self, hash: &str) -> Result<Tree, GitError>;

    fn blob(&self, hash: &str) -> Result<Vec<u8>, GitError>;

    /// Ancestors of `commit` down to (excluding) `stop_hash`, newest first
    /// unless `reverse` is set. `commit` itself is not included.
    fn ancestors(&self, commit: &Commit, stop_hash: &str, reverse: bool)
        -> Result<Vec<Commit>, GitError>;

    /// Whether the history of `reference` contains a merge commit.
    fn has_merge_commits(&self, reference: &str) -> Result<bool, GitError>;

    /// Whether `ancestor` is reachable from `descendant`.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, GitError>;

    /// Size in bytes of a stored object; `ObjectNotFound` when absent.
    fn object_size(&self, hash: &str) -> Result<u64, GitError>;

    /// Store a loose object fetched from elsewhere.
    fn write_object(&self, hash: &str, bytes: &[u8]) -> Result<(), GitError>;
}

// =============================================================================
// LEDGER
// =============================================================================

/// Errors from ledger state access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A rule violation reported against a transaction field.
    #[error("{0}")]
    Field(FieldError),

    #[error("state store: {0}")]
    Store(String),
}

pub trait RepoKeeper: Send + Sync {
    /// Repository with its proposals populated.
    fn get(&self, name: &str) -> Result<Option<Repository>, LedgerError>;

    /// Repository without proposal population.
    fn get_no_populate(&self, name: &str) -> Result<Option<Repository>, LedgerError>;

    /// Whether voting on `proposal_id` in `repo` has closed.
    fn is_proposal_closed(&self, repo: &str, proposal_id: &str) -> Result<bool, LedgerError>;
}

pub trait PushKeyKeeper: Send + Sync {
    fn get(&self, id: &PushKeyId) -> Result<Option<PushKey>, LedgerError>;
}

pub trait AccountKeeper: Send + Sync {
    fn get(&self, address: &Address) -> Result<Option<Account>, LedgerError>;
}

pub trait NamespaceKeeper: Send + Sync {
    /// Look up a namespace by its hashed name.
    fn get(&self, name_hash: &str) -> Result<Option<Namespace>, LedgerError>;
}

pub trait SysKeeper: Send + Sync {
    fn last_block_info(&self) -> Result<BlockInfo, LedgerError>;
}

pub trait TicketManager: Send + Sync {
    /// The `limit` highest-staked hosts.
    fn top_hosts(&self, limit: usize) -> Result<Vec<SelectedTicket>, LedgerError>;
}

/// Ledger access aggregate.
pub trait Logic: Send + Sync {
    fn repo_keeper(&self) -> &dyn RepoKeeper;
    fn push_key_keeper(&self) -> &dyn PushKeyKeeper;
    fn account_keeper(&self) -> &dyn AccountKeeper;
    fn namespace_keeper(&self) -> &dyn NamespaceKeeper;
    fn sys_keeper(&self) -> &dyn SysKeeper;
    fn ticket_manager(&self) -> &dyn TicketManager;

    /// Check, without applying, that `sender` can pay `value + fee` with
    /// account nonce `nonce` at `chain_height`.
    fn dry_send(
        &self,
        sender: &Address,
        value: Amount,
        fee: Amount,
        nonce: u64,
        chain_height: u64,
    ) -> Result<(), LedgerError>;
}

// =============================================================================
// DHT
// =============================================================================

/// Module under which repository objects are announced.
pub const REPO_OBJECT_MODULE: &str = "repo-object";

/// Key of a repository object in the DHT.
pub fn make_repo_object_dht_key(repo: &str, hash: &str) -> String {
    format!("{}/{}", repo, hash)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhtObjectQuery {
    pub module: String,
    pub object_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DhtError {
    #[error("object not found")]
    NotFound,

    #[error("request timed out")]
    Timeout,

    #[error("transport: {0}")]
    Transport(String),
}

/// Peer-to-peer object store.
#[async_trait]
pub trait DhtNode: Send + Sync {
    async fn get_object(&self, query: DhtObjectQuery) -> Result<Vec<u8>, DhtError>;
}

// =============================================================================
// TIME
// =============================================================================

/// Time source for timestamp validation
pub trait TimeSource: Send + Sync {
    /// Get current unix timestamp in seconds
    fn now(&self) -> u64;
}

/// Default time source using system time
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}
