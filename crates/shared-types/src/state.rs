//! # Ledger Snapshots
//!
//! Read-only views of chain state looked up during push validation.

use crate::amount::Amount;
use crate::entities::{Address, PublicKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// REPOSITORY
// =============================================================================

/// Mutable metadata attached to a reference (posts use `closed`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub closed: bool,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

/// On-chain record of a repository reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Number of accepted updates so far.
    pub nonce: u64,
    /// Hex hash the reference currently points at.
    pub hash: String,
    pub data: ReferenceData,
}

/// Governance knobs of a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovConfig {
    /// Minimum proposal fee.
    pub prop_fee: Amount,
    /// Merge-request proposals are exempt from the minimum fee.
    pub no_prop_fee_for_merge_req: bool,
    /// Blocks during which the proposal fee may be deposited; 0 means the
    /// full fee is due up front.
    pub prop_fee_deposit_dur: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub gov: GovConfig,
}

/// Action a repository proposal performs once accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalAction {
    AddOwner,
    UpdateRepo,
    RegisterPushKey,
    MergeRequest,
}

/// Final (or pending) outcome of a proposal vote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalOutcome {
    #[default]
    Undecided,
    Accepted,
    Rejected,
    RejectedWithVeto,
    RejectedWithVetoByOwners,
    QuorumNotMet,
    InsufficientDeposit,
}

/// Action-data keys of a merge-request proposal.
pub mod action_data {
    pub const BASE_BRANCH: &str = "base";
    pub const BASE_BRANCH_HASH: &str = "baseHash";
    pub const TARGET_BRANCH: &str = "target";
    pub const TARGET_COMMIT_HASH: &str = "targetHash";
}

/// A repository governance proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoProposal {
    pub action: ProposalAction,
    pub creator: Address,
    pub outcome: ProposalOutcome,
    pub action_data: BTreeMap<String, Vec<u8>>,
    /// True once voting has ended.
    pub finalized: bool,
}

impl RepoProposal {
    /// Action data value decoded as UTF-8, empty when absent.
    pub fn action_str(&self, key: &str) -> String {
        self.action_data
            .get(key)
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default()
    }

    pub fn is_accepted(&self) -> bool {
        self.outcome == ProposalOutcome::Accepted
    }
}

/// On-chain repository state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub references: BTreeMap<String, Reference>,
    pub proposals: BTreeMap<String, RepoProposal>,
    pub config: RepoConfig,
}

impl Repository {
    /// Current nonce of `name`, 0 when unknown.
    pub fn reference_nonce(&self, name: &str) -> u64 {
        self.references.get(name).map(|r| r.nonce).unwrap_or(0)
    }
}

// =============================================================================
// ACCOUNTS, KEYS, NAMESPACES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub balance: Amount,
    pub nonce: u64,
}

/// A registered push key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKey {
    pub pub_key: PublicKey,
    /// Owner account.
    pub address: Address,
    /// Repositories/namespaces the key may push to; empty means unrestricted.
    pub scopes: Vec<String>,
}

/// A namespace mapping domain names to targets such as `r/<repo>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub owner: Address,
    pub domains: BTreeMap<String, String>,
}

impl Namespace {
    /// Whether any domain targets the repository `repo`.
    pub fn targets_repo(&self, repo: &str) -> bool {
        self.domains
            .values()
            .any(|target| target.get(2..) == Some(repo) && target.starts_with("r/"))
    }
}

// =============================================================================
// HOSTS AND BLOCKS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub proposer_pub_key: PublicKey,
    /// Compressed BLS12-381 public key of the host.
    pub bls_pub_key: Vec<u8>,
}

/// A host selected from the ticket pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedTicket {
    pub ticket: Ticket,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
}
