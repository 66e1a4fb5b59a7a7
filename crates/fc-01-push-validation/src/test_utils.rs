//! Test utilities for push validation.
//!
//! In-memory implementations of the outbound ports plus key and commit
//! fixtures. Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use fc_01_push_validation::test_utils::{hash_of, Fixture};
//! use fc_01_push_validation::validation::check_push_note;
//!
//! let fx = Fixture::new();
//! let note = fx.master_push_note();
//! assert!(check_push_note(&fx.config, &note, Some(&fx.repo), fx.logic.as_ref(), fx.now).is_ok());
//! assert_eq!(note.references[0].new_hash, hash_of(2));
//! ```

use crate::config::ValidationConfig;
use crate::domain::errors::FieldError;
use crate::domain::git::{Commit, FileMode, GitSignature, Tag, Tree, TreeEntry};
use crate::ports::outbound::{
    AccountKeeper, DhtError, DhtNode, DhtObjectQuery, GitError, LedgerError, LocalRepo, Logic,
    NamespaceKeeper, PushKeyKeeper, RepoKeeper, SysKeeper, TicketManager, TimeSource,
    REPO_OBJECT_MODULE,
};
use crate::validation::tx_detail::tx_details_from_note;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_crypto::{encode_base58, hash_namespace, push_key_id, BlsKeyPair, Ed25519KeyPair};
use shared_types::{
    Account, Address, Amount, BlockInfo, EndorsedReference, Hash, Namespace, PushEndorsement,
    PushKey, PushKeyId, PushNote, PushedReference, Reference, Repository, SelectedTicket, Ticket,
    TxDetail,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tree hash shared by commits built with [`commit`].
pub const EMPTY_TREE_HASH: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// A deterministic 40-hex-character object hash.
pub fn hash_of(n: u64) -> String {
    format!("{:040x}", n)
}

fn signature(name: &str) -> GitSignature {
    GitSignature {
        name: name.to_string(),
        email: format!("{}@example.com", name),
        when: 1_700_000_000,
    }
}

/// A commit with fixed author, committer and tree.
pub fn commit(hash: &str, parents: &[&str]) -> Commit {
    Commit {
        hash: hash.to_string(),
        tree_hash: EMPTY_TREE_HASH.to_string(),
        parent_hashes: parents.iter().map(|p| p.to_string()).collect(),
        author: signature("alice"),
        committer: signature("alice"),
        message: format!("commit {}", hash),
    }
}

// =============================================================================
// TIME
// =============================================================================

/// A time source that returns a fixed timestamp.
#[derive(Debug, Clone)]
pub struct FixedTimeSource {
    timestamp: u64,
}

impl FixedTimeSource {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> u64 {
        self.timestamp
    }
}

// =============================================================================
// GIT
// =============================================================================

/// In-memory [`LocalRepo`].
#[derive(Default)]
pub struct MemRepo {
    name: String,
    state: RwLock<Repository>,
    refs: RwLock<HashMap<String, String>>,
    commits: RwLock<HashMap<String, Commit>>,
    tags: RwLock<HashMap<String, Tag>>,
    trees: RwLock<HashMap<String, Tree>>,
    objects: RwLock<HashMap<String, Vec<u8>>>,
    read_only: AtomicBool,
}

impl MemRepo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn set_state(&self, state: Repository) {
        *self.state.write() = state;
    }

    pub fn update_state(&self, f: impl FnOnce(&mut Repository)) {
        f(&mut self.state.write());
    }

    pub fn set_ref(&self, name: &str, hash: &str) {
        self.refs.write().insert(name.to_string(), hash.to_string());
    }

    pub fn add_commit(&self, commit: Commit) {
        self.commits.write().insert(commit.hash.clone(), commit);
    }

    /// A stored commit. Panics when absent.
    pub fn commit(&self, hash: &str) -> Commit {
        self.commits
            .read()
            .get(hash)
            .cloned()
            .unwrap_or_else(|| panic!("no commit {}", hash))
    }

    pub fn add_tag(&self, tag: Tag) {
        self.tags.write().insert(tag.hash.clone(), tag);
    }

    pub fn add_object(&self, hash: &str, bytes: &[u8]) {
        self.objects.write().insert(hash.to_string(), bytes.to_vec());
    }

    /// Add a post commit whose tree holds a single `body` file.
    pub fn add_post_commit(&self, hash: &str, parents: &[&str], body: &str) -> Commit {
        let tree_hash = format!("tree-{}", hash);
        let blob_hash = format!("blob-{}", hash);
        self.add_object(&blob_hash, body.as_bytes());
        self.trees.write().insert(
            tree_hash.clone(),
            Tree {
                hash: tree_hash.clone(),
                entries: vec![TreeEntry {
                    name: "body".to_string(),
                    mode: FileMode::Regular,
                    hash: blob_hash,
                }],
            },
        );

        let mut c = commit(hash, parents);
        c.tree_hash = tree_hash;
        self.add_commit(c.clone());
        c
    }

    /// Add another file to the tree of commit `hash`.
    pub fn add_tree_entry(&self, hash: &str, name: &str, bytes: &[u8]) {
        let tree_hash = self.commit(hash).tree_hash;
        let blob_hash = format!("blob-{}-{}", hash, name);
        self.add_object(&blob_hash, bytes);
        if let Some(tree) = self.trees.write().get_mut(&tree_hash) {
            tree.entries.push(TreeEntry {
                name: name.to_string(),
                mode: FileMode::Regular,
                hash: blob_hash,
            });
        }
    }

    /// Make [`LocalRepo::write_object`] fail.
    pub fn fail_writes(&self) {
        self.read_only.store(true, Ordering::SeqCst);
    }

    /// Breadth-first walk from `start`, not crossing `stop`.
    fn walk(&self, start: &[String], stop: &str) -> Result<Vec<Commit>, GitError> {
        let commits = self.commits.read();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&String> = start.iter().collect();
        let mut out = Vec::new();

        while let Some(hash) = queue.pop_front() {
            if hash == stop || !seen.insert(hash.clone()) {
                continue;
            }
            let c = commits
                .get(hash)
                .ok_or_else(|| GitError::ObjectNotFound(hash.clone()))?;
            queue.extend(c.parent_hashes.iter());
            out.push(c.clone());
        }
        Ok(out)
    }
}

impl LocalRepo for MemRepo {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> Repository {
        self.state.read().clone()
    }

    fn reference(&self, name: &str) -> Result<String, GitError> {
        self.refs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| GitError::ReferenceNotFound(name.to_string()))
    }

    fn ref_get(&self, name: &str) -> Result<String, GitError> {
        self.reference(name)
    }

    fn commit_object(&self, hash: &str) -> Result<Commit, GitError> {
        self.commits
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound(hash.to_string()))
    }

    fn tag_object(&self, hash: &str) -> Result<Option<Tag>, GitError> {
        Ok(self.tags.read().get(hash).cloned())
    }

    fn tree(&self, hash: &str) -> Result<Tree, GitError> {
        self.trees
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound(hash.to_string()))
    }

    fn blob(&self, hash: &str) -> Result<Vec<u8>, GitError> {
        self.objects
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound(hash.to_string()))
    }

    fn ancestors(
        &self,
        commit: &Commit,
        stop_hash: &str,
        reverse: bool,
    ) -> Result<Vec<Commit>, GitError> {
        let mut out = self.walk(&commit.parent_hashes, stop_hash)?;
        if reverse {
            out.reverse();
        }
        Ok(out)
    }

    fn has_merge_commits(&self, reference: &str) -> Result<bool, GitError> {
        let Some(tip) = self.refs.read().get(reference).cloned() else {
            return Ok(false);
        };
        Ok(self.walk(&[tip], "")?.iter().any(Commit::is_merge))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, GitError> {
        if ancestor.is_empty() {
            return Ok(false);
        }
        let history = self.walk(&[descendant.to_string()], "")?;
        Ok(history.iter().any(|c| c.hash.starts_with(ancestor)))
    }

    fn object_size(&self, hash: &str) -> Result<u64, GitError> {
        self.objects
            .read()
            .get(hash)
            .map(|bytes| bytes.len() as u64)
            .ok_or_else(|| GitError::ObjectNotFound(hash.to_string()))
    }

    fn write_object(&self, hash: &str, bytes: &[u8]) -> Result<(), GitError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(GitError::Other("repository is read-only".to_string()));
        }
        self.add_object(hash, bytes);
        Ok(())
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// In-memory ledger implementing every keeper.
#[derive(Default)]
pub struct MemLogic {
    repos: RwLock<HashMap<String, Repository>>,
    push_keys: RwLock<HashMap<PushKeyId, PushKey>>,
    accounts: RwLock<HashMap<Address, Account>>,
    namespaces: RwLock<HashMap<String, Namespace>>,
    hosts: RwLock<Vec<SelectedTicket>>,
    closed_proposals: RwLock<HashSet<(String, String)>>,
    height: RwLock<u64>,
}

impl MemLogic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_push_key(&self, key: PushKey) {
        let id = PushKeyId(push_key_id(&key.pub_key));
        self.push_keys.write().insert(id, key);
    }

    pub fn add_account(&self, address: Address, account: Account) {
        self.accounts.write().insert(address, account);
    }

    /// Insert or replace a repository.
    pub fn add_repo(&self, name: &str, repo: Repository) {
        self.repos.write().insert(name.to_string(), repo);
    }

    pub fn update_repo(&self, name: &str, f: impl FnOnce(&mut Repository)) {
        f(self.repos.write().entry(name.to_string()).or_default());
    }

    /// Register a namespace under its hashed name.
    pub fn add_namespace(&self, name: &str, namespace: Namespace) {
        self.namespaces.write().insert(hash_namespace(name), namespace);
    }

    /// Append a host; hosts rank in insertion order.
    pub fn add_host(&self, host: SelectedTicket) {
        self.hosts.write().push(host);
    }

    pub fn close_proposal(&self, repo: &str, proposal_id: &str) {
        self.closed_proposals
            .write()
            .insert((repo.to_string(), proposal_id.to_string()));
    }

    pub fn set_height(&self, height: u64) {
        *self.height.write() = height;
    }
}

impl RepoKeeper for MemLogic {
    fn get(&self, name: &str) -> Result<Option<Repository>, LedgerError> {
        Ok(self.repos.read().get(name).cloned())
    }

    fn get_no_populate(&self, name: &str) -> Result<Option<Repository>, LedgerError> {
        Ok(self.repos.read().get(name).map(|r| Repository {
            proposals: Default::default(),
            ..r.clone()
        }))
    }

    fn is_proposal_closed(&self, repo: &str, proposal_id: &str) -> Result<bool, LedgerError> {
        Ok(self
            .closed_proposals
            .read()
            .contains(&(repo.to_string(), proposal_id.to_string())))
    }
}

impl PushKeyKeeper for MemLogic {
    fn get(&self, id: &PushKeyId) -> Result<Option<PushKey>, LedgerError> {
        Ok(self.push_keys.read().get(id).cloned())
    }
}

impl AccountKeeper for MemLogic {
    fn get(&self, address: &Address) -> Result<Option<Account>, LedgerError> {
        Ok(self.accounts.read().get(address).cloned())
    }
}

impl NamespaceKeeper for MemLogic {
    fn get(&self, name_hash: &str) -> Result<Option<Namespace>, LedgerError> {
        Ok(self.namespaces.read().get(name_hash).cloned())
    }
}

impl SysKeeper for MemLogic {
    fn last_block_info(&self) -> Result<BlockInfo, LedgerError> {
        Ok(BlockInfo {
            height: *self.height.read(),
        })
    }
}

impl TicketManager for MemLogic {
    fn top_hosts(&self, limit: usize) -> Result<Vec<SelectedTicket>, LedgerError> {
        Ok(self.hosts.read().iter().take(limit).cloned().collect())
    }
}

impl Logic for MemLogic {
    fn repo_keeper(&self) -> &dyn RepoKeeper {
        self
    }

    fn push_key_keeper(&self) -> &dyn PushKeyKeeper {
        self
    }

    fn account_keeper(&self) -> &dyn AccountKeeper {
        self
    }

    fn namespace_keeper(&self) -> &dyn NamespaceKeeper {
        self
    }

    fn sys_keeper(&self) -> &dyn SysKeeper {
        self
    }

    fn ticket_manager(&self) -> &dyn TicketManager {
        self
    }

    fn dry_send(
        &self,
        sender: &Address,
        value: Amount,
        fee: Amount,
        nonce: u64,
        _chain_height: u64,
    ) -> Result<(), LedgerError> {
        let accounts = self.accounts.read();
        let Some(account) = accounts.get(sender) else {
            return Err(LedgerError::Field(FieldError::new(
                "senderPubKey",
                "sender account not found",
            )));
        };
        if nonce != account.nonce + 1 {
            return Err(LedgerError::Field(FieldError::new(
                "nonce",
                format!(
                    "tx has invalid nonce ({}); expected ({})",
                    nonce,
                    account.nonce + 1
                ),
            )));
        }
        let spendable = value.checked_add(fee).is_some_and(|total| account.balance >= total);
        if !spendable {
            return Err(LedgerError::Field(FieldError::new(
                "value+fee",
                "sender's spendable account balance is insufficient",
            )));
        }
        Ok(())
    }
}

// =============================================================================
// DHT
// =============================================================================

/// In-memory [`DhtNode`] keyed by object key.
#[derive(Default)]
pub struct MemDht {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MemDht {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, key: &str, bytes: Vec<u8>) {
        self.objects.write().insert(key.to_string(), bytes);
    }

    /// Number of lookups served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DhtNode for MemDht {
    async fn get_object(&self, query: DhtObjectQuery) -> Result<Vec<u8>, DhtError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if query.module != REPO_OBJECT_MODULE {
            return Err(DhtError::Transport(format!("unknown module '{}'", query.module)));
        }
        let key = String::from_utf8_lossy(&query.object_key).into_owned();
        self.objects.read().get(&key).cloned().ok_or(DhtError::NotFound)
    }
}

// =============================================================================
// KEYS
// =============================================================================

/// A push key holder.
pub struct Pusher {
    key: Ed25519KeyPair,
    pub id: PushKeyId,
    pub address: Address,
}

impl Pusher {
    /// Deterministic key from `seed`; the owner address is `[seed; 20]`.
    pub fn new(seed: u8) -> Self {
        let key = Ed25519KeyPair::from_seed([seed; 32]);
        let id = PushKeyId(push_key_id(key.public_key().as_bytes()));
        Self {
            key,
            id,
            address: [seed; 20],
        }
    }

    /// On-chain record of this key, without scopes.
    pub fn push_key(&self) -> PushKey {
        PushKey {
            pub_key: *self.key.public_key().as_bytes(),
            address: self.address,
            scopes: vec![],
        }
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.key.sign(message).as_bytes().to_vec()
    }

    /// Set the base58 signature of `detail`.
    pub fn sign_detail(&self, detail: &mut TxDetail) {
        detail.signature = encode_base58(&self.sign(&detail.bytes_no_sig()));
    }

    /// Sign every reference of `note` over its derived transaction detail.
    pub fn sign_references(&self, note: &mut PushNote) {
        let details = tx_details_from_note(note, &[]);
        for (pushed, detail) in note.references.iter_mut().zip(details) {
            pushed.push_sig = self.sign(&detail.bytes_no_sig());
        }
    }
}

/// An endorsing host with an Ed25519 identity and a BLS key.
pub struct Host {
    pub pub_key: [u8; 32],
    bls: BlsKeyPair,
}

impl Host {
    pub fn new(seed: u8) -> Self {
        let pub_key = *Ed25519KeyPair::from_seed([seed; 32]).public_key().as_bytes();
        let bls = BlsKeyPair::from_ikm(&[seed; 32]).expect("valid BLS key material");
        Self { pub_key, bls }
    }

    pub fn ticket(&self) -> SelectedTicket {
        SelectedTicket {
            ticket: Ticket {
                proposer_pub_key: self.pub_key,
                bls_pub_key: self.bls.public_key().to_bytes().to_vec(),
            },
        }
    }

    /// A standalone, BLS-signed endorsement of `note_id`.
    pub fn endorse(&self, note_id: Hash, references: Vec<EndorsedReference>) -> PushEndorsement {
        let mut endorsement = PushEndorsement {
            note_id: Some(note_id),
            endorser_pub_key: Some(self.pub_key),
            sig_bls: None,
            references,
        };
        let sig = self.bls.sign(&endorsement.bytes_for_bls_sig());
        endorsement.sig_bls = Some(sig.to_bytes().to_vec());
        endorsement
    }

    /// An endorsement as embedded in a push note.
    pub fn embedded(&self, references: Vec<EndorsedReference>) -> PushEndorsement {
        PushEndorsement {
            note_id: None,
            endorser_pub_key: Some(self.pub_key),
            sig_bls: None,
            references,
        }
    }
}

// =============================================================================
// FIXTURE
// =============================================================================

/// A repository `repo1` with one pusher and a signing node.
///
/// - On chain: `refs/heads/master` at `hash_of(1)`, nonce 1.
/// - Locally: master at `hash_of(1)`; commit `hash_of(2)` extends it.
/// - Pusher account: nonce 0, balance 100.
pub struct Fixture {
    pub config: ValidationConfig,
    pub repo: MemRepo,
    pub logic: Arc<MemLogic>,
    pub now: u64,
    pub pusher: Pusher,
    node: Ed25519KeyPair,
}

impl Fixture {
    pub const MASTER: &'static str = "refs/heads/master";

    pub fn new() -> Self {
        let pusher = Pusher::new(1);
        let logic = MemLogic::new();
        logic.add_push_key(pusher.push_key());
        logic.add_account(
            pusher.address,
            Account {
                balance: "100".parse().unwrap_or_default(),
                nonce: 0,
            },
        );

        let mut state = Repository::default();
        state.references.insert(
            Self::MASTER.to_string(),
            Reference {
                nonce: 1,
                hash: hash_of(1),
                ..Default::default()
            },
        );
        logic.add_repo("repo1", state.clone());

        let repo = MemRepo::new("repo1");
        repo.set_state(state);
        repo.add_commit(commit(&hash_of(1), &[]));
        repo.add_commit(commit(&hash_of(2), &[&hash_of(1)]));
        repo.set_ref(Self::MASTER, &hash_of(1));

        Self {
            config: ValidationConfig::default(),
            repo,
            logic: Arc::new(logic),
            now: 1_700_000_000,
            pusher,
            node: Ed25519KeyPair::from_seed([200; 32]),
        }
    }

    /// An unsigned reference change with fee 1.
    pub fn pushed_ref(&self, name: &str, old: &str, new: &str, nonce: u64) -> PushedReference {
        PushedReference {
            name: name.to_string(),
            old_hash: old.to_string(),
            new_hash: new.to_string(),
            nonce,
            fee: "1".to_string(),
            ..Default::default()
        }
    }

    /// A note over `references`, signed by the pusher and the node.
    pub fn push_note(&self, references: Vec<PushedReference>) -> PushNote {
        let mut note = PushNote {
            repo_name: "repo1".to_string(),
            namespace: None,
            references,
            pusher_key_id: self.pusher.id.as_bytes().to_vec(),
            pusher_address: self.pusher.address,
            pusher_account_nonce: 1,
            timestamp: self.now - 10,
            ..Default::default()
        };
        self.pusher.sign_references(&mut note);
        self.sign_note(&mut note);
        note
    }

    /// Pushes master from `hash_of(1)` to `hash_of(2)`.
    pub fn master_push_note(&self) -> PushNote {
        self.push_note(vec![self.pushed_ref(Self::MASTER, &hash_of(1), &hash_of(2), 2)])
    }

    /// Re-sign `note` with the node key after it was modified.
    pub fn sign_note(&self, note: &mut PushNote) {
        note.node_pub_key = self.node.public_key().as_bytes().to_vec();
        note.node_sig = self.node.sign(&note.bytes_no_sig()).as_bytes().to_vec();
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
