//! # Shared Types Crate
//!
//! Entities exchanged between the push-receiving service, the endorsement
//! gossip handlers and the push validation subsystem.
//!
//! ## Clusters
//!
//! - **Push**: `PushNote`, `PushedReference`, `TxDetail`
//! - **Endorsement**: `PushEndorsement`, `EndorsedReference`
//! - **Ledger snapshots**: `Repository`, `Reference`, `RepoProposal`,
//!   `Account`, `PushKey`, `Namespace`, `SelectedTicket`, `BlockInfo`
//! - **Value objects**: `Amount`, `PushKeyId`
//!
//! ## Design Principles
//!
//! - **Immutable once signed**: validators consume these values, they never
//!   mutate them.
//! - **Canonical bytes**: every signed entity exposes the exact byte sequence
//!   its signature covers (`bytes_no_sig`, `bytes_for_bls_sig`).

pub mod amount;
pub mod entities;
pub mod errors;
pub mod state;

pub use amount::Amount;
pub use entities::*;
pub use errors::*;
pub use state::*;
