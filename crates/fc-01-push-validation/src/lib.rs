//! # fc-01-push-validation
//!
//! Push admission for ForgeChain repositories.
//!
//! ## Architecture
//!
//! A push arrives as a signed [`PushNote`](shared_types::PushNote) listing
//! reference updates. Before a node relays or applies it, this subsystem
//! decides whether the push is admissible against ledger state and the
//! local git store:
//!
//! ```text
//! PushNote ──→ sanity ──→ consistency ──→ tx details ──→ changes
//!                                                          │
//!                        ┌──────────────┬─────────────────┼──────────────┐
//!                        ↓              ↓                 ↓              ↓
//!                     branch           tag        post (issue / MR)    note
//!                        │                                │
//!                 merge compliance               replay front matter
//! ```
//!
//! Host endorsements are checked on their own against the top host set,
//! and objects missing from the local store are pulled from the DHT.
//!
//! ### Read-only
//!
//! Validation never mutates ledger or git state. Successful validation
//! returns a [`PushOutcome`] describing what the caller must apply.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fc_01_push_validation::{PushValidationApi, PushValidationService, ValidationConfig};
//!
//! let service = PushValidationService::new(logic, dht, ValidationConfig::from_env());
//!
//! service.check_push_note(&note, Some(&repo))?;
//! service.fetch_and_check_reference_objects(&note, &repo).await?;
//! let outcome = service.validate_push(&note, &repo).await?;
//! ```

pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main types
pub use config::ValidationConfig;
pub use domain::{
    Commit, FieldError, MergeError, PostCommitError, PostData, PostFrontMatter, PostKind,
    PostOutcome, PushOutcome, ReferenceKind, ValidatedReference, ValidationError,
    ValidationResult,
};
pub use ports::{
    DhtError, DhtNode, GitError, LedgerError, LocalRepo, Logic, PushValidationApi,
    SystemTimeSource, TimeSource,
};
pub use service::PushValidationService;
