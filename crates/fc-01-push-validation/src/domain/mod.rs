//! Domain layer for push validation

pub mod emoji;
pub mod errors;
pub mod front_matter;
pub mod git;
pub mod names;
pub mod outcome;
pub mod reference;
pub mod scope;

pub use errors::{FieldError, MergeError, PostCommitError, ValidationError, ValidationResult};
pub use front_matter::{PostDocument, PostFrontMatter, PostKind};
pub use git::{Commit, FileMode, GitSignature, Tag, Tree, TreeEntry};
pub use outcome::{PostData, PostOutcome, PushOutcome, ValidatedReference};
pub use reference::ReferenceKind;
pub use scope::is_blocked_by_scope;
