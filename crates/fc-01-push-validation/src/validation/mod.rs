//! Validation checkers.
//!
//! Each checker is a plain function over read-only collaborators. Sanity
//! checks need no state; consistency checks read ledger and git state.
//! Every checker returns on the first violation.

pub mod change;
pub mod endorsement;
pub mod merge;
pub mod objects;
pub mod post_body;
pub mod post_commit;
pub mod push_note;
pub mod pushed_reference;
pub mod tx_detail;

pub use change::{check_annotated_tag, check_commit, check_note, validate_change};
pub use endorsement::{
    check_endorsement, check_endorsement_consistency, check_endorsement_sanity,
    check_note_endorsements,
};
pub use merge::check_merge_compliance;
pub use objects::fetch_and_check_reference_objects;
pub use post_body::{check_post_body, PostBody};
pub use post_commit::{check_post_commit, validate_post_commit, ReplayState};
pub use push_note::{
    check_push_note, check_push_note_consistency, check_push_note_sanity, note_totals,
};
pub use pushed_reference::{check_pushed_reference_consistency, check_pushed_reference_sanity};
pub use tx_detail::{
    check_tx_detail, check_tx_detail_consistency, check_tx_detail_sanity, tx_details_from_note,
};
