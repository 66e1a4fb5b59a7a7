//! # Integration Flows
//!
//! Drive [`PushValidationService`](fc_01_push_validation::PushValidationService)
//! the way the push-receiving node does: check the note on arrival, pull the
//! pushed objects, apply the reference updates to the working copy, then
//! admit the push.

pub mod flows;
pub mod post_threads;
