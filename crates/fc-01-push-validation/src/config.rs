//! Validation limits and tunables.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FC_MAX_POST_CONTENT_LEN` | `8192` | Max post content bytes |
//! | `FC_MAX_POST_TITLE_LEN` | `256` | Max post title chars |
//! | `FC_MAX_POST_LIST_LEN` | `10` | Max reactions/labels/assignees |
//! | `FC_NUM_TOP_HOSTS` | `21` | Size of the endorsing host set |
//! | `FC_OBJECT_FETCH_TIMEOUT_SECS` | `60` | Per-object DHT fetch timeout |
//! | `FC_MAX_FUTURE_DRIFT_SECS` | `0` | Allowed push note clock skew |

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum post content length in bytes.
    pub max_content_len: usize,
    /// Maximum post title length in characters.
    pub max_title_len: usize,
    /// Maximum entries in reactions, labels and assignees lists.
    pub max_list_len: usize,
    /// Maximum digits in a merge proposal ID.
    pub max_merge_proposal_id_len: usize,
    /// Number of top hosts allowed to endorse.
    pub num_top_hosts: usize,
    /// Timeout for fetching one object from the DHT.
    pub object_fetch_timeout: Duration,
    /// Seconds a push note timestamp may run ahead of local time.
    pub max_future_drift_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_content_len: 8192,
            max_title_len: 256,
            max_list_len: 10,
            max_merge_proposal_id_len: 8,
            num_top_hosts: 21,
            object_fetch_timeout: Duration::from_secs(60),
            max_future_drift_secs: 0,
        }
    }
}

impl ValidationConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_content_len: parse_env("FC_MAX_POST_CONTENT_LEN").unwrap_or(defaults.max_content_len),
            max_title_len: parse_env("FC_MAX_POST_TITLE_LEN").unwrap_or(defaults.max_title_len),
            max_list_len: parse_env("FC_MAX_POST_LIST_LEN").unwrap_or(defaults.max_list_len),
            max_merge_proposal_id_len: defaults.max_merge_proposal_id_len,
            num_top_hosts: parse_env("FC_NUM_TOP_HOSTS").unwrap_or(defaults.num_top_hosts),
            object_fetch_timeout: parse_env("FC_OBJECT_FETCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.object_fetch_timeout),
            max_future_drift_secs: parse_env("FC_MAX_FUTURE_DRIFT_SECS")
                .unwrap_or(defaults.max_future_drift_secs),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
