//! Pushed object availability.
//!
//! Objects a note introduces may not have reached this node yet. Missing
//! ones are fetched from the DHT and written locally before the note's
//! declared size is checked against what is actually stored.

use crate::domain::errors::{field_err, ValidationError, ValidationResult};
use crate::ports::outbound::{
    make_repo_object_dht_key, DhtError, DhtNode, DhtObjectQuery, GitError, LocalRepo,
    REPO_OBJECT_MODULE,
};
use shared_types::PushNote;
use std::time::Duration;
use tracing::{debug, warn};

/// Make every object of `note` available in `repo` and check the note size.
///
/// Any fetch failure aborts the whole note.
pub async fn fetch_and_check_reference_objects(
    note: &PushNote,
    repo: &dyn LocalRepo,
    dht: &dyn DhtNode,
    timeout: Duration,
) -> ValidationResult<()> {
    let mut total: u64 = 0;

    for hash in note.pushed_objects() {
        let size = match repo.object_size(hash) {
            Ok(size) => size,
            Err(GitError::ObjectNotFound(_)) => {
                fetch_object(note, repo, dht, hash, timeout).await?;
                repo.object_size(hash).map_err(|e| {
                    ValidationError::git(format!("failed to get size of object '{}'", hash), e)
                })?
            }
            Err(e) => {
                return Err(ValidationError::git(
                    format!("failed to get size of object '{}'", hash),
                    e,
                ))
            }
        };
        total = total.saturating_add(size);
    }

    if total != note.size {
        return field_err(
            "size",
            format!(
                "invalid size ({} bytes). actual object size ({} bytes) is different",
                note.size, total
            ),
        );
    }

    debug!(repo = %note.repo_name, size = total, "pushed objects available");
    Ok(())
}

async fn fetch_object(
    note: &PushNote,
    repo: &dyn LocalRepo,
    dht: &dyn DhtNode,
    hash: &str,
    timeout: Duration,
) -> ValidationResult<()> {
    let query = DhtObjectQuery {
        module: REPO_OBJECT_MODULE.to_string(),
        object_key: make_repo_object_dht_key(&note.repo_name, hash).into_bytes(),
    };

    let fetched = match tokio::time::timeout(timeout, dht.get_object(query)).await {
        Ok(result) => result,
        Err(_) => Err(DhtError::Timeout),
    };
    let bytes = fetched.map_err(|e| {
        warn!(repo = %note.repo_name, object = hash, error = %e, "object fetch failed");
        ValidationError::dht(format!("failed to fetch object '{}'", hash), e)
    })?;

    repo.write_object(hash, &bytes)
        .map_err(|e| ValidationError::git(format!("failed to write object '{}'", hash), e))?;
    debug!(repo = %note.repo_name, object = hash, bytes = bytes.len(), "object fetched");
    Ok(())
}
