//! Batching and bounded concurrent dispatch
//!
//! Each identifier in a batch runs as its own tokio task. The dispatching
//! task is the only collector of outcomes: it joins every handle before the
//! next batch starts, so no shared state is written concurrently.

use crate::error::{NukeError, Result};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use tracing::{debug, warn};

/// Hard ceiling of identifiers accepted by one nuke call
///
/// Most provider APIs start throttling around 100 requests per second and
/// every identifier is dispatched as one concurrent request.
pub const MAX_RESOURCES_PER_CALL: usize = 100;

/// Result of one identifier's deletion pipeline
#[derive(Debug)]
pub struct DeletionOutcome {
    pub identifier: String,
    pub error: Option<NukeError>,
}

impl DeletionOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Split identifiers into consecutive batches of at most `max_batch_size`
pub fn partition(identifiers: &[String], max_batch_size: usize) -> Vec<Vec<String>> {
    identifiers
        .chunks(max_batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Run `action` for every identifier, batch by batch
///
/// Fails with [`NukeError::TooManyResources`] before dispatching anything
/// when more than [`MAX_RESOURCES_PER_CALL`] distinct identifiers are given.
/// Otherwise every identifier gets exactly one outcome; a failing action
/// never cancels its siblings.
pub async fn run_batched<F, Fut>(
    resource_type: &str,
    identifiers: Vec<String>,
    max_batch_size: usize,
    action: F,
) -> Result<Vec<DeletionOutcome>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let identifiers = dedup(identifiers);

    if identifiers.len() > MAX_RESOURCES_PER_CALL {
        warn!(
            resource_type = %resource_type,
            count = identifiers.len(),
            limit = MAX_RESOURCES_PER_CALL,
            "Refusing to nuke more resources than the per-call ceiling"
        );
        return Err(NukeError::TooManyResources {
            resource_type: resource_type.to_string(),
            count: identifiers.len(),
            limit: MAX_RESOURCES_PER_CALL,
        });
    }

    let batches = partition(&identifiers, max_batch_size);
    let mut outcomes = Vec::with_capacity(identifiers.len());

    for (index, batch) in batches.iter().enumerate() {
        debug!(
            resource_type = %resource_type,
            batch = index + 1,
            batches = batches.len(),
            size = batch.len(),
            "Dispatching batch"
        );
        outcomes.extend(dispatch(batch, &action).await);
    }

    Ok(outcomes)
}

async fn dispatch<F, Fut>(batch: &[String], action: &F) -> Vec<DeletionOutcome>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut pending: FuturesUnordered<_> = batch
        .iter()
        .map(|identifier| {
            let handle = tokio::spawn(action(identifier.clone()));
            let identifier = identifier.clone();
            async move { (identifier, handle.await) }
        })
        .collect();

    let mut outcomes = Vec::with_capacity(batch.len());
    while let Some((identifier, joined)) = pending.next().await {
        let error = match joined {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(join_error) => Some(NukeError::delete(
                &identifier,
                format!("deletion task aborted: {}", join_error),
            )),
        };
        outcomes.push(DeletionOutcome { identifier, error });
    }
    outcomes
}

fn dedup(identifiers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(identifiers.len());
    identifiers
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn ok() -> Result<()> {
        Ok(())
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("id-{}", i)).collect()
    }

    #[test]
    fn test_partition_covers_every_identifier_once() {
        let all = ids(7);
        let batches = partition(&all, 3);
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() <= 3));
        assert_eq!(batches.concat(), all);
    }

    #[test]
    fn test_partition_zero_size_is_clamped() {
        assert_eq!(partition(&ids(2), 0).len(), 2);
    }

    #[tokio::test]
    async fn test_ceiling_refuses_without_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = run_batched("ec2-instance", ids(101), 200, move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ok()
            }
        })
        .await;

        match result {
            Err(NukeError::TooManyResources {
                resource_type,
                count,
                limit,
            }) => {
                assert_eq!(resource_type, "ec2-instance");
                assert_eq!(count, 101);
                assert_eq!(limit, MAX_RESOURCES_PER_CALL);
            }
            other => panic!("expected TooManyResources, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exactly_at_ceiling_runs() {
        let outcomes = run_batched("ec2-instance", ids(100), 100, |_| async { ok() })
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 100);
        assert!(outcomes.iter().all(DeletionOutcome::is_success));
    }

    #[tokio::test]
    async fn test_failures_do_not_affect_siblings() {
        let outcomes = run_batched("s3-bucket", ids(5), 5, |id| async move {
            if id == "id-1" || id == "id-3" {
                Err(NukeError::delete(id, "access denied"))
            } else {
                tokio::time::sleep(Duration::from_millis(5)).await;
                ok()
            }
        })
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 5);
        let failed: Vec<_> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.identifier.as_str())
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.contains(&"id-1"));
        assert!(failed.contains(&"id-3"));
    }

    #[tokio::test]
    async fn test_panicking_task_is_recorded_as_failure() {
        let outcomes = run_batched("s3-bucket", ids(2), 2, |id| async move {
            if id == "id-0" {
                panic!("provider client blew up");
            }
            ok()
        })
        .await
        .unwrap();

        let failed = outcomes.iter().find(|o| o.identifier == "id-0").unwrap();
        assert!(matches!(failed.error, Some(NukeError::Delete { .. })));
        assert!(outcomes.iter().find(|o| o.identifier == "id-1").unwrap().is_success());
    }

    #[tokio::test]
    async fn test_batches_run_sequentially() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (in_flight_c, peak_c) = (in_flight.clone(), peak.clone());

        let outcomes = run_batched("lambda-function", ids(9), 3, move |_| {
            let in_flight = in_flight_c.clone();
            let peak = peak_c.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                ok()
            }
        })
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 9);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_duplicates_are_dispatched_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let identifiers = vec!["a".to_string(), "b".to_string(), "a".to_string()];

        let outcomes = run_batched("ebs-volume", identifiers, 10, move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ok()
            }
        })
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_input_is_noop() {
        let outcomes = run_batched("ebs-volume", Vec::new(), 10, |_| async { ok() })
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }
}
