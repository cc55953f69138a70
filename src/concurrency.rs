use std::future::Future;

use futures::{stream, StreamExt};

/// Run `tasks` with at most `limit` of them in flight at once.
///
/// A task is only started when a slot frees up. Results come back in input
/// order, one per task; a failing task leaves its siblings untouched and the
/// caller decides what a partial failure means. A limit of 0 runs one at a time.
pub async fn run_with_limit<T, E, F, Fut>(limit: usize, tasks: Vec<F>) -> Vec<Result<T, E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut results = stream::iter(tasks.into_iter().enumerate())
        .map(|(index, task)| async move { (index, task().await) })
        .buffer_unordered(limit.max(1))
        .collect::<Vec<_>>()
        .await;

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}
