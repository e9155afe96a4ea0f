//! Bounded, order-preserving async map.
//!
//! A fixed pool of logical workers pulls `(index, input)` pairs from a shared
//! cursor and writes each result into a pre-sized slot buffer at that index, so
//! the output order always equals the input order no matter which task finishes
//! first. Workers are plain futures joined on the caller's task; nothing is
//! spawned, so inputs and mappers need not be `Send + 'static`.

use futures::future::try_join_all;
use futures::lock::Mutex;
use std::future::Future;
use std::time::Duration;

/// Maps every input through `mapper` with at most `limit` calls in flight.
///
/// After a call completes the worker that ran it waits `pacing` before pulling
/// the next input. The first `Err` returned by `mapper` fails the whole batch;
/// tasks still in flight are dropped and their results discarded. Mappers that
/// want per-item isolation must turn failures into fallback values themselves.
///
/// A `limit` of zero is treated as one.
pub async fn map_limit<T, R, E, F, Fut>(
    inputs: Vec<T>,
    limit: usize,
    pacing: Duration,
    mapper: F,
) -> Result<Vec<R>, E>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let total = inputs.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let cursor = Mutex::new(inputs.into_iter().enumerate());
    let slots = Mutex::new((0..total).map(|_| None).collect::<Vec<Option<R>>>());
    let workers = limit.clamp(1, total);

    try_join_all((0..workers).map(|_| run_worker(&cursor, &slots, &mapper, pacing))).await?;

    // Every index was dispatched and every worker finished cleanly, so no slot is empty.
    Ok(slots.into_inner().into_iter().flatten().collect())
}

async fn run_worker<I, T, R, E, F, Fut>(
    cursor: &Mutex<I>,
    slots: &Mutex<Vec<Option<R>>>,
    mapper: &F,
    pacing: Duration,
) -> Result<(), E>
where
    I: Iterator<Item = (usize, T)>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    loop {
        let next = cursor.lock().await.next();
        let Some((index, input)) = next else {
            return Ok(());
        };

        let output = mapper(input).await?;
        slots.lock().await[index] = Some(output);

        if !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
    }
}
