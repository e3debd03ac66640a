//! Partitioned parallel sum.
//!
//! The input is cut into `k` contiguous partitions, one scoped worker thread
//! sums each partition and sends its partial sum over a shared channel of
//! capacity `k`, and the caller adds up exactly `k` partial sums.

use std::ops::Range;
use std::thread;

use crate::error::{Error, Result};
use crate::flog_debug;

/// Split `0..len` into `k` contiguous ranges of `len / k` elements, the last
/// range absorbing the remainder. Fails for `k == 0`.
pub fn partitions(len: usize, k: usize) -> Result<Vec<Range<usize>>> {
    if k == 0 {
        return Err(Error::Validation(
            "concurrency level must be at least 1".to_string(),
        ));
    }
    let size = len / k;
    Ok((0..k)
        .map(|i| {
            let start = i * size;
            let end = if i == k - 1 { len } else { start + size };
            start..end
        })
        .collect())
}

/// Sum `numbers` with `concurrency` parallel workers.
///
/// Partial sums are carried as `i128`, so only the final total can fall
/// outside `i64`; that is reported as an error instead of wrapping. Other
/// errors mean `concurrency == 0` or a worker thread panicked.
pub fn sum(numbers: &[i64], concurrency: usize) -> Result<i64> {
    let parts = partitions(numbers.len(), concurrency)?;
    flog_debug!(
        "sum: {} numbers over {} partitions",
        numbers.len(),
        parts.len()
    );

    let (tx, rx) = crossbeam_channel::bounded::<i128>(concurrency);

    thread::scope(|scope| {
        let workers: Vec<_> = parts
            .into_iter()
            .map(|range| {
                let tx = tx.clone();
                let part = &numbers[range];
                scope.spawn(move || {
                    let partial: i128 = part.iter().map(|&n| i128::from(n)).sum();
                    // The combiner holds the receiver until every worker is done.
                    let _ = tx.send(partial);
                })
            })
            .collect();
        // Only worker clones remain, so the channel closes if one dies.
        drop(tx);

        let total = rx.iter().take(concurrency).sum::<i128>();

        let panicked = workers
            .into_iter()
            .map(|worker| worker.join())
            .filter(|joined| joined.is_err())
            .count();
        if panicked > 0 {
            return Err(Error::TaskJoin(format!(
                "{} sum worker(s) panicked",
                panicked
            )));
        }
        i64::try_from(total)
            .map_err(|_| Error::Validation(format!("sum {} overflows i64", total)))
    })
}
