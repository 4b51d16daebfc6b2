//! Data-parallel job dispatch
//!
//! Every index in `0..count` runs exactly once, on any worker thread, and the
//! call returns only after all of them have finished. Returning is the
//! dependency handle: a stage that starts after `parallel_for` returns sees
//! every write the jobs made.

use rayon::prelude::*;
use std::time::Instant;

/// Run `job(i)` for every `i` in `0..count`, at least `batch` items per task.
///
/// Empty dispatches return immediately without touching the pool.
pub fn parallel_for<F>(count: usize, batch: usize, job: F)
where
    F: Fn(usize) + Send + Sync,
{
    if count == 0 {
        return;
    }
    (0..count)
        .into_par_iter()
        .with_min_len(batch.max(1))
        .for_each(job);
}

/// Run `job` on every element of `items` in parallel.
pub fn parallel_for_each_mut<T, F>(items: &mut [T], batch: usize, job: F)
where
    T: Send,
    F: Fn(&mut T) + Send + Sync,
{
    if items.is_empty() {
        return;
    }
    items
        .par_iter_mut()
        .with_min_len(batch.max(1))
        .for_each(job);
}

/// Run `f` and log how long it took at trace level.
pub fn timed<R>(stage: &str, f: impl FnOnce() -> R) -> R {
    let start = Instant::now();
    let result = f();
    log::trace!(
        "[firefly] {stage} took {:.3} ms",
        start.elapsed().as_secs_f64() * 1000.0
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn every_index_runs_once() {
        let hits: Vec<AtomicUsize> = (0..1000).map(|_| AtomicUsize::new(0)).collect();
        parallel_for(hits.len(), 8, |i| {
            hits[i].fetch_add(1, Ordering::Relaxed);
        });
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn empty_dispatch_is_a_no_op() {
        let calls = AtomicUsize::new(0);
        parallel_for(0, 16, |_| {
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn zero_batch_is_treated_as_one() {
        let calls = AtomicUsize::new(0);
        parallel_for(5, 0, |_| {
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(calls.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn for_each_mut_touches_all() {
        let mut values = vec![1u32; 257];
        parallel_for_each_mut(&mut values, 32, |v| *v *= 3);
        assert!(values.iter().all(|&v| v == 3));
    }

    #[test]
    fn timed_returns_value() {
        assert_eq!(timed("test", || 7), 7);
    }
}
