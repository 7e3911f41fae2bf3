//! Assignment of chunks to pool workers.

/// The worker responsible for chunk `chunk_id`.
///
/// # Panics
/// Panics if `num_workers` is 0.
pub fn worker_for(chunk_id: usize, num_workers: usize) -> usize {
    chunk_id % num_workers
}

/// The chunk ids owned by `worker_id` out of `chunk_count` chunks.
///
/// Ids are dealt round-robin, so the sets of different workers are disjoint and
/// together cover `0..chunk_count`. A `worker_id` at or above `num_workers`, or
/// `num_workers == 0`, owns nothing.
pub fn partition(chunk_count: usize, num_workers: usize, worker_id: usize) -> impl Iterator<Item = usize> {
    let start = if worker_id < num_workers { worker_id } else { chunk_count };
    (start..chunk_count).step_by(num_workers.max(1))
}
