//! Thread pool plumbing shared by the decoder and encoder

use rayon::ThreadPool;

/// Build a dedicated pool when a thread count is requested.
///
/// Returns `None` for `num_threads == 0`, which selects rayon's global pool.
pub(crate) fn build_pool(num_threads: usize, name: &'static str) -> Option<ThreadPool> {
    if num_threads == 0 {
        return None;
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(move |idx| format!("{}-{}", name, idx))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(err) => {
            tracing::warn!(num_threads, error = %err, "using the global thread pool");
            None
        }
    }
}

/// Run `op` inside `pool`, or on the global pool when there is none.
pub(crate) fn install<OP, R>(pool: Option<&ThreadPool>, op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    match pool {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_threads_uses_global_pool() {
        assert!(build_pool(0, "test").is_none());
    }

    #[test]
    fn test_dedicated_pool() {
        let pool = build_pool(2, "test").unwrap();
        assert_eq!(pool.current_num_threads(), 2);
        let threads = install(Some(&pool), rayon::current_num_threads);
        assert_eq!(threads, 2);
    }
}
