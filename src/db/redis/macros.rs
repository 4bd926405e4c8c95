/// Read-through caching over [`Cache`](crate::db::Cache).
///
/// Returns the cached value when present. Otherwise awaits `$block`, queues
/// the result for a background write, and returns it. A failed cache read is
/// logged and treated as a miss; only `$block`'s error propagates.
///
/// # Arguments
/// * `$cache`: the cache instance (`get_from_cache` + `set_in_background`)
/// * `$key`: the [`CacheKey`](crate::db::CacheKey) to read and write
/// * `$ttl`: time-to-live in seconds
/// * `$block`: future computing the value on a miss
/// * `$accept` (optional): predicate a cached value must pass to count as a hit
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {
        $crate::cached!($cache, $key, $ttl, $block, |_| true)
    };
    ($cache:expr, $key:expr, $ttl:expr, $block:expr, $accept:expr) => {{
        let hit = match $cache.get_from_cache(&$key).await {
            Ok(Some(cached)) if ($accept)(&cached) => Some(cached),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, key = %$key, "Cache read failed, recomputing");
                None
            }
        };

        match hit {
            Some(cached) => Ok(cached),
            None => {
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
