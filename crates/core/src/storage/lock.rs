use anyhow::Context;

// Advisory locks are scoped to the Postgres session. Used as a best-effort guard against two
// scheduled runs evaluating the same trading window.
const LOCK_NAMESPACE: i64 = 0x4441_5954_5244; // "DAYTRD"

/// Stable FNV-1a hash of the window key, folded into the namespace.
fn lock_key_for_window(window_key: &str) -> i64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in window_key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    LOCK_NAMESPACE ^ ((hash >> 16) as i64)
}

pub async fn try_acquire_window_lock(pool: &sqlx::PgPool, window_key: &str) -> anyhow::Result<bool> {
    let key = lock_key_for_window(window_key);
    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to acquire advisory lock (window={window_key}, key={key})"))?;
    Ok(acquired.0)
}

pub async fn release_window_lock(pool: &sqlx::PgPool, window_key: &str) -> anyhow::Result<()> {
    let key = lock_key_for_window(window_key);
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .persistent(false)
        .bind(key)
        .execute(pool)
        .await
        .with_context(|| format!("failed to release advisory lock (window={window_key}, key={key})"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keys_map_to_distinct_stable_locks() {
        let a = lock_key_for_window("2026-01-05#0");
        assert_eq!(a, lock_key_for_window("2026-01-05#0"));
        assert_ne!(a, lock_key_for_window("2026-01-05#1"));
        assert_ne!(a, lock_key_for_window("2026-01-06#0"));
    }
}
