//! Thin wrapper around the Redis client used for debounce coordination.
//!
//! Modeled as an `Option<KvClient>` process-scoped singleton, mirroring the
//! way thumbnail/storage code treats its GCS client as optional: when Redis
//! is unreachable at startup, the coordinator degrades to a no-op rather
//! than failing the pipeline.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct KvClient {
    conn: ConnectionManager,
}

impl KvClient {
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(KvClient { conn })
    }

    pub async fn setex(&self, key: &str, ttl_secs: u64, value: &str) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl_secs).await
    }

    pub async fn incr(&self, key: &str) -> redis::RedisResult<i64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1).await
    }

    pub async fn exists(&self, key: &str) -> redis::RedisResult<bool> {
        let mut conn = self.conn.clone();
        conn.exists(key).await
    }

    pub async fn ttl(&self, key: &str) -> redis::RedisResult<i64> {
        let mut conn = self.conn.clone();
        conn.ttl(key).await
    }

    pub async fn delete(&self, keys: &[&str]) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.del(keys).await
    }
}

/// The three transient KV keys tracked per group while a reconcile burst is
/// in flight.
pub struct CoordinationKeys {
    pub pending: String,
    pub job: String,
    pub count: String,
}

impl CoordinationKeys {
    pub fn for_group(group_id: i64) -> Self {
        CoordinationKeys {
            pending: format!("cluster:pending:{}", group_id),
            job: format!("cluster:job:{}", group_id),
            count: format!("cluster:count:{}", group_id),
        }
    }

    pub fn all(&self) -> [&str; 3] {
        [&self.pending, &self.job, &self.count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_group() {
        let keys = CoordinationKeys::for_group(42);
        assert_eq!(keys.pending, "cluster:pending:42");
        assert_eq!(keys.job, "cluster:job:42");
        assert_eq!(keys.count, "cluster:count:42");
    }
}
