use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use super::KvBackend;
use crate::error::{GatewayError, Result};

const COMPARE_AND_DELETE: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Redis backend over a shared `ConnectionManager`.
///
/// No I/O happens in [`RedisKv::open`]; the connection is established by the
/// first command and reused afterwards. A failed connect leaves the cell
/// empty so the next command tries again. Every command is bounded by
/// `op_timeout` so an unreachable server surfaces as an error instead of a stall.
pub struct RedisKv {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    release_script: redis::Script,
    op_timeout: Duration,
}

impl RedisKv {
    /// Parse `url` (e.g. "redis://127.0.0.1:6379/0").
    pub fn open(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            release_script: redis::Script::new(COMPARE_AND_DELETE),
            op_timeout: Duration::from_secs(1),
        })
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                tracing::debug!("Connecting to Redis");
                self.client.get_connection_manager().await
            })
            .await?;
        Ok(manager.clone())
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Backend(format!(
                "redis {op} timed out after {}ms",
                self.op_timeout.as_millis()
            ))),
        }
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl KvBackend for RedisKv {
    fn backend_id(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.bounded("GET", async {
            let mut conn = self.connection().await?;
            let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
            Ok(value)
        })
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.bounded("SET", async {
            let mut conn = self.connection().await?;
            let _: () = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
        .await
    }

    async fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        self.bounded("SET NX", async {
            let mut conn = self.connection().await?;
            // Nil reply means the key already existed.
            let reply: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query_async(&mut conn)
                .await?;
            Ok(reply.is_some())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.bounded("DEL", async {
            let mut conn = self.connection().await?;
            let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.bounded("EXISTS", async {
            let mut conn = self.connection().await?;
            let count: i64 = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
            Ok(count > 0)
        })
        .await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool> {
        self.bounded("EVAL", async {
            let mut conn = self.connection().await?;
            let deleted: i64 = self
                .release_script
                .key(key)
                .arg(expected)
                .invoke_async(&mut conn)
                .await?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.bounded("PING", async {
            let mut conn = self.connection().await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }
}
