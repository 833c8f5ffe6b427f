use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, PgPool, Postgres};
use tokio::sync::Mutex;
use tracing::warn;

use crate::emails::store::RunLock;

/// Session-level `pg_try_advisory_lock` held on a dedicated connection for
/// the length of a run. If the process dies the connection closes and
/// Postgres drops the lock.
pub struct PgRunLock {
    pool: PgPool,
    key: i64,
    held: Mutex<Option<PoolConnection<Postgres>>>,
}

impl PgRunLock {
    pub fn new(pool: PgPool, key: i64) -> Self {
        Self {
            pool,
            key,
            held: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RunLock for PgRunLock {
    async fn try_acquire(&self) -> anyhow::Result<bool> {
        let mut held = self.held.lock().await;
        if held.is_some() {
            return Ok(false);
        }

        let mut conn = self.pool.acquire().await?;
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(self.key)
            .fetch_one(&mut *conn)
            .await?;

        if acquired {
            *held = Some(conn);
        }
        Ok(acquired)
    }

    async fn release(&self) -> anyhow::Result<()> {
        let Some(mut conn) = self.held.lock().await.take() else {
            return Ok(());
        };

        let res: Result<bool, sqlx::Error> = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
            .bind(self.key)
            .fetch_one(&mut *conn)
            .await;

        match res {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(key = self.key, "advisory lock was not held at release");
                Ok(())
            }
            Err(e) => {
                // Never hand a connection that may still hold the lock back to the pool.
                let _ = conn.detach().close().await;
                Err(e.into())
            }
        }
    }
}
