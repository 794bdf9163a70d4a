//! Cooldown gate: a short per-user lock that stops the same paid action firing twice
//! in quick succession.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

/// Seconds a user must wait between two AI actions.
pub const AI_ACTION_COOLDOWN_SECS: u64 = 5;

/// Carried in `AppState` as `Arc<dyn CooldownGate>`.
#[async_trait]
pub trait CooldownGate: Send + Sync {
    /// Returns `None` when the key was free and is now held for `seconds`,
    /// or `Some(remaining)` when the caller must wait.
    async fn try_acquire(&self, key: &str, seconds: u64) -> Result<Option<u64>>;

    /// Frees a held key early, e.g. when the action it guarded was refused.
    async fn release(&self, key: &str) -> Result<()>;
}

// ────────────────────────────────────────────────────────────────────────────
// RedisCooldown
// ────────────────────────────────────────────────────────────────────────────

/// `SET key 1 NX EX seconds`; on a miss, reports the key's remaining TTL.
pub struct RedisCooldown {
    conn: MultiplexedConnection,
}

impl RedisCooldown {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CooldownGate for RedisCooldown {
    async fn try_acquire(&self, key: &str, seconds: u64) -> Result<Option<u64>> {
        let mut conn = self.conn.clone();
        let set: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(seconds.max(1))
            .query_async(&mut conn)
            .await?;

        if set.is_some() {
            return Ok(None);
        }

        let ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;
        Ok(Some(remaining_from_ttl(ttl, seconds)))
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

/// TTL is -1 (no expiry) or -2 (already gone) in races; both report at least one second.
fn remaining_from_ttl(ttl: i64, seconds: u64) -> u64 {
    if ttl > 0 {
        ttl as u64
    } else if ttl == -1 {
        seconds.max(1)
    } else {
        1
    }
}

// ────────────────────────────────────────────────────────────────────────────
// InMemoryCooldown
// ────────────────────────────────────────────────────────────────────────────

/// Process-local gate for tests and single-instance runs without Redis.
#[derive(Default)]
pub struct InMemoryCooldown {
    held: Mutex<HashMap<String, Instant>>,
}

#[async_trait]
impl CooldownGate for InMemoryCooldown {
    async fn try_acquire(&self, key: &str, seconds: u64) -> Result<Option<u64>> {
        let now = Instant::now();
        let mut held = self
            .held
            .lock()
            .map_err(|_| anyhow::anyhow!("cooldown lock poisoned"))?;
        held.retain(|_, until| *until > now);

        if let Some(until) = held.get(key) {
            let remaining = until.saturating_duration_since(now).as_secs_f64().ceil() as u64;
            return Ok(Some(remaining.max(1)));
        }

        held.insert(key.to_string(), now + Duration::from_secs(seconds));
        Ok(None)
    }

    async fn release(&self, key: &str) -> Result<()> {
        self.held
            .lock()
            .map_err(|_| anyhow::anyhow!("cooldown lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

/// Key for the shared AI-action cooldown of one user.
pub fn ai_action_key(user_id: uuid::Uuid) -> String {
    format!("cooldown:ai:{user_id}")
}
