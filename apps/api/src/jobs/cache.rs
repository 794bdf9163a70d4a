//! Short-lived cache of job search results, keyed by the normalized search.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use crate::jobs::adzuna::JobListing;

pub const SEARCH_CACHE_TTL_SECS: u64 = 600;

#[async_trait]
pub trait SearchCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<JobListing>>>;
    async fn put(&self, key: &str, jobs: &[JobListing], ttl_secs: u64) -> Result<()>;
}

/// Case-insensitive on query and location; `results` is part of the key.
pub fn search_key(query: &str, location: &str, results: u32) -> String {
    format!(
        "jobs:search:{}:{}:{results}",
        query.trim().to_lowercase(),
        location.trim().to_lowercase()
    )
}

pub struct RedisSearchCache {
    conn: MultiplexedConnection,
}

impl RedisSearchCache {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SearchCache for RedisSearchCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<JobListing>>> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(match cached {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        })
    }

    async fn put(&self, key: &str, jobs: &[JobListing], ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(jobs)?;
        redis::cmd("SET")
            .arg(key)
            .arg(json)
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySearchCache {
    entries: Mutex<HashMap<String, (Instant, Vec<JobListing>)>>,
}

#[async_trait]
impl SearchCache for InMemorySearchCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<JobListing>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("search cache lock poisoned"))?;
        Ok(entries
            .get(key)
            .filter(|(until, _)| *until > Instant::now())
            .map(|(_, jobs)| jobs.clone()))
    }

    async fn put(&self, key: &str, jobs: &[JobListing], ttl_secs: u64) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("search cache lock poisoned"))?;
        let until = Instant::now() + Duration::from_secs(ttl_secs);
        entries.insert(key.to_string(), (until, jobs.to_vec()));
        Ok(())
    }
}
