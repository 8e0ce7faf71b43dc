//! Read-through TTL cache in front of movie reads.
//!
//! Entries expire passively: staleness is only checked when an entry is read.
//! After a committed rating change the service calls [`MovieCache::refresh`],
//! which re-reads the movie and replaces the entry with a fresh TTL so a read
//! right after the commit already sees the new aggregate.
//!
//! The map is split into independently locked shards chosen by a hash of the
//! movie id. With one shard this is a single reader/writer lock over the whole
//! cache. No lock is held while the store is being read.
//!
//! Every store read takes a ticket before it is issued. An entry is only
//! replaced by a read with a newer ticket, so a miss that started before a
//! commit cannot overwrite the refresh that followed it. Invalidation leaves
//! a ticketed tombstone for the same reason: a read issued before the
//! invalidation cannot bring the old movie back.

use std::{
    collections::{HashMap, hash_map::DefaultHasher},
    hash::{Hash, Hasher},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::RwLock, time::Instant};

use crate::{aggregate::Aggregate, db::MovieStore, errors::AppError, models::Movie};

#[derive(Debug, Clone)]
struct CacheEntry {
    // `None` marks an invalidated movie
    movie: Option<Movie>,
    expires_at: Instant,
    ticket: u64,
}

type Shard = RwLock<HashMap<i64, CacheEntry>>;

pub struct MovieCache<S> {
    store: Arc<S>,
    shards: Vec<Shard>,
    ttl: Duration,
    tickets: AtomicU64,
}

impl<S: MovieStore> MovieCache<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self::with_shards(store, ttl, 1)
    }

    pub fn with_shards(store: Arc<S>, ttl: Duration, shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            store,
            shards,
            ttl,
            tickets: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached movie while it is fresh, otherwise reads it from
    /// the store and caches it.
    pub async fn get(&self, movie_id: i64) -> Result<Movie, AppError> {
        {
            let shard = self.shard(movie_id).read().await;
            if let Some(CacheEntry {
                movie: Some(movie),
                expires_at,
                ..
            }) = shard.get(&movie_id)
            {
                if *expires_at > Instant::now() {
                    tracing::debug!("Movie cache hit for {}", movie_id);
                    return Ok(movie.clone());
                }
            }
        }

        tracing::debug!("Movie cache miss for {}", movie_id);
        self.load(movie_id).await
    }

    pub async fn aggregate(&self, movie_id: i64) -> Result<Aggregate, AppError> {
        Ok(self.get(movie_id).await?.aggregate())
    }

    /// Re-reads the movie and replaces its entry with a fresh TTL.
    pub async fn refresh(&self, movie_id: i64) -> Result<Movie, AppError> {
        self.load(movie_id).await
    }

    pub async fn invalidate(&self, movie_id: i64) {
        let ticket = self.next_ticket();
        self.shard(movie_id).write().await.insert(
            movie_id,
            CacheEntry {
                movie: None,
                expires_at: Instant::now() + self.ttl,
                ticket,
            },
        );
    }

    /// Drops every expired entry and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for shard in &self.shards {
            let mut shard = shard.write().await;
            let before = shard.len();
            shard.retain(|_, entry| entry.expires_at > now);
            removed += before - shard.len();
        }
        removed
    }

    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard
                .read()
                .await
                .values()
                .filter(|entry| entry.movie.is_some())
                .count();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn load(&self, movie_id: i64) -> Result<Movie, AppError> {
        let ticket = self.next_ticket();
        let movie = self.store.get_movie(movie_id, None).await?;

        let mut shard = self.shard(movie_id).write().await;
        match shard.get(&movie_id) {
            Some(current) if current.ticket > ticket => {
                tracing::debug!("Movie {} was refreshed by a newer read", movie_id);
            }
            _ => {
                shard.insert(
                    movie_id,
                    CacheEntry {
                        movie: Some(movie.clone()),
                        expires_at: Instant::now() + self.ttl,
                        ticket,
                    },
                );
            }
        }
        Ok(movie)
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn shard(&self, movie_id: i64) -> &Shard {
        &self.shards[shard_index(movie_id, self.shards.len())]
    }
}

fn shard_index(movie_id: i64, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    movie_id.hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}
