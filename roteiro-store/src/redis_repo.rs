use async_trait::async_trait;
use chrono::Utc;
use redis::aio::MultiplexedConnection;
use tracing::{error, info};
use uuid::Uuid;

use roteiro_core::holds::{RateLimiter, SeatHold, SeatHoldStore};
use roteiro_core::{CoreError, CoreResult};

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

fn redis_error(err: redis::RedisError) -> CoreError {
    error!("Redis command failed: {}", err);
    CoreError::InternalError(format!("redis: {err}"))
}

fn hold_key(package_id: Uuid, seat: u32) -> String {
    format!("hold:{}:{}", package_id, seat)
}

/// Sorted set of held seats per package, scored by expiry (unix seconds).
fn index_key(package_id: Uuid) -> String {
    format!("holds:{}", package_id)
}

const RELEASE_IF_OWNER: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    else
        return 0
    end
"#;

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> CoreResult<MultiplexedConnection> {
        self.client.get_multiplexed_async_connection().await.map_err(redis_error)
    }

    async fn release_owned(&self, conn: &mut MultiplexedConnection, package_id: Uuid, seats: &[u32], token: &str) -> CoreResult<()> {
        let script = redis::Script::new(RELEASE_IF_OWNER);
        for &seat in seats {
            let deleted: i64 = script
                .key(hold_key(package_id, seat))
                .arg(token)
                .invoke_async(conn)
                .await
                .map_err(redis_error)?;
            if deleted == 1 {
                let _: () = redis::cmd("ZREM")
                    .arg(index_key(package_id))
                    .arg(seat)
                    .query_async(conn)
                    .await
                    .map_err(redis_error)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SeatHoldStore for RedisClient {
    async fn hold_seats(&self, package_id: Uuid, seats: &[u32], token: &str, ttl_seconds: u64) -> CoreResult<Vec<u32>> {
        let mut conn = self.connection().await?;
        let mut acquired = Vec::new();
        let mut conflicts = Vec::new();

        for &seat in seats {
            let key = hold_key(package_id, seat);
            // SET NX: only the first session gets the seat
            let set: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg(token)
                .arg("NX")
                .arg("EX")
                .arg(ttl_seconds)
                .query_async(&mut conn)
                .await
                .map_err(redis_error)?;
            if set.is_some() {
                acquired.push(seat);
                continue;
            }

            let owner: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut conn).await.map_err(redis_error)?;
            if owner.as_deref() == Some(token) {
                let _: () = redis::cmd("EXPIRE")
                    .arg(&key)
                    .arg(ttl_seconds)
                    .query_async(&mut conn)
                    .await
                    .map_err(redis_error)?;
            } else {
                conflicts.push(seat);
            }
        }

        if !conflicts.is_empty() {
            self.release_owned(&mut conn, package_id, &acquired, token).await?;
            conflicts.sort_unstable();
            return Ok(conflicts);
        }

        let expires_at = Utc::now().timestamp() + ttl_seconds as i64;
        let index = index_key(package_id);
        for &seat in seats {
            let _: () = redis::cmd("ZADD")
                .arg(&index)
                .arg(expires_at)
                .arg(seat)
                .query_async(&mut conn)
                .await
                .map_err(redis_error)?;
        }
        let _: () = redis::cmd("EXPIRE")
            .arg(&index)
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;

        info!("Held seats {:?} on package {} for {}s", seats, package_id, ttl_seconds);
        Ok(Vec::new())
    }

    async fn held_seats(&self, package_id: Uuid) -> CoreResult<Vec<SeatHold>> {
        let mut conn = self.connection().await?;
        let index = index_key(package_id);

        let _: () = redis::cmd("ZREMRANGEBYSCORE")
            .arg(&index)
            .arg("-inf")
            .arg(Utc::now().timestamp())
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;

        let members: Vec<u32> = redis::cmd("ZRANGE")
            .arg(&index)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = members.iter().map(|&seat| hold_key(package_id, seat)).collect();
        let owners: Vec<Option<String>> = redis::cmd("MGET").arg(&keys).query_async(&mut conn).await.map_err(redis_error)?;

        Ok(members
            .into_iter()
            .zip(owners)
            .filter_map(|(seat, owner)| owner.map(|token| SeatHold { seat, token }))
            .collect())
    }

    async fn release_seats(&self, package_id: Uuid, seats: &[u32], token: &str) -> CoreResult<()> {
        let mut conn = self.connection().await?;
        self.release_owned(&mut conn, package_id, seats, token).await
    }
}

#[async_trait]
impl RateLimiter for RedisClient {
    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> CoreResult<bool> {
        let mut conn = self.connection().await?;

        let (count,): (i64,) = rate_limit_pipe(key, window_seconds)
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;

        Ok(count <= limit)
    }
}

/// Fixed window: the TTL is set once, when the window opens, and later hits
/// only increment.
fn rate_limit_pipe(key: &str, window_seconds: i64) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("SET")
        .arg(key)
        .arg(0)
        .arg("NX")
        .arg("EX")
        .arg(window_seconds)
        .ignore()
        .incr(key, 1);
    pipe
}
