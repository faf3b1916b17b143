//! Redis backend for the shared store.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use std::{collections::HashMap, time::Duration};

use crate::services::store::{KeyValueStore, StoreError};

/// Swaps the value of KEYS[1] when it matches the expectation.
///
/// ARGV: has_expected ("1"/"0"), expected, new value, ttl in ms (0 for none)
const COMPARE_AND_SET: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '1' then
	if current ~= ARGV[2] then return 0 end
else
	if current then return 0 end
end
if tonumber(ARGV[4]) > 0 then
	redis.call('SET', KEYS[1], ARGV[3], 'PX', ARGV[4])
else
	redis.call('SET', KEYS[1], ARGV[3])
end
return 1
"#;

/// Store backed by Redis.
///
/// The connection manager reconnects on its own; clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
	connection: ConnectionManager,
	compare_and_set: Script,
}

fn key_metadata(key: &str) -> Option<HashMap<String, String>> {
	Some(HashMap::from([("key".to_string(), key.to_string())]))
}

fn command_error(command: &str, key: &str, err: redis::RedisError) -> StoreError {
	StoreError::command_error(
		format!("{} failed", command),
		Some(Box::new(err)),
		key_metadata(key),
	)
}

impl RedisStore {
	/// Connects to the Redis server at `url`.
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		let client = redis::Client::open(url).map_err(|e| {
			StoreError::connection_error("invalid redis url", Some(Box::new(e)), None)
		})?;
		let connection = ConnectionManager::new(client).await.map_err(|e| {
			StoreError::connection_error("failed to connect to redis", Some(Box::new(e)), None)
		})?;

		tracing::info!("Connected to redis");
		Ok(Self {
			connection,
			compare_and_set: Script::new(COMPARE_AND_SET),
		})
	}

	fn conn(&self) -> ConnectionManager {
		self.connection.clone()
	}
}

#[async_trait]
impl KeyValueStore for RedisStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		self.conn()
			.get(key)
			.await
			.map_err(|e| command_error("GET", key, e))
	}

	async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
		let mut cmd = redis::cmd("SET");
		cmd.arg(key).arg(value);
		if let Some(ttl) = ttl {
			cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
		}
		cmd.query_async::<()>(&mut self.conn())
			.await
			.map_err(|e| command_error("SET", key, e))
	}

	async fn delete(&self, key: &str) -> Result<(), StoreError> {
		self.conn()
			.del::<_, ()>(key)
			.await
			.map_err(|e| command_error("DEL", key, e))
	}

	async fn incr(&self, key: &str, by: i64) -> Result<i64, StoreError> {
		self.conn()
			.incr(key, by)
			.await
			.map_err(|e| command_error("INCRBY", key, e))
	}

	async fn hincr_by(&self, key: &str, field: &str, by: i64) -> Result<i64, StoreError> {
		self.conn()
			.hincr(key, field, by)
			.await
			.map_err(|e| command_error("HINCRBY", key, e))
	}

	async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
		self.conn()
			.hgetall(key)
			.await
			.map_err(|e| command_error("HGETALL", key, e))
	}

	async fn set_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>, StoreError> {
		if offsets.is_empty() {
			return Ok(Vec::new());
		}
		let mut pipe = redis::pipe();
		pipe.atomic();
		for offset in offsets {
			pipe.cmd("SETBIT").arg(key).arg(*offset).arg(1);
		}
		let previous: Vec<u8> = pipe
			.query_async(&mut self.conn())
			.await
			.map_err(|e| command_error("SETBIT", key, e))?;
		Ok(previous.into_iter().map(|bit| bit == 1).collect())
	}

	async fn get_bits(&self, key: &str, offsets: &[u64]) -> Result<Vec<bool>, StoreError> {
		if offsets.is_empty() {
			return Ok(Vec::new());
		}
		let mut pipe = redis::pipe();
		for offset in offsets {
			pipe.cmd("GETBIT").arg(key).arg(*offset);
		}
		let bits: Vec<u8> = pipe
			.query_async(&mut self.conn())
			.await
			.map_err(|e| command_error("GETBIT", key, e))?;
		Ok(bits.into_iter().map(|bit| bit == 1).collect())
	}

	async fn bit_count(&self, key: &str) -> Result<u64, StoreError> {
		redis::cmd("BITCOUNT")
			.arg(key)
			.query_async::<u64>(&mut self.conn())
			.await
			.map_err(|e| command_error("BITCOUNT", key, e))
	}

	async fn compare_and_set(
		&self,
		key: &str,
		expected: Option<&str>,
		new_value: &str,
		ttl: Option<Duration>,
	) -> Result<bool, StoreError> {
		let ttl_ms = ttl.map(|t| t.as_millis().max(1) as u64).unwrap_or(0);
		let swapped: i64 = self
			.compare_and_set
			.key(key)
			.arg(if expected.is_some() { "1" } else { "0" })
			.arg(expected.unwrap_or_default())
			.arg(new_value)
			.arg(ttl_ms)
			.invoke_async(&mut self.conn())
			.await
			.map_err(|e| command_error("EVALSHA compare_and_set", key, e))?;
		Ok(swapped == 1)
	}
}
