pub mod db;
pub mod redis;

pub use db::{Sequences, connect_to_mongo, ensure_indexes, is_duplicate_key};
pub use redis::{RedisClient, RedisService, connect_to_redis};
