use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};

/// Redis connection wrapper
pub struct RedisClient {
    connection: MultiplexedConnection,
}

impl RedisClient {
    pub async fn init(redis_url: &str) -> Result<Self, String> {
        let client =
            Client::open(redis_url).map_err(|e| format!("Failed to create Redis client: {}", e))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| format!("Failed to connect to Redis: {}", e))?;

        log::info!("Connected successfully to Redis");

        Ok(Self { connection })
    }

    pub fn get_connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }
}

/// Redis service for sessions and short-lived keys
#[derive(Clone)]
pub struct RedisService {
    connection: MultiplexedConnection,
}

impl RedisService {
    pub fn new(client: &RedisClient) -> Self {
        Self {
            connection: client.get_connection(),
        }
    }

    // ============================================
    // Session Management (JWT + Redis)
    // ============================================

    /// Store a session token in Redis
    pub async fn store_session(
        &self,
        user_id: &str,
        token: &str,
        expiry_seconds: u64,
    ) -> Result<(), String> {
        let mut conn = self.connection.clone();
        let key = format!("session:{}", user_id);

        conn.set_ex::<_, _, ()>(&key, token, expiry_seconds)
            .await
            .map_err(|e| format!("Failed to store session: {}", e))?;

        // Reverse lookup (token -> user_id) for validation
        let token_key = format!("token:{}", token);
        conn.set_ex::<_, _, ()>(&token_key, user_id, expiry_seconds)
            .await
            .map_err(|e| format!("Failed to store token mapping: {}", e))?;

        Ok(())
    }

    /// Validate a session token
    pub async fn validate_session(&self, token: &str) -> Result<Option<String>, String> {
        self.get(&format!("token:{}", token)).await
    }

    /// Get user's current session token
    pub async fn get_session(&self, user_id: &str) -> Result<Option<String>, String> {
        self.get(&format!("session:{}", user_id)).await
    }

    /// Invalidate a user's session (logout)
    pub async fn invalidate_session(&self, user_id: &str) -> Result<(), String> {
        if let Some(token) = self.get_session(user_id).await? {
            self.delete(&format!("token:{}", token)).await?;
        }

        self.delete(&format!("session:{}", user_id)).await?;
        Ok(())
    }

    // ============================================
    // Raw keys
    // ============================================

    pub async fn set_ex(&self, key: &str, value: &str, expiry_seconds: u64) -> Result<(), String> {
        let mut conn = self.connection.clone();

        conn.set_ex::<_, _, ()>(key, value, expiry_seconds)
            .await
            .map_err(|e| format!("Failed to set {}: {}", key, e))
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, String> {
        let mut conn = self.connection.clone();

        conn.get(key)
            .await
            .map_err(|e| format!("Failed to get {}: {}", key, e))
    }

    /// Returns whether the key existed.
    pub async fn delete(&self, key: &str) -> Result<bool, String> {
        let mut conn = self.connection.clone();

        let removed: u64 = conn
            .del(key)
            .await
            .map_err(|e| format!("Failed to delete {}: {}", key, e))?;

        Ok(removed > 0)
    }
}

/// Convenience function to connect to Redis
pub async fn connect_to_redis(redis_url: &str) -> Result<RedisClient, String> {
    RedisClient::init(redis_url).await
}
