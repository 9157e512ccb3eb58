use anyhow::Result;
use std::env;

pub struct AppConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let database = DatabaseConfig {
            host: env::var("DATABASE_HOST").unwrap_or("localhost".into()),
            port: env::var("DATABASE_PORT")
                .unwrap_or("5432".into())
                .parse::<u16>()?,
            username: env::var("DATABASE_USERNAME").unwrap_or("app".into()),
            password: env::var("DATABASE_PASSWORD").unwrap_or("passwd".into()),
            database: env::var("DATABASE_NAME").unwrap_or("app".into()),
        };
        let redis = RedisConfig {
            host: env::var("REDIS_HOST").unwrap_or("localhost".into()),
            port: env::var("REDIS_PORT")
                .unwrap_or("6379".into())
                .parse::<u16>()?,
        };
        let auth = AuthConfig {
            ttl: env::var("AUTH_TOKEN_TTL")
                .unwrap_or("86400".into())
                .parse::<u64>()?,
        };
        Ok(Self {
            database,
            redis,
            auth,
        })
    }
}

pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

pub struct AuthConfig {
    pub ttl: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    // 環境変数が無いときは開発用の既定値で組み立てられる
    #[test]
    fn builds_from_defaults() {
        let config = AppConfig::new().unwrap();
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.auth.ttl, 86400);
    }
}
