use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_seconds: u64,
    pub connection_timeout_seconds: u64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("Invalid PORT"),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                tracing::warn!("JWT_SECRET is not set, using an insecure development secret");
                "insecure-dev-secret".to_string()
            }),
            token_ttl_seconds: env::var("TOKEN_TTL_SECONDS")
                .unwrap_or_else(|_| "360000".to_string())
                .parse()
                .expect("Invalid TOKEN_TTL_SECONDS"),
            connection_timeout_seconds: env::var("CONNECTION_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("Invalid CONNECTION_TIMEOUT_SECONDS"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
