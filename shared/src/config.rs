use std::time::Duration;

use dotenv::dotenv;
use regex::Regex;

use crate::error::Error;

pub const DEFAULT_PORT: u16 = 9042;

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster_ips: String,
    pub port: u16,
    pub keyspace: String,
    pub replication_factor: u32,
    pub connect_retries: u32,
    pub connect_retry_delay: Duration,
    pub request_timeout: Duration,
    /// Write each trade to its four tables as one logged batch. When false the
    /// tables are written one after another and failures are reported per table.
    pub logged_batch: bool,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cluster_ips: "localhost".to_string(),
            port: DEFAULT_PORT,
            keyspace: "investments".to_string(),
            replication_factor: 1,
            connect_retries: 3,
            connect_retry_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            logged_batch: true,
            log_file: "investments.log".to_string(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, Error> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value `{}`", key, raw))),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        dotenv().ok();
        let defaults = Config::default();

        Ok(Config {
            cluster_ips: env_or("CASSANDRA_CLUSTER_IPS", defaults.cluster_ips)?,
            port: env_or("CASSANDRA_PORT", defaults.port)?,
            keyspace: env_or("CASSANDRA_KEYSPACE", defaults.keyspace)?,
            replication_factor: env_or(
                "CASSANDRA_REPLICATION_FACTOR",
                defaults.replication_factor,
            )?,
            connect_retries: env_or("CASSANDRA_CONNECT_RETRIES", defaults.connect_retries)?,
            connect_retry_delay: Duration::from_secs(env_or(
                "CASSANDRA_CONNECT_RETRY_DELAY_SECS",
                defaults.connect_retry_delay.as_secs(),
            )?),
            request_timeout: Duration::from_secs(env_or(
                "CASSANDRA_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            logged_batch: env_or("CASSANDRA_LOGGED_BATCH", defaults.logged_batch)?,
            log_file: env_or("INVESTMENTS_LOG_FILE", defaults.log_file)?,
        })
    }

    /// Contact points as `host:port`, adding the configured port where missing.
    pub fn contact_points(&self) -> Vec<String> {
        self.cluster_ips
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(|host| {
                let has_port = if host.starts_with('[') {
                    host.contains("]:")
                } else {
                    host.matches(':').count() == 1
                };
                if has_port {
                    host.to_string()
                } else if host.contains(':') {
                    format!("[{}]:{}", host, self.port)
                } else {
                    format!("{}:{}", host, self.port)
                }
            })
            .collect()
    }

    /// Checks values that end up in DDL text, which cannot use bind markers.
    pub fn validate(&self) -> Result<(), Error> {
        let identifier = Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,47}$")
            .map_err(|e| Error::Config(e.to_string()))?;
        if !identifier.is_match(&self.keyspace) {
            return Err(Error::Config(format!(
                "keyspace `{}` is not a valid CQL identifier",
                self.keyspace
            )));
        }
        if self.replication_factor == 0 {
            return Err(Error::Config("replication factor must be at least 1".into()));
        }
        if self.contact_points().is_empty() {
            return Err(Error::Config("no cluster contact points given".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_points_add_default_port() {
        let config = Config {
            cluster_ips: "10.0.0.1, 10.0.0.2:9142,,::1,[::2]:9000".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.contact_points(),
            vec!["10.0.0.1:9042", "10.0.0.2:9142", "[::1]:9042", "[::2]:9000"]
        );
    }

    #[test]
    fn test_validate_rejects_bad_keyspace() {
        let config = Config {
            keyspace: "invest; DROP KEYSPACE x".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_replication() {
        let config = Config {
            replication_factor: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
