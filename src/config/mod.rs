use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::registry::PartitionTarget;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub federation: FederationConfig,
    /// Static site map; the registry is built from this at startup.
    pub sites: Vec<PartitionTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Per-partition budget for a fan-out query; an unresponsive remote is
    /// dropped once this elapses.
    pub fanout_timeout_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs =
                v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("FEDERATION_FANOUT_TIMEOUT_MS") {
            self.federation.fanout_timeout_ms =
                v.parse().unwrap_or(self.federation.fanout_timeout_ms);
        }
        if let Ok(v) = env::var("PARTITION_SITES") {
            // A malformed site map is a startup fault, never a silent fallback.
            self.sites =
                parse_sites(&v).unwrap_or_else(|e| panic!("invalid PARTITION_SITES: {}", e));
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                acquire_timeout_secs: 30,
            },
            security: SecurityConfig {
                jwt_secret: "dev-only-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            federation: FederationConfig {
                fanout_timeout_ms: 2_000,
            },
            sites: default_sites(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                acquire_timeout_secs: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(), // must come from JWT_SECRET
                jwt_expiry_hours: 24,
            },
            federation: FederationConfig {
                fanout_timeout_ms: 3_000,
            },
            sites: default_sites(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                acquire_timeout_secs: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(), // must come from JWT_SECRET
                jwt_expiry_hours: 4,
            },
            federation: FederationConfig {
                fanout_timeout_ms: 5_000,
            },
            sites: default_sites(),
        }
    }
}

/// Built-in three-site topology: the central site doubles as the catalog
/// target and aggregation root, the other two are remote partitions.
fn default_sites() -> Vec<PartitionTarget> {
    vec![
        PartitionTarget {
            tenant_id: 1,
            name: "central".to_string(),
            database: "medcenter_central".to_string(),
            aggregation_root: true,
        },
        PartitionTarget {
            tenant_id: 2,
            name: "north".to_string(),
            database: "medcenter_north".to_string(),
            aggregation_root: false,
        },
        PartitionTarget {
            tenant_id: 3,
            name: "south".to_string(),
            database: "medcenter_south".to_string(),
            aggregation_root: false,
        },
    ]
}

/// Parse a site map of the form `id:name:database[:root],...`, e.g.
/// `1:central:medcenter_central:root,2:north:medcenter_north`.
pub fn parse_sites(raw: &str) -> Result<Vec<PartitionTarget>, String> {
    let mut sites = Vec::new();

    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let fields: Vec<&str> = part.split(':').collect();
        let (tenant_id, name, database, root) = match fields.as_slice() {
            [id, name, db] => (*id, *name, *db, false),
            [id, name, db, flag] if *flag == "root" => (*id, *name, *db, true),
            _ => return Err(format!("malformed site entry '{}'", part)),
        };

        let tenant_id: i64 = tenant_id
            .parse()
            .map_err(|_| format!("tenant id '{}' is not an integer", tenant_id))?;
        if name.is_empty() || database.is_empty() {
            return Err(format!("empty name or database in '{}'", part));
        }

        sites.push(PartitionTarget {
            tenant_id,
            name: name.to_string(),
            database: database.to_string(),
            aggregation_root: root,
        });
    }

    if sites.is_empty() {
        return Err("no site entries".to_string());
    }
    Ok(sites)
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.sites.len(), 3);
        assert!(config.sites[0].aggregation_root);
    }

    #[test]
    fn parses_site_map() {
        let sites =
            parse_sites("1:central:medcenter_central:root, 2:north:medcenter_north").unwrap();
        assert_eq!(sites.len(), 2);
        assert!(sites[0].aggregation_root);
        assert!(!sites[1].aggregation_root);
        assert_eq!(sites[1].database, "medcenter_north");
    }

    #[test]
    fn rejects_malformed_site_map() {
        assert!(parse_sites("").is_err());
        assert!(parse_sites("one:central:db").is_err());
        assert!(parse_sites("1:central").is_err());
        assert!(parse_sites("1:central:db:primary").is_err());
    }
}
