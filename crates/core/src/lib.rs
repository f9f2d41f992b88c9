//! envgrid core library
//!
//! Shared pieces for the gateway and the readings engine:
//! - Configuration discovery and loading (XDG-compliant)
//! - Service-wide defaults

mod config;

pub use config::{find_config_file, load_config, ConfigSource};

/// Application name used for XDG paths
pub const APP_NAME: &str = "envgrid";

/// Default gateway port
pub const DEFAULT_GATEWAY_PORT: u16 = 9810;

/// Default lifetime of cached point series and aggregates (10 minutes)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

/// Default bound on a single upstream call
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 8;

/// Default neighborhood: a 5x5 lattice
pub const DEFAULT_GRID_SIZE: usize = 5;

/// Default lattice spacing in degrees (roughly 3 km)
pub const DEFAULT_GRID_STEP: f64 = 0.03;

/// Default lookback when a request gives no start date
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;
