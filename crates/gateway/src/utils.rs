use clap::Parser;
use envgrid_core::{
    find_config_file, load_config, ConfigSource, DEFAULT_CACHE_TTL_SECS, DEFAULT_GATEWAY_PORT,
    DEFAULT_GRID_SIZE, DEFAULT_GRID_STEP, DEFAULT_UPSTREAM_TIMEOUT_SECS,
};
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};
use log::LevelFilter;
use readings::{providers, SamplerConfig};
use std::{env, time::Duration};
use time::{format_description::well_known::Iso8601, OffsetDateTime};

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "envgrid gateway - grid-aggregated climate readings and air quality over HTTP"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $ENVGRID_CONFIG, ./envgrid.toml,
    /// $XDG_CONFIG_HOME/envgrid/envgrid.toml, /etc/envgrid/envgrid.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "ENVGRID_LEVEL")]
    pub level: Option<String>,

    /// Host to listen on (use 0.0.0.0 for all interfaces)
    #[arg(long, env = "ENVGRID_HOST")]
    #[serde(alias = "domain")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "ENVGRID_PORT")]
    pub port: Option<String>,

    /// Seconds a fetched point series or aggregate stays cached
    #[arg(long, env = "ENVGRID_CACHE_TTL_SECS")]
    pub cache_ttl_secs: Option<u64>,

    /// Points per side of the sampling lattice (odd)
    #[arg(long, env = "ENVGRID_GRID_SIZE")]
    pub grid_size: Option<usize>,

    /// Degrees between neighbouring lattice points
    #[arg(long, env = "ENVGRID_GRID_STEP")]
    pub grid_step: Option<f64>,

    /// Perturb each fetched value by up to this percentage (off when unset)
    #[arg(long, env = "ENVGRID_NOISE_PERCENT")]
    pub noise_percent: Option<f64>,

    /// Seconds to wait on a single upstream call
    #[arg(long, env = "ENVGRID_UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,

    /// NASA POWER daily point endpoint
    #[arg(long, env = "ENVGRID_NASA_BASE_URL")]
    pub nasa_base_url: Option<String>,

    /// NASA POWER parameters to request, comma separated
    #[arg(long, env = "ENVGRID_NASA_PARAMETERS", value_delimiter = ',')]
    pub nasa_parameters: Option<Vec<String>>,

    /// NASA POWER community (AG, RE or SB)
    #[arg(long, env = "ENVGRID_NASA_COMMUNITY")]
    pub nasa_community: Option<String>,

    /// World Air Quality Index API root
    #[arg(long, env = "ENVGRID_WAQI_BASE_URL")]
    pub waqi_base_url: Option<String>,

    /// World Air Quality Index API token; air quality is disabled without it
    #[arg(long, env = "ENVGRID_WAQI_TOKEN")]
    pub waqi_token: Option<String>,

    /// User-Agent sent to upstream providers
    #[arg(long, env = "ENVGRID_USER_AGENT")]
    pub user_agent: Option<String>,
}

impl Cli {
    pub fn host(&self) -> String {
        self.host.clone().unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn port(&self) -> String {
        self.port
            .clone()
            .unwrap_or_else(|| DEFAULT_GATEWAY_PORT.to_string())
    }

    pub fn nasa_base_url(&self) -> String {
        self.nasa_base_url
            .clone()
            .unwrap_or_else(|| providers::nasa_power::DEFAULT_BASE_URL.to_string())
    }

    /// Blank entries are dropped; an empty list means the built-in set.
    pub fn nasa_parameters(&self) -> Vec<String> {
        self.nasa_parameters
            .iter()
            .flatten()
            .map(|p| p.trim().to_uppercase())
            .filter(|p| !p.is_empty())
            .collect()
    }

    pub fn nasa_community(&self) -> String {
        self.nasa_community
            .clone()
            .unwrap_or_else(|| providers::nasa_power::DEFAULT_COMMUNITY.to_string())
    }

    pub fn waqi_base_url(&self) -> String {
        self.waqi_base_url
            .clone()
            .unwrap_or_else(|| providers::waqi::DEFAULT_BASE_URL.to_string())
    }

    /// Blank tokens count as missing.
    pub fn waqi_token(&self) -> Option<String> {
        self.waqi_token
            .as_ref()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("envgrid/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(
            self.upstream_timeout_secs
                .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        )
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            grid_size: self.grid_size.unwrap_or(DEFAULT_GRID_SIZE),
            grid_step: self.grid_step.unwrap_or(DEFAULT_GRID_STEP),
            cache_ttl_secs: self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS),
            upstream_timeout_secs: self
                .upstream_timeout_secs
                .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            noise_percent: self.noise_percent,
        }
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Cli {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("ENVGRID_CONFIG", "envgrid.toml")
    };

    if let Some(path) = source.path() {
        log::info!("Loading config from: {}", path.display());
    }

    let file_config: Cli = load_config(&source).unwrap_or_default();
    merge_config(cli_args, file_config)
}

/// CLI args (and the env vars clap reads) win over the config file.
pub fn merge_config(cli_args: Cli, file_config: Cli) -> Cli {
    Cli {
        config: cli_args.config,
        level: cli_args.level.or(file_config.level),
        host: cli_args.host.or(file_config.host),
        port: cli_args.port.or(file_config.port),
        cache_ttl_secs: cli_args.cache_ttl_secs.or(file_config.cache_ttl_secs),
        grid_size: cli_args.grid_size.or(file_config.grid_size),
        grid_step: cli_args.grid_step.or(file_config.grid_step),
        noise_percent: cli_args.noise_percent.or(file_config.noise_percent),
        upstream_timeout_secs: cli_args
            .upstream_timeout_secs
            .or(file_config.upstream_timeout_secs),
        nasa_base_url: cli_args.nasa_base_url.or(file_config.nasa_base_url),
        nasa_parameters: cli_args.nasa_parameters.or(file_config.nasa_parameters),
        nasa_community: cli_args.nasa_community.or(file_config.nasa_community),
        waqi_base_url: cli_args.waqi_base_url.or(file_config.waqi_base_url),
        waqi_token: cli_args.waqi_token.or(file_config.waqi_token),
        user_agent: cli_args.user_agent.or(file_config.user_agent),
    }
}

pub fn get_log_level(cli: &Cli) -> LevelFilter {
    let level_str = cli
        .level
        .clone()
        .or_else(|| env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    match level_str.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

pub fn setup_logger() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Blue)
        .warn(Color::Yellow)
        .error(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let now = OffsetDateTime::now_utc()
                .format(&Iso8601::DEFAULT)
                .unwrap_or_default();
            out.finish(format_args!(
                "[{} {}] {}: {}",
                now,
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .chain(std::io::stdout())
}
