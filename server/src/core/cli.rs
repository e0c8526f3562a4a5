use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_CONFIG, ENV_DB_MAX_CONNECTIONS, ENV_DEBUG, ENV_HOST, ENV_JWT_SECRET, ENV_PORT,
    ENV_SESSION_TTL_HOURS,
};

#[derive(Parser)]
#[command(name = "tasksync")]
#[command(version, about = "Multi-tenant task tracking server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Enable debug mode (verbose request tracing)
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Secret used to sign session tokens
    #[arg(long, global = true, env = ENV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Session token lifetime in hours
    #[arg(long, global = true, env = ENV_SESSION_TTL_HOURS)]
    pub session_ttl_hours: Option<u64>,

    /// SQLite connection pool size
    #[arg(long, global = true, env = ENV_DB_MAX_CONNECTIONS)]
    pub db_max_connections: Option<u32>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Print the resolved data directory and exit
    DataDir,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub jwt_secret: Option<String>,
    pub session_ttl_hours: Option<u64>,
    pub db_max_connections: Option<u32>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        debug: cli.debug,
        config: cli.config,
        jwt_secret: cli.jwt_secret,
        session_ttl_hours: cli.session_ttl_hours,
        db_max_connections: cli.db_max_connections,
    };
    (config, cli.command)
}
