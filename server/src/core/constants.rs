// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "TaskSync";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "tasksync";

/// Crate name used as the default tracing target
pub const CRATE_NAME: &str = "tasksync_server";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".tasksync";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "tasksync.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TASKSYNC_CONFIG";

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "TASKSYNC_DEBUG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "TASKSYNC_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "TASKSYNC_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "TASKSYNC_LOG";

/// Environment variable selecting log output format (`compact` or `json`)
pub const ENV_LOG_FORMAT: &str = "TASKSYNC_LOG_FORMAT";

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "TASKSYNC_DATA_DIR";

// =============================================================================
// Environment Variables - Auth & Database
// =============================================================================

/// Environment variable for the JWT signing secret
pub const ENV_JWT_SECRET: &str = "TASKSYNC_JWT_SECRET";

/// Environment variable for session lifetime in hours
pub const ENV_SESSION_TTL_HOURS: &str = "TASKSYNC_SESSION_TTL_HOURS";

/// Environment variable for SQLite pool size
pub const ENV_DB_MAX_CONNECTIONS: &str = "TASKSYNC_DB_MAX_CONNECTIONS";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5400;

/// Maximum accepted JSON body size
pub const API_BODY_LIMIT_BYTES: usize = 1024 * 1024;

// =============================================================================
// Auth
// =============================================================================

/// Default session token lifetime
pub const DEFAULT_SESSION_TTL_HOURS: u64 = 24 * 7;

/// Minimum accepted length of a configured JWT secret
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Minimum password length at signup
pub const MIN_PASSWORD_LEN: u64 = 8;

// =============================================================================
// SQLite
// =============================================================================

/// SQLite database file name
pub const SQLITE_DB_FILENAME: &str = "tasksync.db";

/// Default connection pool size
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// Busy timeout for locked database
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// Page cache size (negative = KiB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// Pages between automatic WAL checkpoints
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// Interval of the background WAL checkpoint task
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// Task Engine
// =============================================================================

/// Seconds an undo entry stays restorable
pub const UNDO_WINDOW_SECS: i64 = 10;

/// Seconds a comment stays editable by its author
pub const COMMENT_EDIT_WINDOW_SECS: i64 = 15 * 60;

/// Default page size for paginated listings
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Upper bound for page size
pub const MAX_PAGE_SIZE: u32 = 100;

/// Deepest parent chain the cascade walk will follow
pub const MAX_TASK_DEPTH: usize = 1024;

// =============================================================================
// Realtime
// =============================================================================

/// Per-topic broadcast channel capacity
pub const DEFAULT_TOPIC_CHANNEL_CAPACITY: usize = 1024;

/// SSE keep-alive interval
pub const SSE_KEEP_ALIVE_SECS: u64 = 30;

// =============================================================================
// Shutdown
// =============================================================================

/// Maximum time to wait for background tasks on shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
