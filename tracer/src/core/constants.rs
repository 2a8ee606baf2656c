// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "traceline";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "traceline.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TRACELINE_CONFIG";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "TRACELINE_LOG";

/// Environment variable enabling/disabling tracing entirely
pub const ENV_ENABLED: &str = "TRACELINE_ENABLED";

/// Environment variable for the backend API base URL
pub const ENV_API_URL: &str = "TRACELINE_API_URL";

/// Environment variable for the backend API key
pub const ENV_API_KEY: &str = "TRACELINE_API_KEY";

/// Environment variable for the backend project name
pub const ENV_PROJECT: &str = "TRACELINE_PROJECT";

// =============================================================================
// Backend Defaults
// =============================================================================

/// Default backend API base URL
pub const DEFAULT_API_URL: &str = "https://api.traceline.dev";

/// Default project spans are filed under
pub const DEFAULT_PROJECT: &str = "agent-sessions";

// =============================================================================
// Host Agent Integration
// =============================================================================

/// Host agent config directory under the platform config dir
pub const HOST_CONFIG_DIR: &str = "opencode";

/// Host agent config file name
pub const HOST_CONFIG_FILE: &str = "opencode.json";

// =============================================================================
// Span Shaping
// =============================================================================

/// Maximum characters of tool output carried on a tool span
pub const TOOL_OUTPUT_MAX_CHARS: usize = 10_000;

/// Maximum characters of a tool display title
pub const TITLE_MAX_CHARS: usize = 50;

/// Tools whose display title is a filesystem path
pub const FILE_TOOLS: &[&str] = &["read", "write", "edit"];

/// Error name used when the host reports a failure without one
pub const DEFAULT_ERROR_NAME: &str = "UnknownError";
