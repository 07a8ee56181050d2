// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used by e2b-writer

// Credentials
pub const E2B_API_KEY: &str = "E2B_API_KEY";

// Remote backend overrides
pub const E2B_API_URL: &str = "E2B_API_URL";
pub const E2B_DOMAIN: &str = "E2B_DOMAIN";
pub const E2B_TEMPLATE: &str = "E2B_TEMPLATE";

// Pipeline configuration
pub const E2B_WRITER_CONFIG: &str = "E2B_WRITER_CONFIG";
pub const E2B_WRITER_LOG: &str = "E2B_WRITER_LOG";

// Defaults
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_STAGING_DIR: &str = "/home/user/data";
