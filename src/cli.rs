use clap::Parser;

/// All connection settings live in the environment; the flags here only
/// adjust how a run behaves, and a bare invocation performs a full sync.
#[derive(Parser, Debug)]
#[command(
    name = "blogsync-rs",
    about = "Mirror a local blog's posts and images into Supabase Storage buckets"
)]
pub struct Cli {
    /// Plan and log actions without touching the remote buckets
    #[arg(long)]
    pub dry_run: bool,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<String>,

    /// Log level (RUST_LOG overrides this)
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

/// Verbosity for the log filter when RUST_LOG is unset.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_defaults() {
        let cli = Cli::try_parse_from(["blogsync-rs"]).unwrap();
        assert!(!cli.dry_run);
        assert!(cli.env_file.is_none());
        assert_eq!(cli.log_level, LogLevel::Info);
    }

    #[test]
    fn test_dry_run_flag() {
        let cli = Cli::try_parse_from(["blogsync-rs", "--dry-run"]).unwrap();
        assert!(cli.dry_run);
    }

    #[test]
    fn test_env_file_path() {
        let cli = Cli::try_parse_from(["blogsync-rs", "--env-file", "/etc/blogsync.env"]).unwrap();
        assert_eq!(cli.env_file.as_deref(), Some("/etc/blogsync.env"));
    }

    #[test]
    fn test_log_level_values() {
        let cli = Cli::try_parse_from(["blogsync-rs", "--log-level", "warn"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert_eq!(cli.log_level.as_filter(), "warn");

        assert!(Cli::try_parse_from(["blogsync-rs", "--log-level", "loud"]).is_err());
    }
}
