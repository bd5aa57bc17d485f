use std::fmt;
use std::path::PathBuf;

/// Runtime configuration, sourced from the environment.
///
/// Every variable is required. The tool is meant to run unattended from a
/// shell alias or CI step, where a missing variable should fail loudly
/// before anything is listed or mutated.
pub struct Config {
    pub content_dir: PathBuf,
    pub image_dir: PathBuf,
    pub content_bucket: String,
    pub image_bucket: String,
    pub endpoint: String,
    pub service_key: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("content_dir", &self.content_dir)
            .field("image_dir", &self.image_dir)
            .field("content_bucket", &self.content_bucket)
            .field("image_bucket", &self.image_bucket)
            .field("endpoint", &self.endpoint)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

/// Expand ~ to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// An empty value counts as missing, matching how the variables behave
    /// in the shell scripts that set them.
    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| -> anyhow::Result<String> {
            match lookup(key) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => anyhow::bail!("Missing required environment variable {}", key),
            }
        };

        Ok(Self {
            content_dir: expand_tilde(&require("BLOG_PATH")?),
            image_dir: expand_tilde(&require("IMAGE_PATH")?),
            content_bucket: require("SUPABASE_CONTENT_BUCKET_NAME")?,
            image_bucket: require("SUPABASE_IMAGE_BUCKET_NAME")?,
            endpoint: require("NEXT_PUBLIC_SUPABASE_URL")?,
            service_key: require("SUPABASE_SERVICE_ROLE_KEY")?,
        })
    }
}
