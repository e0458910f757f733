//! Runner configuration
//!
//! Identity of the compute client this daemon runs as, how often it talks
//! to the orchestrator, and how jobs are executed.

use std::path::PathBuf;
use std::time::Duration;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Compute client this runner acts as
    pub compute_client_id: String,

    /// Private key returned when the compute client was registered
    pub compute_client_private_key: String,

    /// Orchestrator base URL (e.g., "http://localhost:8080")
    pub orchestrator_url: String,

    /// How often to poll the orchestrator for new jobs
    pub poll_interval: Duration,

    /// How often a running job is checked for cancellation
    pub cancel_check_interval: Duration,

    /// Max parallel jobs the runner can handle
    pub max_parallel_jobs: usize,

    /// Program and arguments launched for every job
    pub job_command: Vec<String>,

    /// Each job runs in `<job_workdir>/<job_id>`
    pub job_workdir: PathBuf,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(
        compute_client_id: String,
        compute_client_private_key: String,
        orchestrator_url: String,
    ) -> Self {
        Self {
            compute_client_id,
            compute_client_private_key,
            orchestrator_url,
            poll_interval: Duration::from_secs(5),
            cancel_check_interval: Duration::from_secs(10),
            max_parallel_jobs: 2,
            job_command: vec!["dendro-job".to_string()],
            job_workdir: std::env::temp_dir().join("dendro-jobs"),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - DENDRO_COMPUTE_CLIENT_ID (required)
    /// - DENDRO_COMPUTE_CLIENT_PRIVATE_KEY (required)
    /// - ORCHESTRATOR_URL (optional, default: http://localhost:8080)
    /// - POLL_INTERVAL (optional, seconds, default: 5)
    /// - CANCEL_CHECK_INTERVAL (optional, seconds, default: 10)
    /// - MAX_PARALLEL_JOBS (optional, default: 2)
    /// - DENDRO_JOB_COMMAND (optional, whitespace separated, default: dendro-job)
    /// - DENDRO_JOB_WORKDIR (optional, default: $TMPDIR/dendro-jobs)
    pub fn from_env() -> anyhow::Result<Self> {
        let compute_client_id = std::env::var("DENDRO_COMPUTE_CLIENT_ID")
            .map_err(|_| anyhow::anyhow!("DENDRO_COMPUTE_CLIENT_ID environment variable not set"))?;

        let compute_client_private_key = std::env::var("DENDRO_COMPUTE_CLIENT_PRIVATE_KEY")
            .map_err(|_| {
                anyhow::anyhow!("DENDRO_COMPUTE_CLIENT_PRIVATE_KEY environment variable not set")
            })?;

        let orchestrator_url = std::env::var("ORCHESTRATOR_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let mut config = Self::new(compute_client_id, compute_client_private_key, orchestrator_url);

        if let Some(secs) = env_parse::<u64>("POLL_INTERVAL") {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("CANCEL_CHECK_INTERVAL") {
            config.cancel_check_interval = Duration::from_secs(secs);
        }
        if let Some(max) = env_parse::<usize>("MAX_PARALLEL_JOBS") {
            config.max_parallel_jobs = max;
        }
        if let Ok(command) = std::env::var("DENDRO_JOB_COMMAND") {
            config.job_command = split_command(&command);
        }
        if let Ok(dir) = std::env::var("DENDRO_JOB_WORKDIR") {
            config.job_workdir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.compute_client_id.is_empty() {
            anyhow::bail!("compute_client_id cannot be empty");
        }

        if self.compute_client_private_key.is_empty() {
            anyhow::bail!("compute_client_private_key cannot be empty");
        }

        if !self.orchestrator_url.starts_with("http://")
            && !self.orchestrator_url.starts_with("https://")
        {
            anyhow::bail!("orchestrator_url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.cancel_check_interval.is_zero() {
            anyhow::bail!("cancel_check_interval must be greater than 0");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        if self.job_command.is_empty() {
            anyhow::bail!("job_command cannot be empty");
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new("cc1".to_string(), "key".to_string(), "http://localhost:8080".to_string())
    }

    #[test]
    fn test_default_config() {
        let config = config();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.cancel_check_interval, Duration::from_secs(10));
        assert_eq!(config.max_parallel_jobs, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = config();

        config.compute_client_id = String::new();
        assert!(config.validate().is_err());
        config.compute_client_id = "cc1".to_string();

        config.orchestrator_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
        config.orchestrator_url = "https://dendro.test".to_string();

        config.max_parallel_jobs = 0;
        assert!(config.validate().is_err());
        config.max_parallel_jobs = 1;

        config.job_command = Vec::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("  python3 -m dendro.run  "),
            vec!["python3", "-m", "dendro.run"]
        );
        assert!(split_command("   ").is_empty());
    }
}
