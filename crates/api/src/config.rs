use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development next to the
/// worker script. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `600`).
    pub request_timeout_secs: u64,
    /// Largest accepted multipart body in bytes (default: 100 MiB).
    pub max_upload_bytes: usize,
    /// Also persist transform results as analysis records (default: `false`).
    pub persist_transform_results: bool,
    /// External worker invocation settings.
    pub worker: WorkerConfig,
    /// Staging directories for job input and output files.
    pub storage: StorageConfig,
}

/// How the external worker is invoked.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Program spawned for every job (default: `python`).
    pub interpreter: String,
    /// Script passed as the first argument (default: `./script.py`).
    pub script_path: PathBuf,
    /// Deadline for one worker run in seconds (default: `300`).
    pub timeout_secs: u64,
    /// Fixed input file of the FFT run (default: `./raw.tsv`).
    pub fft_input: PathBuf,
}

/// Where uploads are staged and worker outputs are written.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory for staged uploads (default: `./uploads`).
    pub upload_dir: PathBuf,
    /// Directory for per-request output files (default: `./outputs`).
    pub output_dir: PathBuf,
    /// Keep staged uploads and outputs after the request (default: `false`).
    pub retain_job_files: bool,
}

/// Database connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                    |
    /// |-----------------------------|----------------------------|
    /// | `HOST`                      | `0.0.0.0`                  |
    /// | `PORT`                      | `5000`                     |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `600`                      |
    /// | `MAX_UPLOAD_BYTES`          | `104857600`                |
    /// | `PERSIST_TRANSFORM_RESULTS` | `false`                    |
    /// | `WORKER_INTERPRETER`        | `python`                   |
    /// | `WORKER_SCRIPT`             | `./script.py`              |
    /// | `JOB_TIMEOUT_SECS`          | `300`                      |
    /// | `FFT_INPUT_FILE`            | `./raw.tsv`                |
    /// | `UPLOAD_DIR`                | `./uploads`                |
    /// | `OUTPUT_DIR`                | `./outputs`                |
    /// | `RETAIN_JOB_FILES`          | `false`                    |
    ///
    /// Panics on unparseable values; misconfiguration should stop startup.
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = env_string("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host: env_string("HOST", "0.0.0.0"),
            port: env_parse("PORT", 5000),
            cors_origins,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 600),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", 100 * 1024 * 1024),
            persist_transform_results: env_parse("PERSIST_TRANSFORM_RESULTS", false),
            worker: WorkerConfig {
                interpreter: env_string("WORKER_INTERPRETER", "python"),
                script_path: env_string("WORKER_SCRIPT", "./script.py").into(),
                timeout_secs: env_parse("JOB_TIMEOUT_SECS", 300),
                fft_input: env_string("FFT_INPUT_FILE", "./raw.tsv").into(),
            },
            storage: StorageConfig {
                upload_dir: env_string("UPLOAD_DIR", "./uploads").into(),
                output_dir: env_string("OUTPUT_DIR", "./outputs").into(),
                retain_job_files: env_parse("RETAIN_JOB_FILES", false),
            },
        }
    }
}

impl DatabaseConfig {
    /// Read `DATABASE_URL`, or assemble one from the discrete `DB_USER`,
    /// `DB_PASSWORD`, `DB_HOST`, `DB_PORT` and `DB_DATABASE` variables.
    /// Returns `None` when neither form is configured.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok().or_else(|| {
            let user = std::env::var("DB_USER").ok()?;
            let database = std::env::var("DB_DATABASE").ok()?;
            let password = std::env::var("DB_PASSWORD").unwrap_or_default();
            let host = env_string("DB_HOST", "localhost");
            let port = env_string("DB_PORT", "5432");
            Some(format!("postgres://{user}:{password}@{host}:{port}/{database}"))
        })?;

        Some(Self {
            url,
            max_connections: env_parse("DB_MAX_CONNECTIONS", sigflow_db::DEFAULT_MAX_CONNECTIONS),
        })
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}
