use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "todo-file-service")]
#[command(about = "HTTP todo service backed by a single JSON file")]
pub struct ServiceConfig {
    #[arg(long, env = "TODOS_HOST", default_value = "localhost")]
    pub host: String,
    #[arg(long, env = "TODOS_PORT", default_value_t = 3000)]
    pub port: u16,
    /// Backing collection document.
    #[arg(long, env = "TODOS_DATA_FILE", default_value = "todos.json")]
    pub data_file: PathBuf,
    /// Append-only request log, one line per request.
    #[arg(long, env = "TODOS_LOG_FILE", default_value = "logs.txt")]
    pub log_file: PathBuf,
    /// Write an empty collection at startup if the data file is missing.
    #[arg(long, env = "TODOS_CREATE_MISSING")]
    pub create_missing: bool,
    /// Hold a process-wide lock from load to save so concurrent writes cannot lose updates.
    #[arg(long, env = "TODOS_SERIALIZE_REQUESTS")]
    pub serialize_requests: bool,
    /// Emit operator logs as JSON lines.
    #[arg(long, env = "TODOS_JSON_LOGS")]
    pub json_logs: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            data_file: PathBuf::from("todos.json"),
            log_file: PathBuf::from("logs.txt"),
            create_missing: false,
            serialize_requests: false,
            json_logs: false,
        }
    }
}
