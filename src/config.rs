use crate::agents::RoutingPolicy;
use crate::llm::LlmSettings;
use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Model used for every completion
    #[arg(long, env = "LLM_MODEL")]
    pub model: Option<String>,

    /// Where the generated page is stored
    #[arg(long, env = "PAGE_PATH")]
    pub page_path: Option<String>,

    /// `fallback` or `strict`
    #[arg(long, env = "ROUTING_POLICY")]
    pub routing_policy: Option<String>,

    /// Emit JSON log lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub prompts: PromptsConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_permissive: bool,
}

#[derive(Deserialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub page_path: PathBuf,
    pub chat_ui_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptsConfig {
    pub dir: PathBuf,
    pub preload: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    pub routing_policy: RoutingPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layering, lowest first: defaults, config file, `PAGECRAFT_*`
    /// environment, CLI flags (and their plain env aliases).
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.cors_permissive", true)?
            .set_default("llm.base_url", "https://api.openai.com")?
            .set_default("llm.model", "gpt-4o")?
            .set_default("llm.temperature", 1.0)?
            .set_default("llm.max_tokens", 6048)?
            .set_default("llm.timeout_secs", 60)?
            .set_default("storage.page_path", "templates/generated/page.html")?
            .set_default("storage.chat_ui_path", "templates/index.html")?
            .set_default("prompts.dir", "prompts")?
            .set_default("prompts.preload", false)?
            .set_default("workflow.routing_policy", "fallback")?
            .set_default("logging.json", false)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder
                .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false)),
        };

        // E.g. PAGECRAFT_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("PAGECRAFT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(model) = cli.model {
            builder = builder.set_override("llm.model", model)?;
        }
        if let Some(page_path) = cli.page_path {
            builder = builder.set_override("storage.page_path", page_path)?;
        }
        if let Some(policy) = cli.routing_policy {
            builder = builder.set_override("workflow.routing_policy", policy)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        let mut cfg: Self = builder.build()?.try_deserialize()?;

        if cfg.llm.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            cfg.llm.api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
        }

        Ok(cfg)
    }

    /// Settings for the completion client.
    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            base_url: self.llm.base_url.clone(),
            api_key: self.llm.api_key.clone(),
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
            timeout: Duration::from_secs(self.llm.timeout_secs),
        }
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
