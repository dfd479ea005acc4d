use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_u32,
    parse_u64,
};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, ExamSettings, ExecutorSettings, RuntimeSettings,
    ServerHost, ServerPort, ServerSettings, Settings, StoreSettings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("CODEXAM_HOST", "0.0.0.0");
        let port = env_or_default("CODEXAM_PORT", "8000");

        let environment =
            parse_environment(env_optional("CODEXAM_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("CODEXAM_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "CodeXam API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let store_base_url = env_or_default("STORE_BASE_URL", "http://localhost:8900/api");
        let store_api_key = env_or_default("STORE_API_KEY", "");
        let store_timeout_seconds =
            parse_u64("STORE_TIMEOUT_SECONDS", env_or_default("STORE_TIMEOUT_SECONDS", "20"))?;

        let executor_base_url =
            env_or_default("EXECUTOR_BASE_URL", "https://api.jdoodle.com/v1");
        let executor_client_id = env_or_default("EXECUTOR_CLIENT_ID", "");
        let executor_client_secret = env_or_default("EXECUTOR_CLIENT_SECRET", "");
        let executor_timeout_seconds = parse_u64(
            "EXECUTOR_TIMEOUT_SECONDS",
            env_or_default("EXECUTOR_TIMEOUT_SECONDS", "30"),
        )?;

        let duration_seconds =
            parse_u32("EXAM_DURATION_SECONDS", env_or_default("EXAM_DURATION_SECONDS", "1800"))?;
        let max_concurrent_sessions = parse_u64(
            "MAX_CONCURRENT_SESSIONS",
            env_or_default("MAX_CONCURRENT_SESSIONS", "150"),
        )?;

        let log_level = env_or_default("CODEXAM_LOG_LEVEL", "info");
        let json = env_optional("CODEXAM_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            store: StoreSettings {
                base_url: store_base_url,
                api_key: store_api_key,
                timeout_seconds: store_timeout_seconds,
            },
            executor: ExecutorSettings {
                base_url: executor_base_url,
                client_id: executor_client_id,
                client_secret: executor_client_secret,
                timeout_seconds: executor_timeout_seconds,
            },
            exam: ExamSettings { duration_seconds, max_concurrent_sessions },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn store(&self) -> &StoreSettings {
        &self.store
    }

    pub(crate) fn executor(&self) -> &ExecutorSettings {
        &self.executor
    }

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.exam.duration_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_DURATION_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.exam.max_concurrent_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_CONCURRENT_SESSIONS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.store.base_url.is_empty() {
            return Err(ConfigError::MissingSecret("STORE_BASE_URL"));
        }
        if self.store.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("STORE_API_KEY"));
        }
        if self.executor.client_id.is_empty() || self.executor.client_secret.is_empty() {
            return Err(ConfigError::MissingSecret("EXECUTOR_CLIENT_ID/EXECUTOR_CLIENT_SECRET"));
        }

        Ok(())
    }
}

impl ServerHost {
    fn parse(value: String) -> Result<Self, ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidHost(value));
        }
        Ok(Self(value))
    }
}

impl ServerPort {
    fn parse(value: String) -> Result<Self, ConfigError> {
        let parsed: u16 = value.parse().map_err(|_| ConfigError::InvalidPort(value.clone()))?;
        if parsed == 0 {
            return Err(ConfigError::InvalidPort(value));
        }
        Ok(Self(parsed))
    }
}
