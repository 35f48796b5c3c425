use std::path::PathBuf;

use thiserror::Error;

pub const APP_NAME: &str = "clinagent";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Process-wide configuration, read once at startup and handed down
/// through `AppState`. Failing fast here (rather than at first request)
/// is the point: a misconfigured deployment should never accept a
/// connection.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub data_dir: PathBuf,
    pub index_dir: PathBuf,
    pub checkpoint_db: PathBuf,
    pub max_chats: usize,
    pub openai_base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub ocr_endpoint: String,
    pub medical_endpoint: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| ConfigError::MissingEnv("OPENAI_API_KEY"))?;

        let data_dir = std::env::var("CLINAGENT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let index_dir = std::env::var("CLINAGENT_INDEX_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("index"));

        let checkpoint_db = std::env::var("CLINAGENT_CHECKPOINT_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("checkpoints.sqlite3"));

        let max_chats = match std::env::var("MAX_CHATS") {
            Ok(raw) => raw.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                name: "MAX_CHATS",
                value: raw,
            })?,
            Err(_) => 3,
        };

        let openai_base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let chat_model = std::env::var("CLINAGENT_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let embedding_model = std::env::var("CLINAGENT_EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());
        let ocr_endpoint =
            std::env::var("CLINAGENT_OCR_ENDPOINT").unwrap_or_else(|_| "http://localhost:8081".to_string());
        let medical_endpoint = std::env::var("CLINAGENT_MEDICAL_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:8082".to_string());

        Ok(Self {
            openai_api_key,
            data_dir,
            index_dir,
            checkpoint_db,
            max_chats,
            openai_base_url,
            chat_model,
            embedding_model,
            ocr_endpoint,
            medical_endpoint,
        })
    }

    pub fn raw_images_dir(&self) -> PathBuf {
        self.data_dir.join("raw_images")
    }

    pub fn processed_text_path(&self) -> PathBuf {
        self.data_dir.join("processed_images").join("processed_text.json")
    }

    pub fn processed_entities_path(&self) -> PathBuf {
        self.data_dir
            .join("processed_medical")
            .join("processed_entities.json")
    }

    pub fn summary_dir(&self) -> PathBuf {
        self.data_dir.join("processed_medical_data")
    }

    pub fn structured_dir(&self) -> PathBuf {
        self.data_dir.join("structured_json")
    }

    pub fn default_log_filter() -> &'static str {
        "clinagent=info,tower_http=info"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // Tests mutate process-wide env vars; serialize them so they don't
    // stomp on each other under cargo's default parallel test runner.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "OPENAI_API_KEY",
            "CLINAGENT_DATA_DIR",
            "CLINAGENT_INDEX_DIR",
            "CLINAGENT_CHECKPOINT_DB",
            "MAX_CHATS",
            "OPENAI_BASE_URL",
            "CLINAGENT_CHAT_MODEL",
            "CLINAGENT_EMBEDDING_MODEL",
            "CLINAGENT_OCR_ENDPOINT",
            "CLINAGENT_MEDICAL_ENDPOINT",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::MissingEnv("OPENAI_API_KEY"))));
    }

    #[test]
    fn defaults_derive_from_data_dir() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("CLINAGENT_DATA_DIR", "/tmp/clinagent-test");
        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.index_dir, PathBuf::from("/tmp/clinagent-test/index"));
        assert_eq!(
            cfg.checkpoint_db,
            PathBuf::from("/tmp/clinagent-test/checkpoints.sqlite3")
        );
        assert_eq!(cfg.max_chats, 3);
        clear_env();
    }

    #[test]
    fn invalid_max_chats_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("MAX_CHATS", "not-a-number");
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue { name: "MAX_CHATS", .. })));
        clear_env();
    }
}
