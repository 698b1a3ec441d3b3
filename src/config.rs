use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use toml::Value;
use log::{debug, info};
use crate::interpreter::Options;
use crate::queue::{AllocatorConfig, AllocatorPreset};

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Configuration manager
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Load configuration using discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using empty configuration");
        Ok(Self::from_config(Configuration::new()))
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Successfully loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    /// File the configuration was read from, if any
    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    /// Get value from configuration with section fallback
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        // Priority: selected_section -> specified section -> base
        if let Some(selected) = &self.selected_section {
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }

        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }

        self.config.get("base").and_then(|s| s.get(key))
    }

    /// Select configuration section for --config-name
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    /// Get boolean value with type conversion
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Get a numeric value, failing on text that does not parse
    pub fn get_number<T>(&self, section: &str, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.get_value(section, key)
            .map(|value| {
                value
                    .parse::<T>()
                    .with_context(|| format!("Invalid {} value in config: {}", key, value))
            })
            .transpose()
    }

    /// Get allocator configuration from config file
    ///
    /// A `preset` supplies the starting point; explicit keys override it.
    pub fn get_allocator_config(&self) -> Result<AllocatorConfig> {
        let mut config = match self.get_value("allocator", "preset") {
            Some(name) => name
                .parse::<AllocatorPreset>()
                .map_err(|e| anyhow::anyhow!(e))?
                .config(),
            None => AllocatorConfig::default(),
        };

        if let Some(limit_str) = self.get_value("allocator", "memory-limit") {
            let limit = crate::cli::memory_parser::parse_memory_size(limit_str)
                .with_context(|| format!("Invalid memory-limit value in config: {}", limit_str))?;
            config.memory_limit = Some(limit);
        }

        if let Some(percent) = self.get_number::<u8>("allocator", "fail-percent")? {
            if percent > 100 {
                return Err(anyhow::anyhow!("Invalid fail-percent value in config: {} exceeds 100", percent));
            }
            config.fail_percent = percent;
        }

        if let Some(seed) = self.get_number::<u64>("allocator", "seed")? {
            config.seed = seed;
        }

        Ok(config)
    }

    /// Get interpreter options from config file
    pub fn get_interpreter_options(&self) -> Result<Options> {
        let mut options = Options::default();

        if let Some(fail_limit) = self.get_number::<usize>("interpreter", "fail-limit")? {
            options.fail_limit = fail_limit;
        }

        if let Some(length) = self.get_number::<usize>("interpreter", "buffer-length")? {
            if length == 0 {
                return Err(anyhow::anyhow!("Invalid buffer-length value in config: must be at least 1"));
            }
            options.buffer_length = length;
        }

        if let Some(error_limit) = self.get_number::<usize>("interpreter", "error-limit")? {
            if error_limit == 0 {
                return Err(anyhow::anyhow!("Invalid error-limit value in config: must be at least 1"));
            }
            options.error_limit = error_limit;
        }

        if let Some(echo) = self.get_bool("interpreter", "echo")? {
            options.echo = echo;
        }

        Ok(options)
    }
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable $TEXTQ_CONFIG
    if let Ok(env_path) = env::var("TEXTQ_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    // 2. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("textq").join("config.toml"));
    }

    // 3. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".textq.toml"));
    }

    // 4. Project local
    paths.push(PathBuf::from("./.textq.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let toml_value: Value = content.parse()
        .context("Failed to parse TOML content")?;

    let mut config = Configuration::new();

    if let Value::Table(table) = toml_value {
        flatten_toml_table(&table, String::new(), &mut config);
    }

    debug!("Parsed configuration: {:?}", config);
    Ok(config)
}

/// Recursively flatten TOML tables into section.subsection format
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        let section_name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Table(subtable) => {
                if subtable.values().all(|v| !matches!(v, Value::Table(_))) {
                    let section_map = subtable
                        .iter()
                        .map(|(subkey, subvalue)| (subkey.clone(), toml_value_to_string(subvalue)))
                        .collect();
                    config.insert(section_name, section_map);
                } else {
                    flatten_toml_table(subtable, section_name, config);
                }
            }
            _ => {
                // Top-level scalar outside any table
                let mut section_map = HashMap::new();
                section_map.insert("value".to_string(), toml_value_to_string(value));
                config.insert(section_name, section_map);
            }
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(d) => d.to_string(),
        Value::Array(_) | Value::Table(_) => value.to_string(),
    }
}
