use std::fs::OpenOptions;
use std::io;

use super::config::LogConfig;

pub const DEFAULT_LEVEL: &str = "info";

pub trait LoggerInitializer {
    fn initialize(&self, config: &LogConfig) -> Result<(), Box<dyn std::error::Error>>;
}

fn builder_for(config: &LogConfig) -> env_logger::Builder {
    let mut builder = match config.level {
        Some(level) => {
            let mut builder = env_logger::Builder::new();
            builder
                .filter_level(level)
                .filter_module("hyper", log::LevelFilter::Warn)
                .filter_module("reqwest", log::LevelFilter::Warn);
            builder
        }
        None => env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(DEFAULT_LEVEL),
        ),
    };

    builder.format_timestamp_secs();
    builder
}

pub struct StderrLoggerInitializer;

impl LoggerInitializer for StderrLoggerInitializer {
    fn initialize(&self, config: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
        builder_for(config)
            .target(env_logger::Target::Stderr)
            .try_init()?;

        Ok(())
    }
}

pub struct FileLoggerInitializer;

impl LoggerInitializer for FileLoggerInitializer {
    fn initialize(&self, config: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
        let file_config = config.file_output.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "No file path configured")
        })?;

        if let Some(parent) = file_config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_config.path)?;

        builder_for(config)
            .target(env_logger::Target::Pipe(Box::new(file)))
            .try_init()?;

        Ok(())
    }
}
