mod config;
mod initializer;

pub use config::LogConfig;
pub use initializer::{
    FileLoggerInitializer,
    LoggerInitializer,
    StderrLoggerInitializer,
};

pub fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

/// Picks the logger for the command line flags and installs it.
pub fn init(
    level: Option<&str>, logs_to_file: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match level {
        Some(level) => LogConfig::new(parse_level(level)),
        None => LogConfig::from_env(),
    };

    let initializer: Box<dyn LoggerInitializer> = match logs_to_file {
        Some(path) => {
            config = config.with_file_output(path.to_path_buf());
            Box::new(FileLoggerInitializer)
        }
        None => Box::new(StderrLoggerInitializer),
    };

    initializer.initialize(&config)
}
