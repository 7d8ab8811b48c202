use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: Option<log::LevelFilter>,
    pub file_output: Option<FileOutputConfig>,
}

#[derive(Clone, Debug)]
pub struct FileOutputConfig {
    pub path: PathBuf,
}

impl LogConfig {
    /// An explicit level wins over `RUST_LOG`.
    pub fn new(level: log::LevelFilter) -> Self {
        Self {
            level: Some(level),
            file_output: None,
        }
    }

    /// Defers to `RUST_LOG`, falling back to `info`.
    pub fn from_env() -> Self {
        Self {
            level: None,
            file_output: None,
        }
    }

    pub fn with_file_output(mut self, path: PathBuf) -> Self {
        self.file_output = Some(FileOutputConfig { path });
        self
    }
}
