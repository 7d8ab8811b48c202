pub mod client;
pub mod config;
pub mod server;

pub use client::{
    CertSource,
    fetch_to_temp,
    install_certificate,
    install_with,
};
pub use config::{
    DEFAULT_SERVE_PORT,
    ServeConfig,
    ServeConfigBuilder,
};
pub use server::{
    serve_certificate,
    serve_on,
};
