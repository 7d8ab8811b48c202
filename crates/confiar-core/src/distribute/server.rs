use std::convert::Infallible;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{
    Request,
    Response,
    StatusCode,
};
use hyper_util::rt::TokioIo;
use log::{
    debug,
    error,
    info,
};
use tokio::net::TcpListener;

use super::config::ServeConfig;
use crate::error::{
    Error,
    Result,
};

/// Binds the configured address and serves the certificate until the process
/// is stopped.
pub async fn serve_certificate(config: &ServeConfig) -> Result<()> {
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::io("failed to bind", addr.to_string(), e))?;

    info!(
        "Serving {} on http://{}",
        config.cert_path.display(),
        addr
    );

    serve_on(listener, config.cert_path.clone()).await
}

/// Accept loop over an already bound listener. Each connection runs on its own
/// task; requests share nothing but the path.
pub async fn serve_on(listener: TcpListener, cert_path: PathBuf) -> Result<()> {
    let cert_path = Arc::new(cert_path);

    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let cert_path = Arc::clone(&cert_path);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let cert_path = Arc::clone(&cert_path);
                async move { handle_request(req, &cert_path).await }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                && !err.is_incomplete_message()
            {
                error!("Error serving connection from {}: {:?}", remote_addr, err);
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>, cert_path: &Path,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    debug!("Request: {} {}", req.method(), req.uri().path());

    match tokio::fs::read(cert_path).await {
        Ok(cert_bytes) => Ok(Response::new(Full::new(Bytes::from(cert_bytes)))),
        Err(e) => {
            error!("Failed to read {}: {}", cert_path.display(), e);
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            Ok(response)
        }
    }
}
