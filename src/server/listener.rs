use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::server::handler;
use crate::server::AppState;

/// TCP listener that accepts connections and serves HTTP/1.1 on each.
#[derive(Debug)]
pub struct Listener {
    listener: TcpListener,
    state: Arc<AppState>,
    connection_limit: Arc<Semaphore>,
}

impl Listener {
    /// Create a new Listener bound to the configured address.
    pub async fn bind(config: &Config, state: Arc<AppState>) -> Result<Self> {
        let listener = TcpListener::bind(config.bind).await?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            state,
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop, spawning a connection task for each client.
    pub async fn run(&self) -> Result<()> {
        loop {
            // Acquire a permit before accepting
            let permit = self
                .connection_limit
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::Io(io::Error::other("connection limiter closed")))?;

            let (socket, addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            if let Err(e) = socket.set_nodelay(true) {
                error!("Failed to set TCP_NODELAY: {}", e);
            }

            let state = self.state.clone();

            tokio::spawn(async move {
                state.metrics().connection_opened();

                let service_state = state.clone();
                let service = service_fn(move |req| handler::handle(service_state.clone(), req));

                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(socket), service)
                    .await
                {
                    debug!("Connection error from {}: {}", addr, e);
                }

                state.metrics().connection_closed();
                drop(permit);
            });
        }
    }

    /// Run until `shutdown` resolves, then stop accepting connections.
    ///
    /// Connections already being served finish on their own tasks.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                Ok(())
            }
        }
    }
}
