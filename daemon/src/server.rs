use shared::{Command, Response};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixListener;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::state::DaemonState;

/// Socket lives in the user runtime dir when one exists, /tmp otherwise.
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("voxshockd.sock")
}

pub struct DaemonServer {
    socket_path: PathBuf,
    state: Arc<Mutex<DaemonState>>,
}

impl DaemonServer {
    pub fn new(socket_path: PathBuf, state: Arc<Mutex<DaemonState>>) -> Self {
        Self { socket_path, state }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        info!("Starting socket server at {}", self.socket_path.display());

        let listener = UnixListener::bind(&self.socket_path)?;

        loop {
            let state = Arc::clone(&self.state);
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("Connection accepted");
                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_connection(state, stream).await {
                            error!("Error handling connection: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }

    async fn handle_connection(
        state: Arc<Mutex<DaemonState>>,
        mut stream: tokio::net::UnixStream,
    ) -> anyhow::Result<()> {
        let mut buffer = vec![0u8; 1024];
        let n = stream.read(&mut buffer).await?;

        if n == 0 {
            return Ok(());
        }

        buffer.truncate(n);

        let command: Command = serde_json::from_slice(&buffer)?;
        info!("Received command: {:?}", command);

        // State failures go back to the client as Error responses; only
        // transport problems abort the connection.
        let response = match command {
            Command::Start => match Self::handle_start(&state).await {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error(e.to_string()),
            },
            Command::Stop => match state.lock().await.stop().await {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error(e.to_string()),
            },
            Command::Status => Response::Status(state.lock().await.status()),
            Command::Test => match state.lock().await.test_fire().await {
                Ok(ack) => {
                    info!(status = ack.status, "Test dispatch accepted");
                    Response::Ok
                }
                Err(e) => Response::Error(e.to_string()),
            },
        };

        let response_json = serde_json::to_vec(&response)?;
        stream.write_all(&response_json).await?;

        debug!("Sent response: {:?}", response);

        Ok(())
    }

    /// Start is the one command that does slow work, loading the whisper
    /// model can take seconds. The load runs on a blocking task with the
    /// state lock released, so concurrent status and stop requests keep
    /// getting served while it runs.
    async fn handle_start(state: &Arc<Mutex<DaemonState>>) -> anyhow::Result<()> {
        let config = {
            let guard = state.lock().await;
            if guard.is_listening() {
                anyhow::bail!("Already listening");
            }
            guard
                .config()
                .validate_for_start()
                .map_err(|reason| anyhow::anyhow!(reason))?;
            guard.config().clone()
        };

        let engine = tokio::task::spawn_blocking(move || DaemonState::build_engine(&config))
            .await
            .map_err(|e| anyhow::anyhow!("engine load task failed: {e}"))??;

        state.lock().await.start(engine)
    }
}

impl Drop for DaemonServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}
