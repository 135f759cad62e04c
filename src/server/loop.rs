// Server loop module
// Accepts connections until shutdown, then drains in-flight connections

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::Instant;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Accept connections until `shutdown` resolves with the signal name.
///
/// Afterwards waits up to `performance.shutdown_grace` seconds for active
/// connections to finish. Connections still open after that are abandoned.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop<S>(listener: TcpListener, state: Arc<AppState>, shutdown: S)
where
    S: Future<Output = &'static str>,
{
    tokio::pin!(shutdown);

    let signal = loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            signal = &mut shutdown => break signal,
        }
    };

    logger::log_shutdown(signal);
    drop(listener);
    drain_connections(&state).await;
}

async fn drain_connections(state: &AppState) {
    let grace = Duration::from_secs(state.config.performance.shutdown_grace);
    let deadline = Instant::now() + grace;

    loop {
        let active = state.active_connections.load(Ordering::SeqCst);
        if active == 0 {
            logger::log_info("[Shutdown] All connections closed");
            return;
        }
        if Instant::now() >= deadline {
            logger::log_warning(&format!(
                "[Shutdown] Grace period of {}s elapsed with {active} connection(s) still open",
                grace.as_secs()
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_reusable_listener;
    use crate::store::memory::MemoryStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    fn test_state(max_connections: Option<u64>) -> Arc<AppState> {
        let root = std::env::temp_dir().join(format!(
            "country_loop_{}",
            uuid::Uuid::new_v4().simple()
        ));
        let mut config = Config::load_from("definitely-missing-config-file").unwrap();
        config.storage.image_dir = root.join("images").display().to_string();
        config.logging.access_log = false;
        config.performance.keep_alive_timeout = 0;
        config.performance.shutdown_grace = 1;
        config.performance.max_connections = max_connections;
        Arc::new(AppState::with_store(&config, Arc::new(MemoryStore::default())))
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = test_state(None);
        let (tx, rx) = oneshot::channel::<()>();

        let server = tokio::spawn(start_server_loop(listener, Arc::clone(&state), async move {
            let _ = rx.await;
            "test"
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /countries HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.ends_with("[]"), "{response}");

        tx.send(()).unwrap();
        server.await.unwrap();
        assert_eq!(state.active_connections.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connection_limit_rejects() {
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = test_state(Some(0));
        let (tx, rx) = oneshot::channel::<()>();

        let server = tokio::spawn(start_server_loop(listener, Arc::clone(&state), async move {
            let _ = rx.await;
            "test"
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let _ = stream
            .write_all(b"GET /countries HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await;
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf).await;
        assert!(buf.is_empty());

        tx.send(()).unwrap();
        server.await.unwrap();
    }
}
