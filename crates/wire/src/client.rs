//! Connection-pooled KMS client over a UNIX stream socket.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UnixStream;
use tokio::sync::{Mutex, Semaphore};

use progressdb_core::clock::next_ns;

use crate::error::WireError;
use crate::framing::{read_frame, write_frame};
use crate::protocol::{
    CreateDekParams, CreateDekResult, CryptParams, CryptResult, Request, RewrapParams, RewrapResult,
    Response,
};
use crate::trait_::Kms;

/// Default socket path, matching the KMS child process's default
/// listener.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/progressdb-kms.sock";

/// Configuration for [`KmsClient`].
#[derive(Debug, Clone)]
pub struct KmsClientConfig {
    /// UNIX socket path the KMS process is listening on.
    pub socket_path: PathBuf,
    /// Maximum number of pooled connections.
    pub pool_size: usize,
    /// Per-request deadline.
    pub request_timeout: Duration,
}

impl Default for KmsClientConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            pool_size: 8,
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// A pooled client that speaks the framed JSON protocol to the KMS.
pub struct KmsClient {
    config: KmsClientConfig,
    idle: Mutex<Vec<UnixStream>>,
    permits: Semaphore,
}

impl KmsClient {
    /// Build a client. Does not connect eagerly; the first request opens
    /// the first connection.
    pub fn new(config: KmsClientConfig) -> Self {
        let pool_size = config.pool_size;
        Self { config, idle: Mutex::new(Vec::new()), permits: Semaphore::new(pool_size) }
    }

    /// A client pointed at the default socket path.
    pub fn connect_default() -> Self {
        Self::new(KmsClientConfig::default())
    }

    async fn acquire(&self) -> Result<UnixStream, WireError> {
        let mut idle = self.idle.lock().await;
        if let Some(stream) = idle.pop() {
            return Ok(stream);
        }
        drop(idle);
        UnixStream::connect(&self.config.socket_path)
            .await
            .map_err(|e| WireError::PoolUnavailable(e.to_string()))
    }

    async fn release(&self, stream: UnixStream) {
        let mut idle = self.idle.lock().await;
        if idle.len() < self.config.pool_size {
            idle.push(stream);
        }
    }

    async fn call(&self, op: &str, params: serde_json::Value) -> Result<serde_json::Value, WireError> {
        let _permit = self.permits.acquire().await.expect("semaphore not closed");
        let mut conn = self.acquire().await?;

        let request = Request { id: format!("{}-{}", std::process::id(), next_ns()), op: op.to_string(), params };

        let send_and_recv = async {
            write_frame(&mut conn, &request).await?;
            let response: Response = read_frame(&mut conn).await?;
            Ok::<_, WireError>(response)
        };

        let response = match tokio::time::timeout(self.config.request_timeout, send_and_recv).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(e), // connection is broken; don't return it to the pool
            Err(_) => return Err(WireError::Timeout),
        };

        self.release(conn).await;

        if response.ok {
            Ok(response.result.unwrap_or(serde_json::Value::Null))
        } else {
            let error = response.error.unwrap_or(crate::protocol::ApiError {
                code: "unknown".into(),
                message: "KMS returned ok=false with no error body".into(),
            });
            Err(WireError::Kms { code: error.code, message: error.message })
        }
    }
}

fn b64(bytes: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)
}

fn unb64(s: &str) -> Result<Vec<u8>, WireError> {
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, s)
        .map_err(|e| WireError::Kms { code: "bad_base64".into(), message: e.to_string() })
}

#[async_trait]
impl Kms for KmsClient {
    async fn health(&self) -> Result<(), WireError> {
        self.call("health", serde_json::Value::Null).await?;
        Ok(())
    }

    async fn create_dek_for_thread(&self, thread_id: &str) -> Result<CreateDekResult, WireError> {
        let params = serde_json::to_value(CreateDekParams { thread_id: thread_id.to_string() })?;
        let result = self.call("create_dek_for_thread", params).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn encrypt_with_dek(&self, key_id: &str, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, WireError> {
        let params = serde_json::to_value(CryptParams {
            key_id: key_id.to_string(),
            data: b64(plaintext),
            aad: b64(aad),
        })?;
        let result = self.call("encrypt_with_dek", params).await?;
        let result: CryptResult = serde_json::from_value(result)?;
        unb64(&result.data)
    }

    async fn decrypt_with_dek(&self, key_id: &str, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, WireError> {
        let params = serde_json::to_value(CryptParams {
            key_id: key_id.to_string(),
            data: b64(ciphertext),
            aad: b64(aad),
        })?;
        let result = self.call("decrypt_with_dek", params).await?;
        let result: CryptResult = serde_json::from_value(result)?;
        unb64(&result.data)
    }

    async fn rewrap_dek_for_thread(&self, key_id: &str, new_kek_hex: &str) -> Result<RewrapResult, WireError> {
        let params = serde_json::to_value(RewrapParams { key_id: key_id.to_string(), new_kek_hex: new_kek_hex.to_string() })?;
        let result = self.call("rewrap_dek_for_thread", params).await?;
        Ok(serde_json::from_value(result)?)
    }
}

/// Whether `path`'s parent directory exists, so `main.rs` can fail fast
/// with a clear message instead of an opaque connect error.
pub fn socket_parent_exists(path: &Path) -> bool {
    path.parent().map(|p| p.as_os_str().is_empty() || p.exists()).unwrap_or(true)
}
