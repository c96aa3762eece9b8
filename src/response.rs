//! The lazy result handle shared by both backends.

use bytes::Bytes;
use serde::de::DeserializeOwned;
#[cfg(any(feature = "threaded", feature = "nonblocking"))]
use tokio::task::JoinHandle;

use crate::error::Result;
#[cfg(feature = "nonblocking")]
use crate::error::Error;

/// A not-yet-resolved HTTP result.
///
/// Every verb method returns one of these. Nothing is read from the wire
/// until [`content`](Self::content) or [`json`](Self::json) is awaited;
/// transport failures surface there. Each handle is single-use and bodies
/// are never cached.
#[derive(Debug)]
pub struct PendingResponse {
    inner: InnerPending,
}

/// Internal variants, one per backend.
///
/// The threaded backend's body was already materialized inside its worker
/// thread, so the buffered variant only waits for the worker. The
/// nonblocking backend's response reads its body lazily on its own, so it
/// is carried through as-is.
#[derive(Debug)]
enum InnerPending {
    #[cfg(feature = "threaded")]
    Buffered(JoinHandle<Result<Bytes>>),
    #[cfg(feature = "nonblocking")]
    Streaming(JoinHandle<Result<reqwest::Response>>),
}

impl PendingResponse {
    #[cfg(feature = "threaded")]
    pub(crate) fn buffered(handle: JoinHandle<Result<Bytes>>) -> Self {
        Self {
            inner: InnerPending::Buffered(handle),
        }
    }

    #[cfg(feature = "nonblocking")]
    pub(crate) fn streaming(handle: JoinHandle<Result<reqwest::Response>>) -> Self {
        Self {
            inner: InnerPending::Streaming(handle),
        }
    }

    /// Resolve the raw response body.
    pub async fn content(self) -> Result<Bytes> {
        match self.inner {
            #[cfg(feature = "threaded")]
            InnerPending::Buffered(handle) => handle.await?,
            #[cfg(feature = "nonblocking")]
            InnerPending::Streaming(handle) => {
                let response = handle.await??;
                response.bytes().await.map_err(Error::from)
            }
        }
    }

    /// Resolve the response body parsed as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        match self.inner {
            #[cfg(feature = "threaded")]
            InnerPending::Buffered(handle) => {
                let body = handle.await??;
                serde_json::from_slice(&body).map_err(Into::into)
            }
            #[cfg(feature = "nonblocking")]
            InnerPending::Streaming(handle) => {
                let response = handle.await??;
                response.json().await.map_err(Error::from)
            }
        }
    }
}

#[cfg(all(test, feature = "threaded"))]
mod tests {
    use super::*;

    fn resolved(body: &'static [u8]) -> PendingResponse {
        PendingResponse::buffered(tokio::spawn(async move { Ok(Bytes::from_static(body)) }))
    }

    #[tokio::test]
    async fn test_buffered_content() {
        let body = resolved(b"payload").content().await.unwrap();
        assert_eq!(&body[..], b"payload");
    }

    #[tokio::test]
    async fn test_buffered_json() {
        let value: serde_json::Value = resolved(b"{\"a\":1}").json().await.unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_json_decode_error_propagates() {
        let err = resolved(b"not json")
            .json::<serde_json::Value>()
            .await
            .unwrap_err();
        assert!(matches!(err.kind, crate::ErrorKind::Json(_)));
    }

    #[tokio::test]
    async fn test_failure_channel() {
        let handle = tokio::spawn(async {
            Err(crate::Error::new(crate::ErrorKind::Transport(
                "connection refused".into(),
            )))
        });
        let err = PendingResponse::buffered(handle).content().await.unwrap_err();
        assert!(err.is_transport());
    }
}
