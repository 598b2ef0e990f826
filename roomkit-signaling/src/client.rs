//! Client side of the signaling channel
//!
//! [`SignalClient`] is the seam the room uses for every outbound request.
//! [`ChannelSignalClient`] encodes requests as JSON frames onto an in-process
//! channel; whatever owns the matching [`SignalReceiver`] forwards or inspects
//! them.

use crate::error::SignalError;
use crate::protocol::SignalRequest;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Sends requests to the signaling server
#[async_trait]
pub trait SignalClient: Send + Sync {
    /// Deliver one request
    async fn send(&self, request: SignalRequest) -> Result<(), SignalError>;
}

/// Signal client writing JSON frames to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSignalClient {
    outbound: mpsc::UnboundedSender<String>,
}

impl ChannelSignalClient {
    /// Create a client and the receiver for its frames
    pub fn new() -> (Self, SignalReceiver) {
        let (outbound, inbound) = mpsc::unbounded_channel();
        (Self { outbound }, SignalReceiver { inbound })
    }

    /// Whether the receiving side is gone
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

#[async_trait]
impl SignalClient for ChannelSignalClient {
    async fn send(&self, request: SignalRequest) -> Result<(), SignalError> {
        let frame = request.to_json()?;
        debug!("📡 Sending {} request", request.request_type());
        self.outbound
            .send(frame)
            .map_err(|_| SignalError::ChannelClosed)
    }
}

/// Receiving end of a [`ChannelSignalClient`]
#[derive(Debug)]
pub struct SignalReceiver {
    inbound: mpsc::UnboundedReceiver<String>,
}

impl SignalReceiver {
    /// Wait for the next request; `None` once every client is dropped
    pub async fn recv(&mut self) -> Option<Result<SignalRequest, SignalError>> {
        let frame = self.inbound.recv().await?;
        Some(SignalRequest::from_json(&frame))
    }

    /// Take the next request if one is queued
    pub fn try_recv(&mut self) -> Option<Result<SignalRequest, SignalError>> {
        let frame = self.inbound.try_recv().ok()?;
        Some(SignalRequest::from_json(&frame))
    }

    /// Take every queued request, skipping frames that fail to decode
    pub fn drain(&mut self) -> Vec<SignalRequest> {
        let mut requests = Vec::new();
        while let Some(decoded) = self.try_recv() {
            match decoded {
                Ok(request) => requests.push(request),
                Err(e) => warn!("⚠️ Dropping undecodable signaling frame: {}", e),
            }
        }
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_arrive_in_order() {
        let (client, mut receiver) = ChannelSignalClient::new();

        tokio_test::assert_ok!(
            client
                .send(SignalRequest::MuteTrack {
                    track_id: "TR_a".to_string(),
                    muted: true,
                })
                .await
        );
        tokio_test::assert_ok!(client.send(SignalRequest::Leave).await);

        let first = receiver.recv().await.unwrap().unwrap();
        assert_eq!(first.request_type(), "mute_track");
        assert_eq!(receiver.drain(), vec![SignalRequest::Leave]);
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (client, receiver) = ChannelSignalClient::new();
        drop(receiver);

        assert!(client.is_closed());
        assert_eq!(
            client.send(SignalRequest::Leave).await,
            Err(SignalError::ChannelClosed)
        );
    }
}
