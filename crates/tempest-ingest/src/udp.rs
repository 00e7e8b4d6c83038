//! Local broadcast listener: receives observation JSON over UDP
//!
//! The station's hub broadcasts readings on the local network; decoding the
//! vendor wire format is the broadcaster's concern, this source accepts the
//! canonical observation JSON datagram.

use crate::{IngestError, IngestResult, StationSource};
use std::net::SocketAddr;
use tempest_core::Observation;
use tokio::{
    net::UdpSocket,
    time::{timeout, Duration},
};

pub struct UdpSource {
    bind: SocketAddr,
    socket: Option<UdpSocket>,
    active: bool,
    recv_timeout: Duration,
}

impl UdpSource {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            socket: None,
            active: false,
            recv_timeout: Duration::from_secs(90),
        }
    }

    fn socket_ref(&self) -> Result<&UdpSocket, IngestError> {
        self.socket
            .as_ref()
            .ok_or_else(|| IngestError::SourceError("socket not active".into()))
    }
}

#[async_trait::async_trait]
impl StationSource for UdpSource {
    fn name(&self) -> &str {
        "udp-listener"
    }

    async fn start(&mut self) -> IngestResult<()> {
        if self.active {
            return Err(IngestError::SourceError("already started".into()));
        }
        let sock = UdpSocket::bind(self.bind)
            .await
            .map_err(|e| IngestError::CommunicationError(e.to_string()))?;
        sock.set_broadcast(true)
            .map_err(|e| IngestError::CommunicationError(e.to_string()))?;
        tracing::info!(bind = %self.bind, "udp listener started");
        self.socket = Some(sock);
        self.active = true;
        Ok(())
    }

    async fn stop(&mut self) -> IngestResult<()> {
        self.active = false;
        self.socket = None;
        Ok(())
    }

    async fn next_observation(&mut self) -> IngestResult<Observation> {
        if !self.active {
            return Err(IngestError::SourceError("not active".into()));
        }
        let sock = self.socket_ref()?;
        let mut buf = vec![0u8; 2048];
        let (n, _peer) = timeout(self.recv_timeout, sock.recv_from(&mut buf))
            .await
            .map_err(|_| IngestError::Timeout)?
            .map_err(|e| IngestError::CommunicationError(e.to_string()))?;
        let obs: Observation = serde_json::from_slice(&buf[..n])
            .map_err(|e| IngestError::InvalidObservation(e.to_string()))?;
        Ok(obs)
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
