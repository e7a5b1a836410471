use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::common::MagicPacket;
use crate::error::{Error, Result};
use crate::mac::MacAddress;

pub const DEFAULT_WOL_PORT: u16 = 9;

#[derive(Debug, Clone)]
pub struct WolConfig {
    pub broadcast_addr: IpAddr,
    pub port: u16,
    pub send_timeout: Duration,
}

impl Default for WolConfig {
    fn default() -> Self {
        Self {
            broadcast_addr: IpAddr::V4(Ipv4Addr::BROADCAST),
            port: DEFAULT_WOL_PORT,
            send_timeout: Duration::from_secs(1),
        }
    }
}

/// Fire-and-forget sender of magic packets over UDP broadcast.
#[derive(Debug, Clone)]
pub struct WakePacketSender {
    cfg: WolConfig,
}

impl WakePacketSender {
    pub fn new(cfg: WolConfig) -> Self {
        Self { cfg }
    }

    pub fn target(&self) -> SocketAddr {
        SocketAddr::new(self.cfg.broadcast_addr, self.cfg.port)
    }

    pub fn build_magic_packet(mac: &MacAddress) -> MagicPacket {
        MagicPacket::new(mac)
    }

    /// Sends `packet` as a single datagram. There is no retry; the send is
    /// abandoned after the configured timeout.
    pub async fn broadcast(&self, packet: &[u8]) -> Result<()> {
        let target = self.target();
        let bind: SocketAddr = match target {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let send = async {
            let socket = UdpSocket::bind(bind).await?;
            socket.set_broadcast(true)?;
            socket.send_to(packet, target).await
        };

        match tokio::time::timeout(self.cfg.send_timeout, send).await {
            Ok(Ok(n)) => {
                log::debug!("[wol] sent {} bytes to {}", n, target);
                Ok(())
            }
            Ok(Err(e)) => {
                log::warn!("[wol] sending to {} failed: {}", target, e);
                Err(Error::Network(e))
            }
            Err(_) => {
                log::warn!("[wol] sending to {} timed out", target);
                Err(Error::Timeout(self.cfg.send_timeout))
            }
        }
    }

    pub async fn wake(&self, mac: &MacAddress) -> Result<()> {
        let pkt = Self::build_magic_packet(mac);
        log::info!("[wol] waking {} via {}", mac, self.target());
        log::trace!("[wol] payload {:02x?}", pkt.as_bytes());
        self.broadcast(pkt.as_bytes()).await
    }
}
