use crate::mac::MacAddress;

pub const SYNC_STREAM: [u8; 6] = [ 0xff, 0xff, 0xff, 0xff, 0xff, 0xff ];
pub const TARGET_REPEAT: usize = 16;
pub const MAGIC_PACKET_LEN: usize = SYNC_STREAM.len() + TARGET_REPEAT * MacAddress::LEN;

/// WakeOnLan payload: six `0xff` followed by the target MAC sixteen times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicPacket([u8; MAGIC_PACKET_LEN]);

impl MagicPacket {
    pub fn new(target: &MacAddress) -> Self {
        let mut buf = [0u8; MAGIC_PACKET_LEN];
        buf[..6].copy_from_slice(&SYNC_STREAM);

        let octets = target.octets();
        for block in buf[6..].chunks_exact_mut(MacAddress::LEN) {
            block.copy_from_slice(&octets);
        }

        Self(buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn target(&self) -> MacAddress {
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&self.0[6..12]);
        MacAddress::new(octets)
    }

    /// Recognizes a WakeOnLan payload and returns the MAC it targets.
    pub fn parse(payload: &[u8]) -> Option<MacAddress> {
        if payload.len() < MAGIC_PACKET_LEN { return None; }

        let blocks: Vec<&[u8]> = payload[..MAGIC_PACKET_LEN].chunks(6).collect();
        if blocks[0] != SYNC_STREAM {
            return None;
        }

        for i in 2..blocks.len() {
            if blocks[i] != blocks[1] {
                return None;
            }
        }

        let mut octets = [0u8; 6];
        octets.copy_from_slice(blocks[1]);
        Some(MacAddress::new(octets))
    }
}
