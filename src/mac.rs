use std::fmt;
use std::str::FromStr;

use pnet::util::MacAddr;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

const TEXT_LEN: usize = 17;

/// Six-octet hardware address, always rendered as `AA:BB:CC:DD:EE:FF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const LEN: usize = 6;

    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Accepts six two-digit hex groups separated uniformly by `:` or `-`.
    pub fn parse(text: &str) -> Result<Self> {
        let raw = text.as_bytes();
        if raw.len() != TEXT_LEN {
            return Err(Error::InvalidFormat(text.to_owned()));
        }

        let sep = raw[2];
        if sep != b':' && sep != b'-' {
            return Err(Error::InvalidFormat(text.to_owned()));
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            let at = i * 3;
            if i > 0 && raw[at - 1] != sep {
                return Err(Error::InvalidFormat(text.to_owned()));
            }
            match (hex_value(raw[at]), hex_value(raw[at + 1])) {
                (Some(hi), Some(lo)) => *octet = hi << 4 | lo,
                _ => return Err(Error::InvalidFormat(text.to_owned())),
            }
        }

        Ok(Self(octets))
    }

    pub fn to_canonical_string(&self) -> String {
        self.to_string()
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

/// Uppercased form of arbitrary user input, for echoing it back.
pub fn normalize(text: &str) -> String {
    text.to_uppercase()
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", a, b, c, d, e, g)
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<MacAddr> for MacAddress {
    fn from(mac: MacAddr) -> Self {
        Self([mac.0, mac.1, mac.2, mac.3, mac.4, mac.5])
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        MacAddress::parse(&text).map_err(de::Error::custom)
    }
}
