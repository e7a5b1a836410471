//! Named Wake-on-LAN targets per chat server.
//!
//! A [`Registry`] keeps `name -> MAC` bindings for every namespace (one per
//! guild) in a small JSON document, and a [`WakePacketSender`] broadcasts the
//! magic packet for a resolved address. [`CommandHandler`] ties both to the
//! `%addmac`/`%wakemac`/... chat commands without depending on any chat
//! transport.

pub mod commands;
pub mod common;
pub mod config;
pub mod error;
pub mod iface;
pub mod layer4;
pub mod mac;
pub mod registry;

pub use commands::{Command, CommandHandler};
pub use common::MagicPacket;
pub use error::{Error, ErrorKind, Result};
pub use layer4::{WakePacketSender, WolConfig};
pub use mac::MacAddress;
pub use registry::{Registry, RegistryConfig};
