use std::sync::Arc;

use crate::error::{Error, ErrorKind};
use crate::layer4::WakePacketSender;
use crate::mac::{normalize, MacAddress};
use crate::registry::Registry;

const QUOTE_HINT: &str = "If there are spaces in a parameter, make sure to surround it with quotes.";

pub const USAGE: &str = "\
testmac <mac>         check whether a MAC address is valid
addmac <name> <mac>   register a MAC address under a name
delmac <name>         forget a name
getmac <name>         show the MAC address registered for a name
wakemac <name>        send a wake-on-lan packet to a registered host
listmacs              list all registered names";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    TestMac(String),
    AddMac { name: String, mac: String },
    DelMac(String),
    GetMac(String),
    WakeMac(String),
    ListMacs,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command `{0}`")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unterminated quote")]
    UnterminatedQuote,
}

/// Splits on whitespace; a double-quoted argument may contain spaces.
pub fn split_args(input: &str) -> Result<Vec<String>, ParseError> {
    let mut args = Vec::new();
    let mut cur = String::new();
    let mut in_arg = false;
    let mut quoted = false;

    for c in input.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_arg = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_arg {
                    args.push(std::mem::take(&mut cur));
                    in_arg = false;
                }
            }
            c => {
                cur.push(c);
                in_arg = true;
            }
        }
    }

    if quoted {
        return Err(ParseError::UnterminatedQuote);
    }
    if in_arg {
        args.push(cur);
    }
    Ok(args)
}

impl Command {
    /// Parses a chat message. Returns `None` when the message does not
    /// start with `prefix` (compared case-insensitively).
    pub fn parse(prefix: &str, message: &str) -> Option<Result<Self, ParseError>> {
        let split = message
            .char_indices()
            .nth(prefix.chars().count())
            .map_or(message.len(), |(i, _)| i);
        let (head, body) = message.split_at(split);
        if head.to_lowercase() != prefix.to_lowercase() {
            return None;
        }
        Some(Self::parse_body(body))
    }

    fn parse_body(body: &str) -> Result<Self, ParseError> {
        let mut args = split_args(body)?.into_iter();
        let word = args.next().unwrap_or_default().to_lowercase();
        let args: Vec<String> = args.collect();

        let one = |usage| match <[String; 1]>::try_from(args.clone()) {
            Ok([a]) => Ok(a),
            Err(_) => Err(ParseError::Usage(usage)),
        };

        match word.as_str() {
            "testmac" => one("testmac <mac>").map(Command::TestMac),
            "addmac" => match <[String; 2]>::try_from(args.clone()) {
                Ok([name, mac]) => Ok(Command::AddMac { name, mac }),
                Err(_) => Err(ParseError::Usage("addmac <name> <mac>")),
            },
            "delmac" => one("delmac <name>").map(Command::DelMac),
            "getmac" => one("getmac <name>").map(Command::GetMac),
            "wakemac" => one("wakemac <name>").map(Command::WakeMac),
            "listmacs" if args.is_empty() => Ok(Command::ListMacs),
            "listmacs" => Err(ParseError::Usage("listmacs")),
            "help" => Ok(Command::Help),
            other => Err(ParseError::Unknown(other.to_owned())),
        }
    }
}

/// Runs commands against a registry and a packet sender and renders the
/// replies a chat user sees.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    prefix: String,
    registry: Arc<Registry>,
    sender: WakePacketSender,
}

impl CommandHandler {
    pub fn new(prefix: impl Into<String>, registry: Arc<Registry>, sender: WakePacketSender) -> Self {
        Self {
            prefix: prefix.into(),
            registry,
            sender,
        }
    }

    /// Reply for `message` sent from `namespace`, or `None` if the bot
    /// should stay silent.
    pub async fn handle(&self, namespace: &str, message: &str) -> Option<String> {
        match Command::parse(&self.prefix, message)? {
            Ok(cmd) => {
                log::debug!("[commands] {}: {:?}", namespace, cmd);
                Some(self.execute(namespace, cmd).await)
            }
            Err(ParseError::Unknown(word)) => {
                log::trace!("[commands] {}: ignoring unknown command '{}'", namespace, word);
                None
            }
            Err(e) => Some(format!("Error: {}\n\n{}", e, QUOTE_HINT)),
        }
    }

    pub async fn execute(&self, namespace: &str, cmd: Command) -> String {
        match cmd {
            Command::TestMac(text) => match MacAddress::parse(&text) {
                Ok(mac) => format!("MAC address `{}` is valid!", mac),
                Err(_) => format!("MAC address `{}` is not valid.", normalize(&text)),
            },
            Command::AddMac { name, mac } => match self.registry.add(namespace, &name, &mac).await {
                Ok(mac) => format!("MAC address `{}` added for `{}`.", mac, name),
                Err(Error::InvalidFormat(text)) => {
                    format!("MAC address `{}` is not valid.", normalize(&text))
                }
                Err(e) => failure_reply(namespace, &e),
            },
            Command::DelMac(name) => match self.registry.remove(namespace, &name).await {
                Ok(_) => format!("MAC address for `{}` is deleted.", name),
                Err(e) => failure_reply(namespace, &e),
            },
            Command::GetMac(name) => match self.registry.get(namespace, &name).await {
                Ok(mac) => format!("MAC address for `{}` is `{}`.", name, mac),
                Err(e) => failure_reply(namespace, &e),
            },
            Command::WakeMac(name) => {
                let mac = match self.registry.get(namespace, &name).await {
                    Ok(mac) => mac,
                    Err(e) => return failure_reply(namespace, &e),
                };
                match self.sender.wake(&mac).await {
                    Ok(()) => format!("Waking up host `{}`...", mac),
                    Err(e) => failure_reply(namespace, &e),
                }
            }
            Command::ListMacs => match self.registry.list(namespace).await {
                Ok(entries) if entries.is_empty() => "No MAC addresses registered.".to_owned(),
                Ok(entries) => entries
                    .iter()
                    .map(|(name, mac)| format!("`{}`: `{}`", name, mac))
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(e) => failure_reply(namespace, &e),
            },
            Command::Help => format!("Commands (prefix `{}`):\n{}", self.prefix, USAGE),
        }
    }
}

fn failure_reply(namespace: &str, err: &Error) -> String {
    match (err, err.kind()) {
        (Error::NotFound(name), _) => format!("No MAC exists for `{}`.", name),
        (_, ErrorKind::InvalidFormat) => format!("Error: {}", err),
        (_, kind) => {
            log::warn!("[commands] {}: {}", namespace, err);
            if kind == ErrorKind::Network {
                "Could not send the wake packet.".to_owned()
            } else {
                "Could not access the MAC address store.".to_owned()
            }
        }
    }
}
