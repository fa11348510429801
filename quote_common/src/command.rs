//! Shared protocol command type used by client and server.
//!
//! A client opens a TCP connection to the command port, writes one JSON-encoded
//! `Command`, and reads a single reply line. Keep-alive pings travel separately as
//! raw `PING` datagrams on the data port.
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Which component feeds the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FeedMode {
    /// Upstream streaming and batch polling.
    Live,
    /// Local random-walk generator.
    Synthetic,
}

impl FeedMode {
    /// True for [`FeedMode::Synthetic`].
    pub fn is_synthetic(self) -> bool {
        matches!(self, FeedMode::Synthetic)
    }
}

/// Command payload sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Stream snapshots to the sender's IP on the given UDP port.
    Subscribe {
        /// Client UDP port.
        port: u16,
    },
    /// Start tracking a new symbol.
    Track {
        /// Raw user input; the server canonicalizes it.
        symbol: String,
    },
    /// Switch the data source.
    SetMode {
        /// Requested mode.
        mode: FeedMode,
    },
}

impl Command {
    /// Encode the command to JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_format_is_tagged() {
        let cmd = Command::Track {
            symbol: "nvda".into(),
        };
        let json = String::from_utf8(cmd.to_json_bytes().unwrap()).unwrap();
        assert_eq!(json, r#"{"type":"track","symbol":"nvda"}"#);

        let parsed: Command =
            serde_json::from_str(r#"{"type":"set_mode","mode":"synthetic"}"#).unwrap();
        assert_eq!(
            parsed,
            Command::SetMode {
                mode: FeedMode::Synthetic
            }
        );
    }

    #[test]
    fn feed_mode_parses_case_insensitively() {
        assert_eq!("LIVE".parse::<FeedMode>().unwrap(), FeedMode::Live);
        assert_eq!("synthetic".parse::<FeedMode>().unwrap(), FeedMode::Synthetic);
        assert_eq!(FeedMode::Synthetic.to_string(), "synthetic");
        assert!("demo".parse::<FeedMode>().is_err());
    }
}
