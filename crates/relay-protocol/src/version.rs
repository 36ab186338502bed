//! Protocol versioning and heart-beat negotiation values.

use std::fmt;
use std::str::FromStr;

/// Protocol version advertised in CONNECTED frames.
pub const PROTOCOL_VERSION: Version = Version { major: 1, minor: 2 };

/// Protocol version information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl Version {
    /// Create a new version.
    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Default for Version {
    fn default() -> Self {
        PROTOCOL_VERSION
    }
}

/// Heart-beat intervals in milliseconds, as carried by the `heart-beat`
/// header (`"<send>,<receive>"`). Zero disables that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HeartBeat {
    /// Smallest interval the sender can emit heart-beats at.
    pub send_ms: u32,
    /// Desired interval for receiving heart-beats.
    pub receive_ms: u32,
}

impl HeartBeat {
    /// Heart-beats disabled in both directions.
    pub const DISABLED: HeartBeat = HeartBeat {
        send_ms: 0,
        receive_ms: 0,
    };

    /// Whether heart-beats are disabled in both directions.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.send_ms == 0 && self.receive_ms == 0
    }
}

impl fmt::Display for HeartBeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.send_ms, self.receive_ms)
    }
}

impl FromStr for HeartBeat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (send, receive) = s.split_once(',').ok_or("Heart-beat must be \"cx,cy\"")?;
        let send_ms = send.trim().parse().map_err(|_| "Invalid heart-beat send interval")?;
        let receive_ms = receive
            .trim()
            .parse()
            .map_err(|_| "Invalid heart-beat receive interval")?;
        Ok(Self {
            send_ms,
            receive_ms,
        })
    }
}
