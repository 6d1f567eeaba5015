use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, io, str::FromStr};
use url::Host;

/// An endpoint address.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Address {
    /// The hostname (either dns name or ip address).
    pub host: Host,
    /// The port number.
    pub port: u16,
}

impl Address {
    /// Create a new address.
    #[must_use]
    pub const fn new(host: Host, port: u16) -> Self {
        Self { host, port }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Address {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || io::Error::new(io::ErrorKind::InvalidInput, format!("invalid address: {}", s));

        let hostname_end = s.rfind(':').ok_or_else(invalid)?;
        let host = Host::parse(&s[..hostname_end]).map_err(|_| invalid())?;
        let port = s[hostname_end + 1..].parse().map_err(|_| invalid())?;

        Ok(Self { host, port })
    }
}

// An address travels as it's `host:port` string, which also keeps config
// files readable.
impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
