//! Configuration of a secondary zone.
//!
//! A [`Config`] describes everything needed to keep a secondary copy of a
//! single zone: the zone’s name, the address of its master, the directory
//! snapshots are kept in, and optionally a TSIG key for talking to the
//! master.
//!
//! With the `serde` feature, the configuration can be deserialized from a
//! map with the keys `zone`, `master`, `directory`, and optionally `tsig`
//! (in the form `name:secret[:algorithm]`), `read-timeout` (in seconds),
//! and `recv-size`.

use core::fmt;
#[cfg(feature = "serde")]
use core::str::FromStr;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::master::{self, Master, TsigTriplet, TsigTripletError};
use crate::records::StoredName;
use crate::snapshot::SnapshotDir;

//------------ Config --------------------------------------------------------

/// Configuration of a secondary zone.
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(try_from = "RawConfig")
)]
pub struct Config {
    /// The apex of the zone.
    zone: StoredName,

    /// The address of the master.
    master: SocketAddr,

    /// The directory to keep snapshots in.
    directory: PathBuf,

    /// The TSIG key for the exchange with the master.
    tsig: Option<TsigTriplet>,

    /// Configuration of the exchange with the master.
    master_config: master::Config,
}

impl Config {
    /// Creates a new configuration without TSIG.
    pub fn new(
        zone: StoredName,
        master: SocketAddr,
        directory: impl Into<PathBuf>,
    ) -> Self {
        Config {
            zone,
            master,
            directory: directory.into(),
            tsig: None,
            master_config: master::Config::default(),
        }
    }

    /// Returns the apex of the zone.
    pub fn zone(&self) -> &StoredName {
        &self.zone
    }

    /// Returns the address of the master.
    pub fn master(&self) -> SocketAddr {
        self.master
    }

    /// Returns the snapshot directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the TSIG triplet if there is one.
    pub fn tsig(&self) -> Option<&TsigTriplet> {
        self.tsig.as_ref()
    }

    /// Sets the TSIG triplet.
    pub fn set_tsig(&mut self, tsig: Option<TsigTriplet>) {
        self.tsig = tsig
    }

    /// Returns the configuration of the exchange with the master.
    pub fn master_config(&self) -> &master::Config {
        &self.master_config
    }

    /// Sets the configuration of the exchange with the master.
    pub fn set_master_config(&mut self, config: master::Config) {
        self.master_config = config
    }

    /// Returns the snapshot directory of the zone.
    pub fn snapshot_dir(&self) -> SnapshotDir {
        SnapshotDir::new(self.directory.clone())
    }

    /// Creates the master of the zone.
    ///
    /// Fails if the TSIG triplet does not form a valid key.
    pub fn to_master(&self) -> Result<Master, Error> {
        let master =
            Master::with_config(self.master, self.master_config.clone());
        match self.tsig {
            Some(ref tsig) => Ok(master.set_key(tsig.to_key()?)),
            None => Ok(master),
        }
    }
}

//------------ RawConfig -----------------------------------------------------

/// The configuration as it appears in a config file.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    zone: String,
    master: SocketAddr,
    directory: PathBuf,
    #[serde(default)]
    tsig: Option<String>,
    #[serde(default)]
    read_timeout: Option<u64>,
    #[serde(default)]
    recv_size: Option<usize>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let zone = StoredName::from_str(&raw.zone)
            .map_err(|_| ConfigError::Zone(raw.zone.clone()))?;
        let mut res = Config::new(zone, raw.master, raw.directory);
        res.tsig = raw
            .tsig
            .as_deref()
            .map(TsigTriplet::from_str)
            .transpose()
            .map_err(ConfigError::Tsig)?;
        if let Some(secs) = raw.read_timeout {
            if secs == 0 {
                return Err(ConfigError::ReadTimeout);
            }
            res.master_config
                .set_read_timeout(Some(std::time::Duration::from_secs(secs)));
        }
        if let Some(size) = raw.recv_size {
            res.master_config.set_recv_size(size);
        }
        Ok(res)
    }
}

//------------ ConfigError ---------------------------------------------------

/// A configuration value is invalid.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The zone is not a valid domain name.
    Zone(String),

    /// The TSIG triplet is invalid.
    Tsig(TsigTripletError),

    /// The read timeout is zero.
    ReadTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Zone(zone) => write!(f, "invalid zone '{}'", zone),
            ConfigError::Tsig(err) => write!(f, "invalid tsig: {}", err),
            ConfigError::ReadTimeout => {
                f.write_str("read-timeout must be at least one second")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use core::str::FromStr;
    use domain::tsig::Algorithm;

    fn zone() -> StoredName {
        StoredName::from_str("example.com.").unwrap()
    }

    #[test]
    fn master_from_config() {
        let addr: SocketAddr = "192.0.2.53:53".parse().unwrap();
        let mut config = Config::new(zone(), addr, "/var/lib/ixfr");
        assert!(config.to_master().unwrap().key().is_none());
        assert_eq!(config.snapshot_dir().path(), Path::new("/var/lib/ixfr"));

        config.set_tsig(Some(
            TsigTriplet::from_str("key.example:c2VjcmV0").unwrap(),
        ));
        let master = config.to_master().unwrap();
        assert_eq!(master.addr(), addr);
        assert_eq!(master.key().unwrap().algorithm(), Algorithm::Sha256);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize() {
        let config: Config = serde_json::from_str(
            r#"{
                "zone": "example.com",
                "master": "192.0.2.53:53",
                "directory": "/var/lib/ixfr/example.com",
                "tsig": "key.example:c2VjcmV0:hmac-sha512",
                "read-timeout": 10
            }"#,
        )
        .unwrap();
        assert_eq!(config.zone(), &zone());
        assert_eq!(config.master(), "192.0.2.53:53".parse().unwrap());
        assert_eq!(config.tsig().unwrap().algorithm, Algorithm::Sha512);
        assert_eq!(
            config.master_config().read_timeout(),
            Some(std::time::Duration::from_secs(10))
        );
        assert_eq!(config.master_config().recv_size(), 65535);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_errors() {
        let err = serde_json::from_str::<Config>(
            r#"{
                "zone": "example.com",
                "master": "192.0.2.53:53",
                "directory": "/tmp",
                "tsig": "key.example"
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid tsig"));

        let err = serde_json::from_str::<Config>(
            r#"{
                "zone": "example.com",
                "master": "192.0.2.53:53",
                "directory": "/tmp",
                "read-timeout": 0
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("read-timeout"));
    }
}
