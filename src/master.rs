//! Querying the master for the serial of a zone.
//!
//! A secondary decides whether it needs to transfer a zone by comparing the
//! serial of its latest snapshot with the serial currently published by the
//! master. The [`Master`] type sends a single SOA query over UDP to the
//! master, optionally signed with TSIG, and extracts the SOA record from
//! the answer.
//!
//! The exchange is blocking. By default, there is no timeout and no retry:
//! if the master never answers, neither does [`Master::query_soa`]. Use
//! [`Config::set_read_timeout`] to limit the time spent waiting.

use core::str::FromStr;
use core::{cmp, fmt};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use domain::base::iana::{Rcode, Rtype};
use domain::base::name::ToName;
use domain::base::{Message, MessageBuilder, Serial};
use domain::rdata::tsig::Time48;
use domain::rdata::Soa;
use domain::tsig::{Algorithm, ClientTransaction, Key, KeyName};
use domain::utils::base64;
use tracing::{debug, trace};

use crate::error::{Error, IoError, MasterQueryError, MasterQueryReason};
use crate::records::StoredName;

//------------ Configuration Constants ---------------------------------------

/// Minimum read timeout.
///
/// There is no default read timeout. Unless one is set, the query waits
/// for an answer forever.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Maximum read timeout.
const MAX_READ_TIMEOUT: Duration = Duration::from_secs(3600);

/// Configuration limits for the size of the receive buffer.
const RECV_SIZE: DefMinMax<usize> = DefMinMax::new(65535, 512, 65535);

//------------ Config --------------------------------------------------------

/// Configuration for the exchange with a master.
#[derive(Clone, Debug)]
pub struct Config {
    /// Read timeout.
    read_timeout: Option<Duration>,

    /// Size of the receive buffer.
    recv_size: usize,
}

impl Config {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the read timeout.
    ///
    /// If this is `None`, the query waits for an answer forever.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Sets the read timeout.
    ///
    /// If this value is too small or too large, it will be caped.
    pub fn set_read_timeout(&mut self, value: Option<Duration>) {
        self.read_timeout = value
            .map(|value| value.clamp(MIN_READ_TIMEOUT, MAX_READ_TIMEOUT))
    }

    /// Returns the size of the buffer used for receiving the answer.
    pub fn recv_size(&self) -> usize {
        self.recv_size
    }

    /// Sets the size of the receive buffer.
    ///
    /// If this value is too small or too large, it will be caped.
    pub fn set_recv_size(&mut self, value: usize) {
        self.recv_size = RECV_SIZE.limit(value)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_timeout: None,
            recv_size: RECV_SIZE.default(),
        }
    }
}

//------------ TsigTriplet ---------------------------------------------------

/// The data necessary to create a TSIG key.
///
/// The triplet can be parsed from a string of the form
/// `name:secret[:algorithm]` where the secret is given in base64 and the
/// algorithm defaults to `hmac-sha256`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TsigTriplet {
    /// The name of the key.
    pub name: KeyName,

    /// The algorithm of the key.
    pub algorithm: Algorithm,

    /// The shared secret.
    pub secret: Vec<u8>,
}

impl TsigTriplet {
    /// Creates a new triplet from its parts.
    pub fn new(name: KeyName, algorithm: Algorithm, secret: Vec<u8>) -> Self {
        TsigTriplet {
            name,
            algorithm,
            secret,
        }
    }

    /// Creates the TSIG key described by the triplet.
    pub fn to_key(&self) -> Result<Key, Error> {
        Ok(Key::new(
            self.algorithm,
            &self.secret,
            self.name.clone(),
            None,
            None,
        )?)
    }
}

//--- FromStr

impl FromStr for TsigTriplet {
    type Err = TsigTripletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (name, secret) = match (parts.next(), parts.next()) {
            (Some(name), Some(secret)) => (name, secret),
            _ => return Err(TsigTripletError::Format),
        };
        let algorithm = match parts.next() {
            Some(algorithm) => Algorithm::from_str(algorithm)
                .map_err(|_| TsigTripletError::Algorithm)?,
            None => Algorithm::Sha256,
        };
        let name =
            KeyName::from_str(name).map_err(|_| TsigTripletError::Name)?;
        let secret =
            base64::decode(secret).map_err(|_| TsigTripletError::Secret)?;
        Ok(TsigTriplet::new(name, algorithm, secret))
    }
}

//--- Display

impl fmt::Display for TsigTriplet {
    /// Formats the triplet without revealing the secret.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.algorithm)
    }
}

//------------ TsigTripletError ----------------------------------------------

/// A TSIG triplet could not be parsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TsigTripletError {
    /// The string was not of the form `name:secret[:algorithm]`.
    Format,

    /// The key name is not a valid domain name.
    Name,

    /// The secret is not valid base64.
    Secret,

    /// The algorithm is not supported.
    Algorithm,
}

impl fmt::Display for TsigTripletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            TsigTripletError::Format => "expected 'name:secret[:algorithm]'",
            TsigTripletError::Name => "invalid key name",
            TsigTripletError::Secret => "invalid base64 secret",
            TsigTripletError::Algorithm => "unsupported TSIG algorithm",
        })
    }
}

impl std::error::Error for TsigTripletError {}

//------------ Master --------------------------------------------------------

/// The master of a zone.
#[derive(Clone, Debug)]
pub struct Master {
    /// The address of the master.
    addr: SocketAddr,

    /// The key to sign queries with.
    key: Option<Arc<Key>>,

    /// Configuration of the exchange.
    config: Config,
}

impl Master {
    /// Creates a master at the given address without TSIG.
    pub fn new(addr: SocketAddr) -> Self {
        Self::with_config(addr, Config::default())
    }

    /// Creates a master at the given address with a configuration.
    pub fn with_config(addr: SocketAddr, config: Config) -> Self {
        Master {
            addr,
            key: None,
            config,
        }
    }

    /// Creates a master whose queries are signed with the given key.
    pub fn with_tsig(
        addr: SocketAddr,
        tsig: &TsigTriplet,
    ) -> Result<Self, Error> {
        Ok(Self::new(addr).set_key(tsig.to_key()?))
    }

    /// Sets the key used to sign queries.
    pub fn set_key(mut self, key: Key) -> Self {
        self.key = Some(Arc::new(key));
        self
    }

    /// Replaces the configuration.
    pub fn set_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Returns the address of the master.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the key used to sign queries if there is one.
    pub fn key(&self) -> Option<&Key> {
        self.key.as_deref()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the serial the master currently has for `zone`.
    ///
    /// Returns `Ok(None)` if the master answered without a SOA record.
    pub fn query_serial(
        &self,
        zone: &StoredName,
    ) -> Result<Option<Serial>, Error> {
        Ok(self.query_soa(zone)?.map(|soa| soa.serial()))
    }

    /// Returns the SOA record the master currently has for `zone`.
    ///
    /// Sends a single query and waits for a single datagram in return.
    /// Returns `Ok(None)` if the answer section contains no SOA record.
    pub fn query_soa(
        &self,
        zone: &StoredName,
    ) -> Result<Option<Soa<StoredName>>, Error> {
        let mut msg = MessageBuilder::new_vec();
        msg.header_mut().set_random_id();
        let id = msg.header().id();
        let mut msg = msg.question();
        msg.push((zone, Rtype::SOA))
            .map_err(|err| self.error(MasterQueryReason::Compose(err)))?;
        let mut msg = msg.additional();
        let tran = match self.key {
            Some(ref key) => Some(
                ClientTransaction::request(
                    key.clone(),
                    &mut msg,
                    Time48::now(),
                )
                .map_err(|err| self.error(MasterQueryReason::Compose(err)))?,
            ),
            None => None,
        };
        let request = msg.finish();

        debug!(
            "Sending SOA query for '{}' to {} (id {})",
            zone, self.addr, id
        );
        let mut answer = self.exchange(&request)?;

        if answer.header().id() != id || !answer.header().qr() {
            return Err(self.error(MasterQueryReason::UnexpectedAnswer));
        }
        let rcode = answer.header().rcode();
        if rcode != Rcode::NOERROR {
            return Err(self.error(MasterQueryReason::Rcode(rcode)));
        }
        if let Some(tran) = tran {
            tran.answer(&mut answer, Time48::now())
                .map_err(|err| self.error(MasterQueryReason::Tsig(err)))?;
        }

        let soa = self.extract_soa(&answer)?;
        match soa {
            Some(ref soa) => debug!(
                "Master {} has serial {} for '{}'",
                self.addr,
                soa.serial(),
                zone
            ),
            None => {
                debug!("Master {} returned no SOA for '{}'", self.addr, zone)
            }
        }
        Ok(soa)
    }

    /// Sends the request and receives the answer.
    fn exchange(&self, request: &[u8]) -> Result<Message<Vec<u8>>, Error> {
        let local: SocketAddr = if self.addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let map_err = || IoError::map("Unable to query master", self.addr);
        let sock = UdpSocket::bind(local).map_err(map_err())?;
        sock.set_read_timeout(self.config.read_timeout)
            .map_err(map_err())?;
        sock.connect(self.addr).map_err(map_err())?;
        sock.send(request).map_err(map_err())?;

        let mut buf = vec![0; self.config.recv_size];
        let len = sock.recv(&mut buf).map_err(map_err())?;
        buf.truncate(len);
        trace!("Received {} octets from {}", len, self.addr);
        Message::from_octets(buf)
            .map_err(|_| self.error(MasterQueryReason::Malformed))
    }

    /// Extracts the first SOA record from the answer section.
    fn extract_soa(
        &self,
        answer: &Message<Vec<u8>>,
    ) -> Result<Option<Soa<StoredName>>, Error> {
        let malformed = |_| self.error(MasterQueryReason::Malformed);
        let section = answer.answer().map_err(malformed)?;
        let record = match section.limit_to::<Soa<_>>().next() {
            Some(record) => record.map_err(malformed)?,
            None => return Ok(None),
        };
        let soa = record.data();
        Ok(Some(Soa::new(
            soa.mname().to_bytes(),
            soa.rname().to_bytes(),
            soa.serial(),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum(),
        )))
    }

    /// Creates a query error for this master.
    fn error(&self, reason: MasterQueryReason) -> Error {
        MasterQueryError::new(self.addr, reason).into()
    }
}

//------------ DefMinMax -----------------------------------------------------

#[derive(Clone, Copy)]
struct DefMinMax<T> {
    def: T,
    min: T,
    max: T,
}

impl<T> DefMinMax<T> {
    const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    fn default(self) -> T {
        self.def
    }

    fn limit(self, value: T) -> T
    where
        T: Ord,
    {
        cmp::max(self.min, cmp::min(self.max, value))
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_triplet() {
        let triplet =
            TsigTriplet::from_str("key.example:c2VjcmV0:hmac-sha1").unwrap();
        assert_eq!(triplet.name, KeyName::from_str("key.example").unwrap());
        assert_eq!(triplet.algorithm, Algorithm::Sha1);
        assert_eq!(triplet.secret, b"secret");
        assert!(triplet.to_key().is_ok());
        assert_eq!(triplet.to_string(), "key.example:hmac-sha1");
    }

    #[test]
    fn triplet_defaults_to_sha256() {
        let triplet = TsigTriplet::from_str("key.example:c2VjcmV0").unwrap();
        assert_eq!(triplet.algorithm, Algorithm::Sha256);
    }

    #[test]
    fn bad_triplets() {
        assert_eq!(
            TsigTriplet::from_str("key.example"),
            Err(TsigTripletError::Format)
        );
        assert_eq!(
            TsigTriplet::from_str("key.example:!!!"),
            Err(TsigTripletError::Secret)
        );
        assert_eq!(
            TsigTriplet::from_str("key.example:c2VjcmV0:hmac-md4"),
            Err(TsigTripletError::Algorithm)
        );
    }

    #[test]
    fn config_limits() {
        let mut config = Config::new();
        assert_eq!(config.read_timeout(), None);
        assert_eq!(config.recv_size(), 65535);

        config.set_read_timeout(Some(Duration::from_secs(2)));
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(2)));
        config.set_read_timeout(Some(Duration::ZERO));
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(1)));
        config.set_read_timeout(Some(Duration::from_secs(86400)));
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(3600)));
        config.set_read_timeout(None);
        assert_eq!(config.read_timeout(), None);

        config.set_recv_size(100);
        assert_eq!(config.recv_size(), 512);
        config.set_recv_size(1_000_000);
        assert_eq!(config.recv_size(), 65535);
    }
}
