//! Error types.
//!
//! All fallible operations of this crate return the [`Error`] type defined
//! here. Its variants mirror the failure classes of keeping a secondary
//! copy of a zone: local I/O, the exchange with the master, and snapshot
//! files that turn out to be incomplete or unreadable.

use core::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use domain::base::iana::Rcode;
use domain::base::message_builder::PushError;
use domain::tsig;
use domain::zonefile::inplace;

use crate::records::StoredName;

//------------ Error ---------------------------------------------------------

/// An error happened while checking or storing a zone.
#[derive(Debug)]
pub enum Error {
    /// A file, directory, or socket operation failed.
    Io(IoError),

    /// Retrieving the SOA serial from the master failed.
    MasterQuery(MasterQueryError),

    /// A snapshot did not end in a SOA record.
    IncompleteZone(IncompleteZone),

    /// The zonefile tokenizer rejected a snapshot.
    Zonefile {
        /// The snapshot file.
        path: PathBuf,

        /// The error reported by the tokenizer.
        error: inplace::Error,
    },

    /// A record in a snapshot lives outside the zone.
    OutOfZone {
        /// The snapshot file.
        path: PathBuf,

        /// The owner of the offending record.
        owner: StoredName,
    },

    /// The TSIG triplet does not form a usable key.
    Tsig(tsig::NewKeyError),

    /// An operation did not complete before its deadline.
    Timeout(Duration),
}

impl Error {
    /// Returns whether this is an incomplete zone error.
    pub fn is_incomplete_zone(&self) -> bool {
        matches!(self, Error::IncompleteZone(_))
    }

    /// Returns the I/O error kind if this is an I/O error.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io(err) => Some(err.source.kind()),
            _ => None,
        }
    }
}

//--- From

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Error::Io(err)
    }
}

impl From<MasterQueryError> for Error {
    fn from(err: MasterQueryError) -> Self {
        Error::MasterQuery(err)
    }
}

impl From<IncompleteZone> for Error {
    fn from(err: IncompleteZone) -> Self {
        Error::IncompleteZone(err)
    }
}

impl From<tsig::NewKeyError> for Error {
    fn from(err: tsig::NewKeyError) -> Self {
        Error::Tsig(err)
    }
}

//--- Display and Error

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => fmt::Display::fmt(err, f),
            Error::MasterQuery(err) => fmt::Display::fmt(err, f),
            Error::IncompleteZone(err) => fmt::Display::fmt(err, f),
            Error::Zonefile { path, error } => {
                write!(f, "Unable to parse '{}': {}", path.display(), error)
            }
            Error::OutOfZone { path, owner } => write!(
                f,
                "Record for '{}' in '{}' is outside of the zone",
                owner,
                path.display()
            ),
            Error::Tsig(err) => write!(f, "Invalid TSIG key: {}", err),
            Error::Timeout(deadline) => {
                write!(f, "Timed out after {:?}", deadline)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(&err.source),
            _ => None,
        }
    }
}

//------------ IoError -------------------------------------------------------

/// An I/O operation on a file, directory, or socket failed.
#[derive(Debug)]
pub struct IoError {
    /// What we were trying to do.
    action: &'static str,

    /// The path or address we were trying to do it with.
    target: String,

    /// The underlying error.
    source: io::Error,
}

impl IoError {
    pub(crate) fn new(
        action: &'static str,
        target: impl fmt::Display,
        source: io::Error,
    ) -> Self {
        IoError {
            action,
            target: target.to_string(),
            source,
        }
    }

    /// Returns a closure converting an I/O error into a crate error.
    pub(crate) fn map<T: fmt::Display>(
        action: &'static str,
        target: T,
    ) -> impl FnOnce(io::Error) -> Error {
        move |source| Error::Io(IoError::new(action, target, source))
    }

    /// Returns the path or address the operation was performed on.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        &self.source
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} '{}': {}", self.action, self.target, self.source)
    }
}

//------------ MasterQueryError ----------------------------------------------

/// The master did not provide a usable answer to the SOA query.
#[derive(Debug)]
pub struct MasterQueryError {
    /// The address of the master.
    master: SocketAddr,

    /// What went wrong.
    reason: MasterQueryReason,
}

impl MasterQueryError {
    pub(crate) fn new(master: SocketAddr, reason: MasterQueryReason) -> Self {
        MasterQueryError { master, reason }
    }

    /// Returns the address of the master.
    pub fn master(&self) -> SocketAddr {
        self.master
    }

    /// Returns the reason for the failure.
    pub fn reason(&self) -> &MasterQueryReason {
        &self.reason
    }

    /// Returns the response code if the master answered with an error.
    pub fn rcode(&self) -> Option<Rcode> {
        match self.reason {
            MasterQueryReason::Rcode(rcode) => Some(rcode),
            _ => None,
        }
    }
}

impl fmt::Display for MasterQueryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Unable to retrieve SOA serial from master '{}': {}",
            self.master, self.reason
        )
    }
}

//------------ MasterQueryReason ---------------------------------------------

/// The reason a master query failed.
#[derive(Debug)]
pub enum MasterQueryReason {
    /// The master answered with a non-zero response code.
    Rcode(Rcode),

    /// The query could not be assembled.
    Compose(PushError),

    /// The response could not be parsed.
    Malformed,

    /// The datagram received is not an answer to our query.
    UnexpectedAnswer,

    /// The response failed TSIG validation.
    Tsig(tsig::ValidationError),
}

impl fmt::Display for MasterQueryReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MasterQueryReason::Rcode(rcode) => write!(f, "{}", rcode),
            MasterQueryReason::Compose(err) => {
                write!(f, "cannot build query: {}", err)
            }
            MasterQueryReason::Malformed => f.write_str("malformed response"),
            MasterQueryReason::UnexpectedAnswer => {
                f.write_str("response does not match query")
            }
            MasterQueryReason::Tsig(err) => {
                write!(f, "TSIG validation failed: {}", err)
            }
        }
    }
}

//------------ IncompleteZone ------------------------------------------------

/// A snapshot file did not terminate in a SOA record.
#[derive(Debug)]
pub struct IncompleteZone {
    /// The snapshot file.
    path: PathBuf,

    /// The number of records parsed before giving up.
    records: usize,
}

impl IncompleteZone {
    pub(crate) fn new(path: PathBuf, records: usize) -> Self {
        IncompleteZone { path, records }
    }

    /// Returns the path of the snapshot file.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Returns the number of records parsed.
    pub fn records(&self) -> usize {
        self.records
    }
}

impl fmt::Display for IncompleteZone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Zone in '{}' not complete (no SOA at end after {} records)",
            self.path.display(),
            self.records
        )
    }
}
