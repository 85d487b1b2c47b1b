//! On-disk snapshots of a zone.
//!
//! Each version of a zone received from the master is kept in a directory
//! of its own as a zonefile named after the version’s serial in decimal
//! notation. A file being written carries the suffix `.partial` until it
//! is complete and is then atomically renamed to its final name. Readers
//! thus only ever see complete snapshots.
//!
//! Snapshots are written with the SOA record as the first as well as the
//! last record. When reading a snapshot back, a final SOA record is
//! required. A snapshot that was cut short is therefore detected as
//! incomplete.
//!
//! [`SnapshotDir`] ties all of this together for a single directory. The
//! [`write`] and [`read`] modules contain the zonefile codec proper.

pub mod read;
pub mod write;

pub use self::read::{load_first_soa, load_snapshot, read_snapshot};
pub use self::write::PartialSnapshot;

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use domain::base::Serial;
use domain::rdata::Soa;
use tracing::{debug, trace, warn};

use crate::error::{Error, IoError};
use crate::records::{RecordSet, StoredName};

/// The suffix of snapshot files currently being written.
const PARTIAL_SUFFIX: &str = ".partial";

//------------ SnapshotDir ---------------------------------------------------

/// A directory holding the snapshots of a zone.
#[derive(Clone, Debug)]
pub struct SnapshotDir {
    /// The path of the directory.
    path: PathBuf,
}

impl SnapshotDir {
    /// Creates a value for the directory at the given path.
    ///
    /// The directory is not accessed until any of the other methods are
    /// called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotDir { path: path.into() }
    }

    /// Returns the path of the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the snapshot for the given serial.
    pub fn snapshot_path(&self, serial: Serial) -> PathBuf {
        self.path.join(serial.to_string())
    }

    /// Returns the path used while writing the snapshot for `serial`.
    pub fn partial_path(&self, serial: Serial) -> PathBuf {
        self.path.join(format!("{}{}", serial, PARTIAL_SUFFIX))
    }

    /// Returns the serials of all snapshots in the directory.
    ///
    /// The serials are sorted numerically, i.e., without applying serial
    /// number arithmetic. Entries that aren’t snapshots, such as files
    /// that are still being written, are skipped.
    pub fn serials(&self) -> Result<Vec<Serial>, Error> {
        let dir = fs::read_dir(&self.path).map_err(IoError::map(
            "Could not open IXFR directory",
            self.path.display(),
        ))?;
        let mut res = Vec::new();
        for entry in dir {
            let entry = entry.map_err(IoError::map(
                "Could not read IXFR directory",
                self.path.display(),
            ))?;
            match snapshot_serial(&entry.file_name()) {
                Some(serial) => res.push(serial),
                None => trace!("Skipping {:?}", entry.file_name()),
            }
        }
        res.sort_by_key(|serial| serial.into_int());
        Ok(res)
    }

    /// Returns the highest serial of all snapshots in the directory.
    ///
    /// If there are no snapshots, returns serial 0.
    pub fn highest_serial(&self) -> Result<Serial, Error> {
        let serial = self.serials()?.pop().unwrap_or(Serial(0));
        debug!(
            "Highest serial in '{}' is {}",
            self.path.display(),
            serial
        );
        Ok(serial)
    }

    /// Starts writing a new snapshot for the given serial.
    pub fn begin(&self, serial: Serial) -> Result<PartialSnapshot, Error> {
        PartialSnapshot::create(
            self.partial_path(serial),
            self.snapshot_path(serial),
        )
    }

    /// Writes the records as a new snapshot.
    ///
    /// The snapshot is named after the serial of the records’ SOA record.
    /// If there is no such record, the snapshot is named `0`. An existing
    /// snapshot with the same serial is replaced.
    ///
    /// Returns the path of the new snapshot.
    pub fn write(
        &self,
        records: &RecordSet,
        zone: &StoredName,
    ) -> Result<PathBuf, Error> {
        let serial = match records.extract_serial() {
            Some((serial, _)) => serial,
            None => {
                warn!("No SOA record for zone '{}', writing serial 0", zone);
                Serial(0)
            }
        };
        let mut snapshot = self.begin(serial)?;
        snapshot.write_zone(records, zone)?;
        snapshot.commit()
    }

    /// Loads the snapshot with the given serial.
    pub fn load(
        &self,
        serial: Serial,
        zone: &StoredName,
    ) -> Result<RecordSet, Error> {
        load_snapshot(self.snapshot_path(serial), zone)
    }

    /// Loads the snapshot with the given serial into `records`.
    ///
    /// See [`read_snapshot`] for details.
    pub fn load_into(
        &self,
        serial: Serial,
        zone: &StoredName,
        records: &mut RecordSet,
    ) -> Result<usize, Error> {
        read_snapshot(self.snapshot_path(serial), zone, records)
    }

    /// Loads only the SOA record of the snapshot with the given serial.
    pub fn load_soa(
        &self,
        serial: Serial,
        zone: &StoredName,
    ) -> Result<Option<Soa<StoredName>>, Error> {
        load_first_soa(self.snapshot_path(serial), zone)
    }
}

//------------ Helper Functions ----------------------------------------------

/// Returns the serial a directory entry stands for.
///
/// An entry is a snapshot only if its name is the canonical decimal
/// representation of a 32 bit number: no sign, no leading zeros, and
/// nothing else.
fn snapshot_serial(name: &OsStr) -> Option<Serial> {
    let name = name.to_str()?;
    let serial = name.parse::<u32>().ok()?;
    if serial.to_string() == name {
        Some(Serial(serial))
    } else {
        None
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    fn serial(name: &str) -> Option<u32> {
        snapshot_serial(OsStr::new(name)).map(Serial::into_int)
    }

    #[test]
    fn snapshot_names() {
        assert_eq!(serial("0"), Some(0));
        assert_eq!(serial("42"), Some(42));
        assert_eq!(serial("4294967295"), Some(u32::MAX));
    }

    #[test]
    fn non_snapshot_names() {
        for name in [
            "", ".", "..", ".hidden", "007", "-1", "+1", "abc", "12.partial",
            " 12", "12 ", "4294967296",
        ] {
            assert_eq!(serial(name), None, "{:?}", name);
        }
    }

    #[test]
    fn paths() {
        let dir = SnapshotDir::new("/var/lib/ixfr/example.com");
        assert_eq!(
            dir.snapshot_path(Serial(7)),
            Path::new("/var/lib/ixfr/example.com/7")
        );
        assert_eq!(
            dir.partial_path(Serial(7)),
            Path::new("/var/lib/ixfr/example.com/7.partial")
        );
    }
}
