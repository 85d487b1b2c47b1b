//! Keeping a secondary copy of a zone.
//!
//! [`Secondary`] combines a [`SnapshotDir`] and a [`Master`] into the
//! control flow of a secondary: find the latest local snapshot, ask the
//! master for its serial, and, if the master is ahead, store the new
//! version of the zone obtained by some transfer mechanism.
//!
//! The transfer itself is not part of this crate.

use std::fmt;
use std::path::PathBuf;

use domain::base::Serial;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, IoError};
use crate::master::Master;
use crate::records::{RecordSet, StoredName};
use crate::snapshot::{load_first_soa, SnapshotDir};

//------------ Refresh -------------------------------------------------------

/// The outcome of comparing the local serial with the master’s.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Refresh {
    /// The local copy is current.
    UpToDate {
        /// The local serial.
        local: Serial,
    },

    /// The master has a newer version of the zone.
    Outdated {
        /// The local serial.
        local: Serial,

        /// The master’s serial.
        master: Serial,
    },

    /// The master did not provide a SOA record.
    Unknown {
        /// The local serial.
        local: Serial,
    },
}

impl Refresh {
    /// Compares the local and master serials.
    ///
    /// The master is considered newer only if its serial is numerically
    /// greater than the local one. This matches the order used for picking
    /// the latest snapshot, so storing the master's version always ends
    /// the refresh.
    pub fn new(local: Serial, master: Option<Serial>) -> Self {
        match master {
            None => Refresh::Unknown { local },
            Some(master) if master.into_int() > local.into_int() => {
                Refresh::Outdated { local, master }
            }
            Some(_) => Refresh::UpToDate { local },
        }
    }

    /// Returns the local serial.
    pub fn local(self) -> Serial {
        match self {
            Refresh::UpToDate { local }
            | Refresh::Outdated { local, .. }
            | Refresh::Unknown { local } => local,
        }
    }

    /// Returns whether a transfer from the master is needed.
    pub fn is_outdated(self) -> bool {
        matches!(self, Refresh::Outdated { .. })
    }
}

impl fmt::Display for Refresh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Refresh::UpToDate { local } => write!(f, "up to date at {}", local),
            Refresh::Outdated { local, master } => {
                write!(f, "outdated: local {}, master {}", local, master)
            }
            Refresh::Unknown { local } => {
                write!(f, "local {}, master serial unknown", local)
            }
        }
    }
}

//------------ Secondary -----------------------------------------------------

/// A secondary copy of a single zone.
#[derive(Clone, Debug)]
pub struct Secondary {
    /// The apex of the zone.
    zone: StoredName,

    /// The directory the snapshots live in.
    dir: SnapshotDir,

    /// The master of the zone.
    master: Master,
}

impl Secondary {
    /// Creates a secondary from its configuration.
    ///
    /// Fails if the configured TSIG triplet does not form a valid key.
    pub fn new(config: &Config) -> Result<Self, Error> {
        Ok(Self::from_parts(
            config.zone().clone(),
            config.snapshot_dir(),
            config.to_master()?,
        ))
    }

    /// Creates a secondary from its components.
    pub fn from_parts(
        zone: StoredName,
        dir: SnapshotDir,
        master: Master,
    ) -> Self {
        Secondary { zone, dir, master }
    }

    /// Returns the apex of the zone.
    pub fn zone(&self) -> &StoredName {
        &self.zone
    }

    /// Returns the snapshot directory.
    pub fn snapshot_dir(&self) -> &SnapshotDir {
        &self.dir
    }

    /// Returns the master.
    pub fn master(&self) -> &Master {
        &self.master
    }

    /// Returns the serial of the latest local snapshot.
    ///
    /// Returns serial 0 if there are no snapshots yet.
    pub fn local_serial(&self) -> Result<Serial, Error> {
        self.dir.highest_serial()
    }

    /// Returns the serial currently published by the master.
    pub fn master_serial(&self) -> Result<Option<Serial>, Error> {
        self.master.query_serial(&self.zone)
    }

    /// Checks whether the master has a newer version of the zone.
    pub fn check(&self) -> Result<Refresh, Error> {
        let local = self.local_serial()?;
        let master = self.master_serial()?;
        let res = Refresh::new(local, master);
        if let Refresh::Unknown { .. } = res {
            warn!(
                "Master {} returned no SOA record for '{}'",
                self.master.addr(),
                self.zone
            );
        }
        info!("Zone '{}' is {}", self.zone, res);
        Ok(res)
    }

    /// Checks the master, giving up after `deadline`.
    ///
    /// The exchange runs on a helper thread. If the deadline passes, an
    /// [`Error::Timeout`] is returned and the helper thread is left to
    /// finish on its own.
    #[cfg(feature = "net")]
    pub async fn check_with_deadline(
        &self,
        deadline: std::time::Duration,
    ) -> Result<Refresh, Error> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let this = self.clone();
        std::thread::Builder::new()
            .name("ixfr-check".into())
            .spawn(move || {
                // The receiver is gone if we timed out already.
                let _ = tx.send(this.check());
            })
            .map_err(IoError::map("Unable to spawn thread for", &self.zone))?;
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(res)) => res,
            Ok(Err(_)) => Err(Error::Io(IoError::new(
                "Check thread failed for",
                &self.zone,
                std::io::ErrorKind::Other.into(),
            ))),
            Err(_) => {
                warn!(
                    "Check of '{}' with master {} timed out",
                    self.zone,
                    self.master.addr()
                );
                Err(Error::Timeout(deadline))
            }
        }
    }

    /// Stores a new version of the zone.
    ///
    /// Writes the records as a snapshot and then reads back the SOA record
    /// of the new file to make sure it is there. Returns the serial of the
    /// stored snapshot.
    pub fn store(&self, records: &RecordSet) -> Result<Serial, Error> {
        let path = self.dir.write(records, &self.zone)?;
        let serial = match load_first_soa(&path, &self.zone)? {
            Some(soa) => soa.serial(),
            None => Serial(0),
        };
        debug!("Stored serial {} of '{}'", serial, self.zone);
        Ok(serial)
    }

    /// Loads the snapshot with the given serial.
    pub fn load(&self, serial: Serial) -> Result<RecordSet, Error> {
        self.dir.load(serial, &self.zone)
    }

    /// Loads the latest snapshot.
    ///
    /// Returns `Ok(None)` if there is no snapshot.
    pub fn load_latest(&self) -> Result<Option<(Serial, RecordSet)>, Error> {
        let serial = match self.dir.serials()?.pop() {
            Some(serial) => serial,
            None => return Ok(None),
        };
        self.load(serial).map(|records| Some((serial, records)))
    }

    /// Returns the path of the snapshot with the given serial.
    pub fn snapshot_path(&self, serial: Serial) -> PathBuf {
        self.dir.snapshot_path(serial)
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn refresh_decision() {
        assert_eq!(
            Refresh::new(Serial(0), Some(Serial(1))),
            Refresh::Outdated {
                local: Serial(0),
                master: Serial(1)
            }
        );
        assert!(Refresh::new(Serial(5), Some(Serial(6))).is_outdated());
        assert!(!Refresh::new(Serial(6), Some(Serial(6))).is_outdated());
        assert!(!Refresh::new(Serial(7), Some(Serial(6))).is_outdated());
        assert_eq!(
            Refresh::new(Serial(5), None),
            Refresh::Unknown { local: Serial(5) }
        );
    }

    #[test]
    fn master_serial_zero() {
        assert_eq!(
            Refresh::new(Serial(0), Some(Serial(0))),
            Refresh::UpToDate { local: Serial(0) }
        );
    }

    #[test]
    fn serials_compare_numerically() {
        let max = Serial(u32::MAX);
        assert!(!Refresh::new(max, Some(Serial(1))).is_outdated());
        assert!(Refresh::new(Serial(1), Some(max)).is_outdated());
        assert!(
            Refresh::new(Serial(1), Some(Serial(1 << 31 | 2))).is_outdated()
        );
    }
}
