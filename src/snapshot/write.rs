//! Writing snapshots.
//!
//! A snapshot is written into a file with the suffix `.partial` first and
//! only renamed to its final name once all data has been written and
//! synced to disk. This happens in two steps through [`PartialSnapshot`]:
//! [`write_zone`][PartialSnapshot::write_zone] produces the content and
//! [`commit`][PartialSnapshot::commit] makes it visible. A partial snapshot
//! that is dropped without being committed stays behind as a `.partial`
//! file, exactly as after a crash.
//!
//! The content is a zonefile starting with an `$ORIGIN` directive,
//! followed by one line per record of the form
//! `<owner>\tIN\t<type>\t<data>`. The owner is `@` for the apex and the
//! name relative to the apex otherwise. The SOA record is written before
//! and after all the other records.

use core::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use domain::rdata::ZoneRecordData;
use tracing::{debug, trace};

use crate::error::{Error, IoError};
use crate::records::{
    RecordSet, RelativeOwner, StoredName, StoredRecordData, ZoneRecord,
};

//------------ PartialSnapshot -----------------------------------------------

/// A snapshot that is currently being written.
#[derive(Debug)]
pub struct PartialSnapshot {
    /// The file we are writing to.
    file: BufWriter<File>,

    /// The path of the file we are writing to.
    partial_path: PathBuf,

    /// The path the file will be renamed to.
    final_path: PathBuf,
}

impl PartialSnapshot {
    /// Creates the partial file, truncating an existing one.
    pub(super) fn create(
        partial_path: PathBuf,
        final_path: PathBuf,
    ) -> Result<Self, Error> {
        let file = File::create(&partial_path).map_err(IoError::map(
            "Unable to open file for writing",
            partial_path.display(),
        ))?;
        debug!("Writing '{}'", partial_path.display());
        Ok(PartialSnapshot {
            file: BufWriter::new(file),
            partial_path,
            final_path,
        })
    }

    /// Returns the path of the file currently being written.
    pub fn partial_path(&self) -> &Path {
        &self.partial_path
    }

    /// Returns the path the snapshot will have once committed.
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Writes the records of the zone.
    ///
    /// The SOA record of `records` is written first, then all records of
    /// the set, which includes the SOA record once more, and finally the
    /// SOA record again.
    pub fn write_zone(
        &mut self,
        records: &RecordSet,
        zone: &StoredName,
    ) -> Result<(), Error> {
        let soa = records.extract_serial().map(|(_, soa)| soa);
        let res = write_zone(&mut self.file, records, soa, zone);
        res.map_err(IoError::map(
            "Unable to write file",
            self.partial_path.display(),
        ))?;
        trace!(
            "Wrote {} records to '{}'",
            records.len(),
            self.partial_path.display()
        );
        Ok(())
    }

    /// Completes the snapshot.
    ///
    /// Flushes and syncs the file and then renames it to its final name,
    /// replacing any existing file by that name. Returns the final path.
    pub fn commit(self) -> Result<PathBuf, Error> {
        let PartialSnapshot {
            file,
            partial_path,
            final_path,
        } = self;
        let file = file
            .into_inner()
            .map_err(|err| err.into_error())
            .and_then(|file| file.sync_all().map(|_| file))
            .map_err(IoError::map(
                "Unable to write file",
                partial_path.display(),
            ))?;
        drop(file);
        fs::rename(&partial_path, &final_path).map_err(IoError::map(
            "Unable to rename file",
            partial_path.display(),
        ))?;
        debug!("Committed '{}'", final_path.display());
        Ok(final_path)
    }
}

//------------ Helper Functions ----------------------------------------------

/// Writes the zone’s content.
fn write_zone(
    target: &mut impl Write,
    records: &RecordSet,
    soa: Option<&ZoneRecord>,
    zone: &StoredName,
) -> Result<(), std::io::Error> {
    writeln!(target, "$ORIGIN {}", Absolute(zone))?;
    for record in soa.into_iter().chain(records).chain(soa) {
        write_record(target, record)?;
    }
    Ok(())
}

/// Writes a single record line.
fn write_record(
    target: &mut impl Write,
    record: &ZoneRecord,
) -> Result<(), std::io::Error> {
    writeln!(
        target,
        "{}\tIN\t{}\t{}",
        Owner(record.owner()),
        record.rtype(),
        Data(record.data())
    )
}

//------------ Absolute ------------------------------------------------------

/// Displays an absolute name including the trailing dot.
struct Absolute<'a>(&'a StoredName);

impl fmt::Display for Absolute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_root() {
            f.write_str(".")
        } else {
            write!(f, "{}.", self.0)
        }
    }
}

//------------ Data ----------------------------------------------------------

/// Displays record data in zonefile format.
///
/// The `Display` impls of the record data types either leave off the
/// trailing dot of embedded names or add one even to the root name, so
/// all types that contain names are written out here.
struct Data<'a>(&'a StoredRecordData);

impl fmt::Display for Data<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            ZoneRecordData::Cname(data) => {
                write!(f, "{}", Absolute(data.cname()))
            }
            ZoneRecordData::Dname(data) => {
                write!(f, "{}", Absolute(data.dname()))
            }
            ZoneRecordData::Mb(data) => {
                write!(f, "{}", Absolute(data.madname()))
            }
            ZoneRecordData::Md(data) => {
                write!(f, "{}", Absolute(data.madname()))
            }
            ZoneRecordData::Mf(data) => {
                write!(f, "{}", Absolute(data.madname()))
            }
            ZoneRecordData::Mg(data) => {
                write!(f, "{}", Absolute(data.madname()))
            }
            ZoneRecordData::Mr(data) => {
                write!(f, "{}", Absolute(data.newname()))
            }
            ZoneRecordData::Ns(data) => {
                write!(f, "{}", Absolute(data.nsdname()))
            }
            ZoneRecordData::Ptr(data) => {
                write!(f, "{}", Absolute(data.ptrdname()))
            }
            ZoneRecordData::Minfo(data) => write!(
                f,
                "{} {}",
                Absolute(data.rmailbx()),
                Absolute(data.emailbx())
            ),
            ZoneRecordData::Mx(data) => write!(
                f,
                "{} {}",
                data.preference(),
                Absolute(data.exchange())
            ),
            ZoneRecordData::Srv(data) => write!(
                f,
                "{} {} {} {}",
                data.priority(),
                data.weight(),
                data.port(),
                Absolute(data.target())
            ),
            ZoneRecordData::Soa(data) => write!(
                f,
                "{} {} {} {} {} {} {}",
                Absolute(data.mname()),
                Absolute(data.rname()),
                data.serial(),
                data.refresh().as_secs(),
                data.retry().as_secs(),
                data.expire().as_secs(),
                data.minimum().as_secs()
            ),
            data => fmt::Display::fmt(data, f),
        }
    }
}

//------------ Owner ---------------------------------------------------------

/// Displays a relative owner name, using `@` for the apex.
struct Owner<'a>(&'a RelativeOwner);

impl fmt::Display for Owner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.as_slice().is_empty() {
            f.write_str("@")
        } else {
            fmt::Display::fmt(self.0, f)
        }
    }
}

//============ Testing =======================================================
