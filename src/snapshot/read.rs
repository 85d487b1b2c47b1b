//! Reading snapshots.
//!
//! Snapshots are handed to the zonefile scanner of the `domain` crate. Since
//! snapshot lines carry neither a TTL nor, for CNAME records pointing at
//! the root, always a target, the text is normalized a little before being
//! scanned.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use domain::base::iana::Rtype;
use domain::base::name::FlattenInto;
use domain::base::Record;
use domain::rdata::{Soa, ZoneRecordData};
use domain::zonefile::inplace::{Entry, Zonefile};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, IncompleteZone, IoError};
use crate::records::{RecordSet, StoredName, StoredRecordData};

/// The TTL assumed for all records of a snapshot.
const DEFAULT_TTL: &str = "$TTL 3600\n";

/// Class mnemonics that may precede the record type.
const CLASSES: [&str; 4] = ["IN", "CH", "HS", "CS"];

//------------ read_snapshot -------------------------------------------------

/// Reads the snapshot at `path` into `records`.
///
/// Owner names are made relative to `zone`. Only the first SOA record of
/// the file is added to `records`. The snapshot is considered complete
/// only if its last record is a SOA record.
///
/// Returns the number of records parsed, which includes the SOA records
/// that were not added. If the snapshot turns out to be incomplete or
/// otherwise broken, `records` is cleared and an error returned.
pub fn read_snapshot(
    path: impl AsRef<Path>,
    zone: &StoredName,
    records: &mut RecordSet,
) -> Result<usize, Error> {
    let path = path.as_ref();
    let mut zonefile = open(path, zone)?;
    let mut seen_soa = false;
    let mut last_rtype = None;
    let mut count = 0;

    let res = loop {
        let entry = match zonefile.next_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => break Ok(()),
            Err(error) => {
                break Err(Error::Zonefile {
                    path: path.into(),
                    error,
                })
            }
        };
        let record: Record<StoredName, StoredRecordData> = match entry {
            Entry::Record(record) => record.flatten_into(),
            Entry::Include { path: include, .. } => {
                warn!(
                    "Skipping $INCLUDE of '{}' in '{}'",
                    include,
                    path.display()
                );
                continue;
            }
        };
        count += 1;
        let rtype = record.rtype();
        last_rtype = Some(rtype);

        let (owner, class, ttl, data) = (
            record.owner().clone(),
            record.class(),
            record.ttl(),
            record.into_data(),
        );
        let owner = match owner.strip_suffix(zone) {
            Ok(owner) => owner,
            Err(owner) => {
                break Err(Error::OutOfZone {
                    path: path.into(),
                    owner,
                })
            }
        };
        trace!("{} {} {}", owner, rtype, data);

        if rtype == Rtype::SOA {
            if seen_soa {
                continue;
            }
            seen_soa = true;
        }
        records.insert(Record::new(owner, class, ttl, data));
    };

    info!("Parsed {} records from '{}'", count, path.display());
    let res = res.and_then(|()| {
        if seen_soa && last_rtype == Some(Rtype::SOA) {
            debug!("Zone in '{}' is complete (SOA at end)", path.display());
            Ok(count)
        } else {
            Err(IncompleteZone::new(path.into(), count).into())
        }
    });
    if res.is_err() {
        records.clear();
    }
    res
}

/// Loads the snapshot at `path` into a new record set.
///
/// See [`read_snapshot`] for details.
pub fn load_snapshot(
    path: impl AsRef<Path>,
    zone: &StoredName,
) -> Result<RecordSet, Error> {
    let mut records = RecordSet::new();
    read_snapshot(path, zone, &mut records)?;
    Ok(records)
}

//------------ load_first_soa ------------------------------------------------

/// Returns the data of the first SOA record in the file at `path`.
///
/// Scanning stops at the first SOA record, so this works with snapshots
/// that are incomplete. Returns `Ok(None)` if there is no SOA record.
pub fn load_first_soa(
    path: impl AsRef<Path>,
    zone: &StoredName,
) -> Result<Option<Soa<StoredName>>, Error> {
    let path = path.as_ref();
    let mut zonefile = open(path, zone)?;
    loop {
        let entry = zonefile.next_entry().map_err(|error| Error::Zonefile {
            path: path.into(),
            error,
        })?;
        match entry {
            Some(Entry::Record(record)) => {
                let record: Record<StoredName, StoredRecordData> =
                    record.flatten_into();
                if let ZoneRecordData::Soa(soa) = record.into_data() {
                    return Ok(Some(soa));
                }
            }
            Some(Entry::Include { .. }) => {}
            None => return Ok(None),
        }
    }
}

//------------ Helper Functions ----------------------------------------------

/// Reads the file at `path` and prepares it for scanning.
fn open(path: &Path, zone: &StoredName) -> Result<Zonefile, Error> {
    let data = fs::read_to_string(path).map_err(IoError::map(
        "Unable to open zone file",
        path.display(),
    ))?;
    let mut zonefile = Zonefile::with_capacity(data.len() + DEFAULT_TTL.len());
    zonefile.extend_from_slice(DEFAULT_TTL.as_bytes());
    for line in data.lines() {
        zonefile.extend_from_slice(normalize_line(line).as_bytes());
        zonefile.extend_from_slice(b"\n");
    }
    zonefile.set_origin(zone.clone());
    Ok(zonefile)
}

/// Normalizes a single line of a snapshot.
///
/// A CNAME record with empty content is given the root name as its target.
/// All other lines are returned unchanged.
fn normalize_line(line: &str) -> Cow<str> {
    let mut tokens = line.split_whitespace().rev();
    let is_cname = tokens
        .next()
        .map(|token| token.eq_ignore_ascii_case("CNAME"))
        .unwrap_or(false);
    if !is_cname {
        return Cow::Borrowed(line);
    }
    let empty_target = match tokens.next() {
        // The owner may be implied by leading white space.
        None => true,
        Some(token) => {
            line.split_whitespace().count() == 2
                || token.bytes().all(|ch| ch.is_ascii_digit())
                || CLASSES.iter().any(|class| token.eq_ignore_ascii_case(class))
        }
    };
    if empty_target {
        Cow::Owned(format!("{} .", line.trim_end()))
    } else {
        Cow::Borrowed(line)
    }
}

//============ Testing =======================================================
