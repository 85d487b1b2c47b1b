//! The in-memory representation of a zone.
//!
//! A zone is kept as a [`RecordSet`], a multi-map from the pair of owner
//! name and record type to all the records with that owner and type. Owner
//! names are stored relative to the zone’s apex, so the apex itself is the
//! empty relative name.
//!
//! Iterating over a record set produces the records ordered by owner and
//! type and, for records sharing both, in the order they were inserted.
//! This is the order in which snapshots are written.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::slice;

use bytes::Bytes;
use domain::base::iana::Rtype;
use domain::base::name::{Name, RelativeName};
use domain::base::{Record, Serial};
use domain::rdata::{Soa, ZoneRecordData};

//------------ Type Aliases --------------------------------------------------

/// The type used for absolute domain names, such as the zone’s apex.
pub type StoredName = Name<Bytes>;

/// The type used for owner names relative to the apex.
pub type RelativeOwner = RelativeName<Bytes>;

/// The type used for record data.
pub type StoredRecordData = ZoneRecordData<Bytes, StoredName>;

/// The type used for records kept in a record set.
pub type ZoneRecord = Record<RelativeOwner, StoredRecordData>;

/// The key records are stored under.
type RecordKey = (RelativeOwner, Rtype);

//------------ RecordSet -----------------------------------------------------

/// All the records of a zone.
#[derive(Clone, Debug, Default)]
pub struct RecordSet {
    /// The records grouped by owner and type.
    records: BTreeMap<RecordKey, Vec<ZoneRecord>>,

    /// The total number of records.
    len: usize,
}

impl RecordSet {
    /// Creates a new, empty record set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records in the set.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the set contains no records.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Adds a record to the set.
    ///
    /// Records are never merged or replaced: adding a record that is
    /// already present results in it being present twice.
    pub fn insert(&mut self, record: ZoneRecord) {
        let key = (record.owner().clone(), record.rtype());
        self.records.entry(key).or_default().push(record);
        self.len += 1;
    }

    /// Returns all records with the given owner and type.
    pub fn get(&self, owner: &RelativeOwner, rtype: Rtype) -> &[ZoneRecord] {
        self.records
            .get(&(owner.clone(), rtype))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Removes all records.
    pub fn clear(&mut self) {
        self.records.clear();
        self.len = 0;
    }

    /// Returns an iterator over all records.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            groups: self.records.values(),
            current: [].iter(),
        }
    }

    /// Returns the serial and the record of the zone’s SOA.
    ///
    /// The SOA is looked for at the apex only. If there is more than one,
    /// the one inserted first wins. Returns `None` if there is no SOA
    /// record at all.
    pub fn extract_serial(&self) -> Option<(Serial, &ZoneRecord)> {
        self.get(&RelativeName::empty_bytes(), Rtype::SOA)
            .iter()
            .find_map(|record| match record.data() {
                ZoneRecordData::Soa(soa) => Some((soa.serial(), record)),
                _ => None,
            })
    }

    /// Returns the content of the zone’s SOA record if there is one.
    pub fn soa(&self) -> Option<&Soa<StoredName>> {
        self.extract_serial().and_then(|(_, record)| match record.data() {
            ZoneRecordData::Soa(soa) => Some(soa),
            _ => None,
        })
    }
}

//--- FromIterator and Extend

impl FromIterator<ZoneRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = ZoneRecord>>(iter: I) -> Self {
        let mut res = Self::new();
        res.extend(iter);
        res
    }
}

impl Extend<ZoneRecord> for RecordSet {
    fn extend<I: IntoIterator<Item = ZoneRecord>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record)
        }
    }
}

//--- IntoIterator

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a ZoneRecord;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

//------------ Iter ----------------------------------------------------------

/// An iterator over the records of a record set.
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    /// The remaining groups of records.
    groups: btree_map::Values<'a, RecordKey, Vec<ZoneRecord>>,

    /// The remaining records of the current group.
    current: slice::Iter<'a, ZoneRecord>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a ZoneRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.current.next() {
                return Some(record);
            }
            self.current = self.groups.next()?.iter();
        }
    }
}

//============ Testing =======================================================
