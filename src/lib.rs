//! Serial checks and on-disk snapshots for secondary DNS zones.
//!
//! This crate provides the building blocks a secondary name server needs
//! to keep track of the versions of a zone it has received from its master
//! via incremental zone transfer (IXFR). It does not perform the transfer
//! itself.
//!
//! Every version of a zone is kept as a snapshot, a zonefile in a
//! per-zone directory named after the zone’s serial. Snapshots are written
//! to a temporary file first and then atomically renamed, so a crash never
//! leaves a truncated snapshot under a final name. Each snapshot starts and
//! ends with the zone’s SOA record which makes it possible to detect files
//! that were cut short for some other reason.
//!
//! # Modules
//!
//! * [records] contains [`RecordSet`], the in-memory representation of a
//!   zone,
//! * [snapshot] contains [`SnapshotDir`] for managing a snapshot directory
//!   as well as the zonefile codec for reading and writing snapshots,
//! * [master] allows querying the master of a zone for its current serial,
//!   optionally secured with TSIG,
//! * [secondary] combines all of these into the control flow of a
//!   secondary,
//! * [config] describes the configuration of a secondary zone, and
//! * [error] contains the crate’s error type.
//!
//! # Reference of Feature Flags
//!
//! * `logging`: Enables the [logging] module which sets up a
//!   [tracing-subscriber](https://github.com/tokio-rs/tracing) for the
//!   events logged by this crate.
//! * `net`: Enables [`Secondary::check_with_deadline`] which runs the
//!   check of the master under a deadline using
//!   [Tokio](https://tokio.rs/). This feature is enabled by default.
//! * `serde`: Enables deserializing a [`config::Config`] using
//!   [serde](https://serde.rs/).
//!
//! # Example
//!
//! ```no_run
//! use std::str::FromStr;
//! use domain_ixfr::{Config, Refresh, Secondary, StoredName};
//!
//! let zone = StoredName::from_str("example.com").unwrap();
//! let config = Config::new(
//!     zone,
//!     "192.0.2.53:53".parse().unwrap(),
//!     "/var/lib/ixfr/example.com",
//! );
//! let secondary = Secondary::new(&config).unwrap();
//! match secondary.check().unwrap() {
//!     Refresh::Outdated { local, master } => {
//!         println!("need to transfer from {} to {}", local, master)
//!     }
//!     refresh => println!("{}", refresh),
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;
pub mod master;
pub mod records;
pub mod secondary;
pub mod snapshot;

pub use self::config::Config;
pub use self::error::Error;
pub use self::master::{Master, TsigTriplet};
pub use self::records::{RecordSet, StoredName, ZoneRecord};
pub use self::secondary::{Refresh, Secondary};
pub use self::snapshot::SnapshotDir;
