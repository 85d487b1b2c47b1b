//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::net::{SocketAddr, UdpSocket};
use std::str::FromStr;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use domain::base::iana::{Class, Rcode};
use domain::base::name::RelativeName;
use domain::base::{Message, MessageBuilder, Record, Serial, Ttl};
use domain::rdata::{Soa, ZoneRecordData, A};
use domain_ixfr::records::{RelativeOwner, StoredRecordData};
use domain_ixfr::{RecordSet, StoredName, ZoneRecord};
use tracing_subscriber::EnvFilter;

/// Sets up logging for a test.
///
/// Use the RUST_LOG environment variable to see the events of a test run.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .without_time()
        .try_init()
        .ok();
}

//------------ Zone Data -----------------------------------------------------

pub fn zone() -> StoredName {
    StoredName::from_str("example.com.").unwrap()
}

pub fn name(s: &str) -> StoredName {
    StoredName::from_str(s).unwrap()
}

pub fn owner(label: &str) -> RelativeOwner {
    if label == "@" {
        RelativeName::empty_bytes()
    } else {
        name(&format!("{label}.example.com."))
            .strip_suffix(&zone())
            .unwrap()
    }
}

pub fn record(label: &str, data: StoredRecordData) -> ZoneRecord {
    Record::new(owner(label), Class::IN, Ttl::from_secs(3600), data)
}

pub fn soa_data(serial: u32) -> Soa<StoredName> {
    Soa::new(
        name("ns.example.com."),
        name("hostmaster.example.com."),
        Serial(serial),
        Ttl::from_secs(7200),
        Ttl::from_secs(3600),
        Ttl::from_secs(1209600),
        Ttl::from_secs(300),
    )
}

pub fn soa(serial: u32) -> ZoneRecord {
    record("@", ZoneRecordData::Soa(soa_data(serial)))
}

pub fn a(label: &str, last: u8) -> ZoneRecord {
    record(label, ZoneRecordData::A(A::from_octets(192, 0, 2, last)))
}

/// Returns a zone with a SOA record and `hosts` A records.
pub fn zone_records(serial: u32, hosts: u8) -> RecordSet {
    let mut res = RecordSet::new();
    res.insert(soa(serial));
    for i in 0..hosts {
        res.insert(a(&format!("host{i}"), i));
    }
    res
}

/// Returns the records of a set in iteration order.
pub fn records_of(set: &RecordSet) -> Vec<ZoneRecord> {
    set.iter().cloned().collect()
}

//------------ Fake Master ---------------------------------------------------

/// Runs a master that answers a single query.
///
/// The closure receives the query and returns the answer to send, if any.
/// The join handle returns the query as received.
pub fn fake_master<F>(respond: F) -> (SocketAddr, JoinHandle<Message<Vec<u8>>>)
where
    F: FnOnce(Message<Vec<u8>>) -> Option<Vec<u8>> + Send + 'static,
{
    let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
    sock.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    let addr = sock.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut buf = vec![0; 65535];
        let (len, peer) = sock.recv_from(&mut buf).unwrap();
        buf.truncate(len);
        let request = Message::from_octets(buf).unwrap();
        if let Some(answer) = respond(request.clone()) {
            sock.send_to(&answer, peer).unwrap();
        }
        request
    });
    (addr, handle)
}

/// Builds an answer to `request` with an optional SOA record.
pub fn answer(
    request: &Message<Vec<u8>>,
    rcode: Rcode,
    soa: Option<Soa<StoredName>>,
) -> Vec<u8> {
    let mut msg = MessageBuilder::new_vec()
        .start_answer(request, rcode)
        .unwrap();
    if let Some(soa) = soa {
        msg.push((zone(), 3600, soa)).unwrap();
    }
    msg.finish()
}
