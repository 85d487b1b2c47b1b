//! Querying a master for its serial.

mod common;

use std::str::FromStr;
use std::sync::Arc;

use common::{answer, fake_master, init_logging, soa_data, zone};
use domain::base::iana::{Rcode, Rtype};
use domain::base::{MessageBuilder, Serial};
use domain::rdata::tsig::Time48;
use domain::rdata::Tsig;
use domain::tsig::ServerTransaction;
use domain_ixfr::error::{Error, MasterQueryReason};
use domain_ixfr::master::{Config, Master, TsigTriplet};

#[test]
fn serial_from_answer() {
    init_logging();
    let (addr, handle) = fake_master(|request| {
        Some(answer(&request, Rcode::NOERROR, Some(soa_data(2024010101))))
    });
    let master = Master::new(addr);
    let soa = master.query_soa(&zone()).unwrap().unwrap();
    assert_eq!(soa.serial(), Serial(2024010101));
    assert_eq!(soa.mname(), &common::name("ns.example.com."));

    let request = handle.join().unwrap();
    let question = request.sole_question().unwrap();
    assert_eq!(question.qname().to_string(), zone().to_string());
    assert_eq!(question.qtype(), Rtype::SOA);
    assert!(!request.header().qr());
}

#[test]
fn answer_without_soa() {
    init_logging();
    let (addr, handle) =
        fake_master(|request| Some(answer(&request, Rcode::NOERROR, None)));
    assert_eq!(Master::new(addr).query_serial(&zone()).unwrap(), None);
    handle.join().unwrap();
}

#[test]
fn error_rcode() {
    init_logging();
    let (addr, handle) =
        fake_master(|request| Some(answer(&request, Rcode::SERVFAIL, None)));
    let err = Master::new(addr).query_serial(&zone()).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("SERVFAIL"), "{}", text);
    assert!(text.contains(&addr.to_string()), "{}", text);
    match err {
        Error::MasterQuery(err) => {
            assert_eq!(err.master(), addr);
            assert_eq!(err.rcode(), Some(Rcode::SERVFAIL));
        }
        _ => panic!("unexpected error {}", err),
    }
    handle.join().unwrap();
}

#[test]
fn mismatched_id() {
    init_logging();
    let (addr, handle) = fake_master(|request| {
        let mut msg = MessageBuilder::new_vec();
        msg.header_mut().set_id(request.header().id().wrapping_add(1));
        msg.header_mut().set_qr(true);
        Some(msg.finish())
    });
    let err = Master::new(addr).query_serial(&zone()).unwrap_err();
    match err {
        Error::MasterQuery(err) => assert!(matches!(
            err.reason(),
            MasterQueryReason::UnexpectedAnswer
        )),
        _ => panic!("unexpected error {}", err),
    }
    handle.join().unwrap();
}

#[test]
fn read_timeout() {
    init_logging();
    let (addr, handle) = fake_master(|_| None);
    let mut config = Config::new();
    config.set_read_timeout(Some(std::time::Duration::from_millis(200)));
    let err = Master::with_config(addr, config)
        .query_serial(&zone())
        .unwrap_err();
    assert!(err.io_kind().is_some(), "{}", err);
    handle.join().unwrap();
}

#[test]
fn tsig_signed_exchange() {
    init_logging();
    let triplet = TsigTriplet::from_str(
        "transfer.example:ZG9tYWluLWl4ZnIgdGVzdCBrZXk=:hmac-sha256",
    )
    .unwrap();
    let server_key = Arc::new(triplet.to_key().unwrap());

    let (addr, handle) = fake_master(move |mut request| {
        let tran =
            ServerTransaction::request(&server_key, &mut request, Time48::now())
                .ok()
                .flatten()
                .expect("request not signed with the key");
        let mut msg = MessageBuilder::new_vec()
            .start_answer(&request, Rcode::NOERROR)
            .unwrap();
        msg.push((zone(), 3600, soa_data(77))).unwrap();
        let mut msg = msg.additional();
        tran.answer(&mut msg, Time48::now()).unwrap();
        Some(msg.finish())
    });

    let master = Master::with_tsig(addr, &triplet).unwrap();
    assert_eq!(master.query_serial(&zone()).unwrap(), Some(Serial(77)));

    let request = handle.join().unwrap();
    let tsig = request
        .additional()
        .unwrap()
        .limit_to::<Tsig<_, _>>()
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(tsig.owner().to_string(), "transfer.example");
    assert_eq!(tsig.data().fudge(), 300);
    assert_eq!(tsig.data().original_id(), request.header().id());
    assert!(tsig.data().other().is_empty());
}

#[test]
fn tsig_unsigned_answer() {
    init_logging();
    let triplet = TsigTriplet::from_str("transfer.example:c2VjcmV0").unwrap();
    let (addr, handle) = fake_master(|request| {
        Some(answer(&request, Rcode::NOERROR, Some(soa_data(77))))
    });
    let err = Master::with_tsig(addr, &triplet)
        .unwrap()
        .query_serial(&zone())
        .unwrap_err();
    match err {
        Error::MasterQuery(err) => {
            assert!(matches!(err.reason(), MasterQueryReason::Tsig(_)))
        }
        _ => panic!("unexpected error {}", err),
    }
    handle.join().unwrap();
}
