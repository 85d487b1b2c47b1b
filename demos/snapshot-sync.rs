/// Checking a secondary zone against its master.
///
/// Reports the serial of the latest local snapshot and the serial of the
/// master. Set RUST_LOG=domain_ixfr=DEBUG to see what is going on.
use core::str::FromStr;
use std::process::exit;
use std::time::Duration;

use domain_ixfr::logging::init_logging;
use domain_ixfr::{Config, Refresh, Secondary, StoredName, TsigTriplet};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 && args.len() != 5 {
        eprintln!(
            "Usage: {} <master addr:port> <zone> <directory> [<tsig>]",
            args[0]
        );
        eprintln!(
            "E.g.:  {} 127.0.0.1:8053 example.com /var/lib/ixfr/example.com \
             key.example:c2VjcmV0:hmac-sha256",
            args[0]
        );
        exit(1);
    }

    let master = match args[1].parse() {
        Ok(addr) => addr,
        Err(err) => {
            eprintln!("Invalid master address '{}': {err}", args[1]);
            exit(1);
        }
    };
    let zone = match StoredName::from_str(&args[2]) {
        Ok(zone) => zone,
        Err(err) => {
            eprintln!("Invalid zone '{}': {err}", args[2]);
            exit(1);
        }
    };
    let mut config = Config::new(zone, master, &args[3]);
    if let Some(tsig) = args.get(4) {
        match TsigTriplet::from_str(tsig) {
            Ok(tsig) => config.set_tsig(Some(tsig)),
            Err(err) => {
                eprintln!("Invalid TSIG key: {err}");
                exit(1);
            }
        }
    }

    let secondary = match Secondary::new(&config) {
        Ok(secondary) => secondary,
        Err(err) => {
            eprintln!("{err}");
            exit(1);
        }
    };

    match secondary.check_with_deadline(Duration::from_secs(10)).await {
        Ok(Refresh::Outdated { local, master }) => {
            println!("Local serial {local}, master serial {master}: transfer needed");
        }
        Ok(Refresh::UpToDate { local }) => {
            println!("Local serial {local}: up to date");
        }
        Ok(Refresh::Unknown { local }) => {
            println!("Local serial {local}: master did not report a serial");
        }
        Err(err) => {
            eprintln!("{err}");
            exit(1);
        }
    }
}
