//! Heartbeat against concurrent demand writers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tpi_driver::{DemandState, Heartbeat, HeartbeatConfig, MockLink, Session, SessionConfig};
use tpi_protocol::{Demand, FrameDecoder, PacketValue};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn decode_demand(bytes: &[u8]) -> (i8, i8) {
    let packet = FrameDecoder::new()
        .feed_bytes(bytes)
        .expect("heartbeat wrote an invalid frame")
        .expect("heartbeat wrote an incomplete frame");
    match packet.into_value() {
        PacketValue::Demand { x, y } => (x, y),
        other => panic!("expected a demand frame, got {other}"),
    }
}

#[test]
fn test_no_torn_demand_under_concurrent_writers() {
    init_logging();

    let link = MockLink::new();
    let session = Session::new(link.clone()).into_shared();
    let demand = DemandState::new(Demand::ZERO);
    let config = HeartbeatConfig {
        interval: Duration::from_micros(200),
        poll_every: 5,
        poll_timeout: Duration::from_micros(100),
        fallback_window: Duration::from_millis(50),
        max_failed_ticks: 3,
    };

    let heartbeat = Heartbeat::start(session.clone(), demand.clone(), config).unwrap();

    // Every pair written satisfies y == -x
    let done = Arc::new(AtomicBool::new(false));
    let writers: Vec<_> = (0..4)
        .map(|seed: i32| {
            let demand = demand.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut v = seed * 17;
                while !done.load(Ordering::Relaxed) {
                    v = (v * 31 + 7).rem_euclid(201) - 100;
                    demand.set(v, -v).unwrap();
                    thread::yield_now();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let demand = demand.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut reads = 0u64;
                while !done.load(Ordering::Relaxed) {
                    let d = demand.get();
                    assert_eq!(i16::from(d.y()), -i16::from(d.x()));
                    reads += 1;
                    thread::yield_now();
                }
                reads
            })
        })
        .collect();

    let deadline = Instant::now() + Duration::from_secs(10);
    while link.writes().len() < 100 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    done.store(true, Ordering::Relaxed);

    for writer in writers {
        writer.join().unwrap();
    }
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    let report = heartbeat.stop_and_join().unwrap();

    let writes = link.writes();
    assert!(writes.len() >= 100, "only {} heartbeats", writes.len());
    assert_eq!(writes.len() as u64, report.sent);
    for frame in &writes {
        let (x, y) = decode_demand(frame);
        assert_eq!(i16::from(y), -i16::from(x), "torn demand {x}/{y}");
    }
}

#[test]
fn test_session_usable_after_heartbeat_stops() {
    init_logging();

    let link = MockLink::new();
    let quick = SessionConfig {
        receive_timeout: Duration::from_millis(10),
        drain_timeout: Duration::from_millis(2),
        handshake_attempts: 1,
    };
    let session = Session::with_config(link.clone(), quick).into_shared();
    let demand = DemandState::new(Demand::new(10, 0).unwrap());

    let heartbeat = Heartbeat::start(
        session.clone(),
        demand.clone(),
        HeartbeatConfig {
            interval: Duration::from_millis(1),
            ..HeartbeatConfig::default()
        },
    )
    .unwrap();

    // Application traffic shares the session with the heartbeat
    {
        let _demand = demand.lock();
        session.lock().unwrap().send_status(true).unwrap();
    }
    while link.writes().len() < 5 {
        thread::sleep(Duration::from_millis(1));
    }
    let report = heartbeat.stop_and_join().unwrap();

    let mut session = Arc::try_unwrap(session)
        .ok()
        .expect("heartbeat still holds the session")
        .into_inner()
        .unwrap();
    assert_eq!(session.n_tx(), report.sent + 1);

    demand.stop();
    session.send_demand_value(demand.get()).unwrap();
    session.shutdown().unwrap();

    let writes = session.into_link().writes();
    assert!(writes.contains(&vec![0xF0, 0x01, 0x02, 0x00, 0x00, 0xC7, 0xF0]));
    assert!(writes.contains(&vec![0xF0, 0x88, 0x02, 0x00, 0x00, 0xF3, 0xF0]));
}
