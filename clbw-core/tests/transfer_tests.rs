//! Transfer content tests
//!
//! Data written, copied and migrated through the simulated runtime must come
//! back bit-for-bit.

use std::time::Duration;

use clbw_core::runtime::ops;
use clbw_core::{BufferSize, HostBuffer, Session, SimRuntime, SteppingClock, TextReporter};
use proptest::prelude::*;

const PLATFORM: &str = "Transfer Test Platform";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open_with(data: Vec<f64>, devices: usize) -> Session<SimRuntime> {
    let runtime = SimRuntime::new().with_platform(PLATFORM, devices);
    let mut reporter = TextReporter::new(Vec::new());
    Session::open_with_host(runtime, PLATFORM, HostBuffer::from_vec(data), &mut reporter)
        .expect("session should open")
}

fn clock() -> SteppingClock {
    SteppingClock::new(Duration::from_micros(10))
}

fn bits(values: &[f64]) -> Vec<u64> {
    values.iter().map(|v| v.to_bits()).collect()
}

#[test]
fn test_every_buffer_holds_requested_elements() {
    init_logging();

    for requested in [9u64, 10, 64, 1000] {
        let size = BufferSize::new(requested).unwrap();
        let runtime = SimRuntime::new().with_platform(PLATFORM, 3);
        let mut reporter = TextReporter::new(Vec::new());
        let session = Session::open(runtime, PLATFORM, size, &mut reporter).unwrap();

        assert_eq!(session.host().len() as u64, requested);
        for device in 0..session.device_count() {
            assert_eq!(session.buffer(device).unwrap().len() as u64, requested);
        }
    }
}

#[test]
fn test_copy_makes_destination_equal_source() {
    init_logging();
    let mut session = open_with(vec![0.0; 32], 2);

    let payload: Vec<f64> = (0..32).map(|i| (i as f64).sqrt()).collect();
    session.write_device(0, &payload).unwrap();
    assert_ne!(session.read_device(1).unwrap(), payload);

    session.profile_copy(1, 0, &clock()).unwrap();

    let source = session.read_device(0).unwrap();
    let destination = session.read_device(1).unwrap();
    assert_eq!(bits(&source), bits(&destination));
    assert_eq!(bits(&destination), bits(&payload));
}

#[test]
fn test_copy_from_last_device_reaches_all_others() {
    init_logging();
    let mut session = open_with(vec![1.0; 16], 4);

    let payload = vec![-2.5; 16];
    session.write_device(3, &payload).unwrap();
    let copies = session.profile_copy(2, 3, &clock()).unwrap();

    assert_eq!(copies.len(), 3);
    for device in 0..4 {
        assert_eq!(session.read_device(device).unwrap(), payload);
    }
}

#[test]
fn test_read_fills_shared_host_buffer() {
    init_logging();
    let mut session = open_with(vec![0.25; 16], 2);

    let payload: Vec<f64> = (0..16).map(|i| i as f64).collect();
    session.write_device(1, &payload).unwrap();
    session.profile_read(1, &clock()).unwrap();

    // 设备按顺序读取，主机缓冲区最后保存的是设备 1 的内容
    assert_eq!(session.host().as_slice(), payload.as_slice());
    assert_eq!(session.runtime().call_count(ops::ENQUEUE_READ_BUFFER), 2);
}

proptest! {
    #[test]
    fn prop_write_then_read_is_bit_exact(data in prop::collection::vec(any::<f64>(), 9..256)) {
        let expected = data.clone();
        let mut session = open_with(data, 2);

        session.profile_write(1, &clock()).unwrap();
        for device in 0..2 {
            prop_assert_eq!(bits(&session.read_device(device).unwrap()), bits(&expected));
        }

        session.profile_read(1, &clock()).unwrap();
        prop_assert_eq!(bits(session.host().as_slice()), bits(&expected));
    }

    #[test]
    fn prop_migration_leaves_content_unchanged(repeat in 0u32..20, dst in 0usize..3) {
        let data: Vec<f64> = (0..64).map(|i| i as f64 * 1.5 - 7.0).collect();
        let mut session = open_with(data.clone(), 3);

        let migrations = session.profile_migrate(repeat, dst, &clock()).unwrap();
        prop_assert_eq!(migrations.len(), 2);
        for device in 0..3 {
            prop_assert_eq!(bits(&session.read_device(device).unwrap()), bits(&data));
        }
        prop_assert_eq!(
            session.runtime().call_count(ops::ENQUEUE_MIGRATE_MEM_OBJECTS),
            u64::from(repeat) * 4
        );
    }

    #[test]
    fn prop_throughput_finite_and_non_negative(step_us in 1u64..10_000, repeat in 0u32..50) {
        let mut session = open_with(vec![0.5; 128], 2);
        let clock = SteppingClock::new(Duration::from_micros(step_us));

        let mut all = session.profile_write(repeat, &clock).unwrap();
        all.extend(session.profile_copy(repeat, 1, &clock).unwrap());
        all.extend(session.profile_migrate(repeat, 0, &clock).unwrap());
        for m in &all {
            prop_assert!(m.gigabytes_per_second.is_finite());
            prop_assert!(m.gigabytes_per_second >= 0.0);
            prop_assert!(m.seconds > 0.0);
        }
    }
}
