/*!
 * Message Queue Tests
 * FIFO delivery, capacity limits, timeouts and block accounting
 */

use pretty_assertions::assert_eq;
use std::thread;
use std::time::{Duration, Instant};
use vos_mem::ipc::{IpcError, QueueManager};
use vos_mem::memory::BlockAllocator;

fn setup() -> (QueueManager, BlockAllocator) {
    let allocator =
        BlockAllocator::with_region(vec![0u8; 256 * 1024].into_boxed_slice(), None).unwrap();
    (QueueManager::new(allocator.clone()), allocator)
}

#[test]
fn test_messages_arrive_in_send_order() {
    let (queues, _) = setup();
    let id = queues.create("ordered", 16, 64).unwrap();

    for i in 0..10u8 {
        queues.send(id, &[i; 3]).unwrap();
    }
    for i in 0..10u8 {
        assert_eq!(queues.receive(id, Duration::ZERO).unwrap(), vec![i; 3]);
    }
}

#[test]
fn test_capacity_is_enforced_and_recovers() {
    let (queues, _) = setup();
    let id = queues.create("bounded", 2, 16).unwrap();

    queues.send(id, b"a").unwrap();
    queues.send(id, b"b").unwrap();
    assert!(matches!(queues.send(id, b"c"), Err(IpcError::QueueFull { .. })));

    queues.receive(id, Duration::ZERO).unwrap();
    queues.send(id, b"c").unwrap();

    let stats = queues.stats(id).unwrap();
    assert_eq!(stats.capacity, 2);
    assert_eq!(stats.length, 2);
    assert_eq!(stats.sent, 3);
}

#[test]
fn test_empty_queue_times_out_after_deadline() {
    let (queues, _) = setup();
    let id = queues.create("quiet", 1, 16).unwrap();

    let start = Instant::now();
    let err = queues.receive(id, Duration::from_millis(30)).unwrap_err();
    assert!(matches!(err, IpcError::Timeout { .. }));
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_unbounded_wait_is_woken_by_sender() {
    let (queues, _) = setup();
    let id = queues.create("blocking", 1, 16).unwrap();

    let receiver = {
        let queues = queues.clone();
        thread::spawn(move || queues.receive(id, Duration::MAX))
    };
    thread::sleep(Duration::from_millis(20));
    queues.send(id, b"wake").unwrap();

    assert_eq!(receiver.join().unwrap().unwrap(), b"wake");
}

#[test]
fn test_unbounded_wait_ends_when_queue_destroyed() {
    let (queues, _) = setup();
    let id = queues.create("doomed", 1, 16).unwrap();
    queues.send(id, b"first").unwrap();
    assert_eq!(queues.receive(id, Duration::MAX).unwrap(), b"first");

    let receiver = {
        let queues = queues.clone();
        thread::spawn(move || queues.receive(id, Duration::MAX))
    };
    thread::sleep(Duration::from_millis(20));
    queues.destroy(id).unwrap();

    assert!(matches!(
        receiver.join().unwrap(),
        Err(IpcError::Closed(_)) | Err(IpcError::NotFound(_))
    ));
}

#[test]
fn test_receive_into_reports_length() {
    let (queues, _) = setup();
    let id = queues.create("sized", 4, 128).unwrap();
    queues.send(id, b"payload").unwrap();
    queues.send(id, b"").unwrap();

    let mut buf = [0u8; 128];
    assert_eq!(queues.receive_into(id, &mut buf, Duration::ZERO).unwrap(), 7);
    assert_eq!(&buf[..7], b"payload");
    assert_eq!(queues.receive_into(id, &mut buf, Duration::ZERO).unwrap(), 0);
}

#[test]
fn test_unknown_queue_is_not_found() {
    let (queues, _) = setup();
    assert!(matches!(queues.send(99, b"x"), Err(IpcError::NotFound(_))));
    assert!(matches!(
        queues.receive(99, Duration::ZERO),
        Err(IpcError::NotFound(_))
    ));
    assert!(matches!(queues.stats(99), Err(IpcError::NotFound(_))));
}

#[test]
fn test_name_is_reusable_after_destroy() {
    let (queues, _) = setup();
    let first = queues.create("reused", 1, 8).unwrap();
    queues.destroy(first).unwrap();
    assert!(matches!(queues.open("reused"), Err(IpcError::NotFound(_))));

    let second = queues.create("reused", 1, 8).unwrap();
    assert_ne!(first, second);
    assert_eq!(queues.open("reused").unwrap(), second);
}

#[test]
fn test_producer_consumer_threads() {
    let (queues, allocator) = setup();
    let id = queues.create("pipeline", 8, 256).unwrap();
    const MESSAGES: u32 = 200;

    let producer = {
        let queues = queues.clone();
        thread::spawn(move || {
            for i in 0..MESSAGES {
                let payload = i.to_le_bytes();
                loop {
                    match queues.send(id, &payload) {
                        Ok(()) => break,
                        Err(IpcError::QueueFull { .. }) => thread::yield_now(),
                        Err(e) => panic!("send failed: {}", e),
                    }
                }
            }
        })
    };

    for expected in 0..MESSAGES {
        let bytes = queues.receive(id, Duration::from_secs(5)).unwrap();
        let value = u32::from_le_bytes(bytes.try_into().unwrap());
        assert_eq!(value, expected);
    }
    producer.join().unwrap();

    assert_eq!(allocator.usage().unwrap().allocated_bytes, 0);
}
