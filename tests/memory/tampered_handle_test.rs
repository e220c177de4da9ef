/*!
 * Tampered Handle Tests
 * Handles rebuilt from serialized form with altered fields are refused, never trusted
 */

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use vos_mem::memory::{BlockAllocator, BlockHandle, ErrorKind, MemoryError};

fn allocator() -> BlockAllocator {
    BlockAllocator::with_region(vec![0u8; 64 * 1024].into_boxed_slice(), None).unwrap()
}

/// Serialize `handle`, overwrite one field and read it back
fn tamper(handle: BlockHandle, field: &str, value: Value) -> serde_json::Result<BlockHandle> {
    let mut encoded = serde_json::to_value(handle)?;
    encoded[field] = value;
    serde_json::from_value(encoded)
}

fn assert_refused(allocator: &BlockAllocator, forged: BlockHandle) {
    let err = allocator.deallocate(forged).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert!(!err.to_string().is_empty());

    assert_eq!(
        allocator.read(forged, 0, 1).unwrap_err().kind(),
        ErrorKind::InvalidParameter
    );
    assert_eq!(
        allocator.write(forged, 0, b"x").unwrap_err().kind(),
        ErrorKind::InvalidParameter
    );
    assert!(!allocator.is_valid(forged));
    assert_eq!(allocator.block_size(forged), None);
}

#[test]
fn test_untouched_round_trip_stays_valid() {
    let allocator = allocator();
    let handle = allocator.allocate(64).unwrap();
    let json = serde_json::to_string(&handle).unwrap();
    let decoded: BlockHandle = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded, handle);
    assert!(allocator.is_valid(decoded));
}

#[test]
fn test_out_of_ladder_class_does_not_decode() {
    let allocator = allocator();
    let handle = allocator.allocate(64).unwrap();

    for class in [15, 200, 255] {
        assert!(tamper(handle, "class", json!(class)).is_err());
    }
    assert!(tamper(handle, "class", json!(-1)).is_err());
}

#[test]
fn test_wrong_class_is_invalid_block() {
    let allocator = allocator();
    let handle = allocator.allocate(64).unwrap();
    let before = allocator.usage().unwrap();

    for class in [0, 2, 14] {
        let forged = tamper(handle, "class", json!(class)).unwrap();
        assert_eq!(
            allocator.deallocate(forged),
            Err(MemoryError::InvalidBlock(forged))
        );
        assert_refused(&allocator, forged);
    }

    assert_eq!(allocator.usage().unwrap(), before);
    assert!(allocator.is_valid(handle));
}

#[test]
fn test_out_of_range_offset_with_wrong_class() {
    let allocator = allocator();
    let handle = allocator.allocate(64).unwrap();

    for offset in [2048u64, 1_000_000, u32::MAX as u64] {
        let forged = tamper(handle, "offset", json!(offset)).unwrap();
        let forged = tamper(forged, "class", json!(14)).unwrap();
        assert_eq!(
            allocator.deallocate(forged),
            Err(MemoryError::InvalidBlock(forged))
        );
        assert_refused(&allocator, forged);
    }
    assert!(allocator.is_valid(handle));
}

#[test]
fn test_interior_offset_and_bumped_generation() {
    let allocator = allocator();
    let handle = allocator.allocate(1024).unwrap();

    let interior = tamper(handle, "offset", json!(1)).unwrap();
    assert_refused(&allocator, interior);

    let generation = serde_json::to_value(handle).unwrap()["generation"]
        .as_u64()
        .unwrap();
    let stale = tamper(handle, "generation", json!(generation + 1)).unwrap();
    assert_refused(&allocator, stale);

    allocator.deallocate(handle).unwrap();
}
