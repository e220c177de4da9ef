/*!
 * Region Lifecycle Tests
 * Init validation, teardown and re-initialization
 */

use pretty_assertions::assert_eq;
use vos_mem::memory::{
    BlockAllocator, ErrorKind, MemoryError, MemoryPressure, PreallocationPlan, SizeClass,
};

fn region(bytes: usize) -> Box<[u8]> {
    vec![0u8; bytes].into_boxed_slice()
}

#[test]
fn test_uninitialized_allocator_refuses_everything() {
    let allocator = BlockAllocator::new();
    assert!(!allocator.is_initialized());
    assert_eq!(allocator.allocate(32).unwrap_err().kind(), ErrorKind::NotInitialized);
    assert_eq!(allocator.usage().unwrap_err(), MemoryError::NotInitialized);
}

#[test]
fn test_operations_after_teardown_are_not_initialized() {
    let allocator = BlockAllocator::with_region(region(4096), None).unwrap();
    let handle = allocator.allocate(64).unwrap();
    let id = allocator.region_id().unwrap();

    let memory = allocator.teardown(id).unwrap();
    assert_eq!(memory.len(), 4096);

    assert_eq!(allocator.allocate(64), Err(MemoryError::NotInitialized));
    assert_eq!(allocator.deallocate(handle), Err(MemoryError::NotInitialized));
    assert_eq!(allocator.usage(), Err(MemoryError::NotInitialized));
    assert_eq!(allocator.teardown(id), Err(MemoryError::NotInitialized));
}

#[test]
fn test_init_rejects_bad_regions_and_returns_memory() {
    let allocator = BlockAllocator::new();

    let err = allocator.init(region(0), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let err = allocator.init(region(16), None).unwrap_err();
    assert!(matches!(err.error, MemoryError::InvalidRegion(_)));
    assert_eq!(err.into_region().len(), 16);

    assert!(!allocator.is_initialized());
}

#[test]
fn test_init_rejects_oversized_plans() {
    let allocator = BlockAllocator::new();

    let too_many = PreallocationPlan::single(SizeClass::MIN, 11);
    let err = allocator.init(region(4096), Some(&too_many)).unwrap_err();
    assert!(matches!(err.error, MemoryError::InvalidPlan(_)));

    let too_big = PreallocationPlan::single(SizeClass::MAX, 1);
    let err = allocator.init(region(4096), Some(&too_big)).unwrap_err();
    assert!(matches!(err.error, MemoryError::PlanExceedsRegion { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn test_second_init_is_refused_while_active() {
    let allocator = BlockAllocator::with_region(region(4096), None).unwrap();
    let err = allocator.init(region(4096), None).unwrap_err();
    assert_eq!(err.error, MemoryError::AlreadyInitialized);
}

#[test]
fn test_teardown_wrong_region_is_refused() {
    let a = BlockAllocator::with_region(region(4096), None).unwrap();
    let b = BlockAllocator::with_region(region(4096), None).unwrap();
    let other = b.region_id().unwrap();

    assert!(matches!(
        a.teardown(other),
        Err(MemoryError::RegionMismatch { .. })
    ));
    assert!(a.is_initialized());
}

#[test]
fn test_reinit_invalidates_old_handles() {
    let allocator = BlockAllocator::with_region(region(4096), None).unwrap();
    let old = allocator.allocate(32).unwrap();
    let first = allocator.region_id().unwrap();
    let memory = allocator.teardown(first).unwrap();

    let second = allocator.init(memory, None).unwrap();
    assert_ne!(first, second);
    assert!(!allocator.is_valid(old));
    assert_eq!(allocator.deallocate(old), Err(MemoryError::ForeignBlock(old)));
    assert_eq!(allocator.usage().unwrap().allocated_bytes, 0);
}

#[test]
fn test_pressure_follows_usage() {
    let allocator = BlockAllocator::with_region(region(1024), None).unwrap();
    assert_eq!(allocator.pressure().unwrap(), MemoryPressure::Low);

    let _big = allocator.allocate(512).unwrap();
    let _mid = allocator.allocate(256).unwrap();
    let _small = allocator.allocate(128).unwrap();
    // 896 of 1024 bytes
    assert_eq!(allocator.pressure().unwrap(), MemoryPressure::High);

    let _rest = allocator.allocate(128).unwrap();
    assert_eq!(allocator.pressure().unwrap(), MemoryPressure::Critical);
}
