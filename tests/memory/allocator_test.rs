/*!
 * Block Allocator Tests
 * Class mapping, bounds, round trips, double free, exhaustion and splitting
 */

use pretty_assertions::assert_eq;
use vos_mem::core::limits::{BLOCK_SIZES, MAX_BLOCK_SIZE};
use vos_mem::memory::{
    BlockAllocator, BlockHandle, ErrorKind, MemoryError, PreallocationPlan, SizeClass,
};

fn region(bytes: usize) -> Box<[u8]> {
    vec![0u8; bytes].into_boxed_slice()
}

fn overlaps(a: &BlockHandle, b: &BlockHandle) -> bool {
    a.offset() < b.offset() + b.size() && b.offset() < a.offset() + a.size()
}

#[test]
fn test_fresh_region_is_all_free() {
    for size in [32, 1000, 4096, 100_000] {
        let allocator = BlockAllocator::with_region(region(size), None).unwrap();
        let usage = allocator.usage().unwrap();

        assert_eq!(usage.allocated_bytes, 0);
        assert!(usage.free_bytes <= size);
        assert_eq!(usage.free_bytes, size - size % 32);
        assert_eq!(usage.overhead_bytes, size % 32);
    }
}

#[test]
fn test_default_plan_population() {
    let plan = PreallocationPlan::default();
    let allocator = BlockAllocator::with_region(region(1024 * 1024), Some(&plan)).unwrap();
    let usage = allocator.usage().unwrap();

    let expected: Vec<usize> = vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 4, 0, 0];
    assert_eq!(usage.free_blocks.to_vec(), expected);
    assert_eq!(usage.allocated_bytes, 0);
    assert_eq!(usage.free_bytes, 1024 * 1024);
    assert_eq!(usage.remainder_bytes, 1024 * 1024 - plan.required_bytes());
}

#[test]
fn test_every_size_gets_a_large_enough_block_inside_the_region() {
    let total = 2 * 1024 * 1024;
    let allocator = BlockAllocator::with_region(region(total), None).unwrap();
    let mut live: Vec<BlockHandle> = Vec::new();

    let sizes = [1, 31, 32, 33, 100, 1000, 4097, 65536, 300_000, MAX_BLOCK_SIZE];
    for &size in &sizes {
        let handle = allocator.allocate(size).unwrap();
        assert!(handle.size() >= size, "{} got {}", size, handle.size());
        assert!(handle.offset() + handle.size() <= total);
        for other in &live {
            assert!(!overlaps(&handle, other), "{} overlaps {}", handle, other);
        }
        live.push(handle);
    }
}

#[test]
fn test_class_is_the_smallest_fit() {
    let allocator = BlockAllocator::with_region(region(2 * 1024 * 1024), None).unwrap();
    for (i, &size) in BLOCK_SIZES.iter().enumerate() {
        let handle = allocator.allocate(size).unwrap();
        assert_eq!(handle.class(), SizeClass::from_index(i).unwrap());
        allocator.deallocate(handle).unwrap();
    }
}

#[test]
fn test_out_of_range_sizes_are_invalid() {
    let allocator = BlockAllocator::with_region(region(4096), None).unwrap();

    for size in [0, MAX_BLOCK_SIZE + 1, usize::MAX] {
        let err = allocator.allocate(size).unwrap_err();
        assert_eq!(err, MemoryError::InvalidSize(size));
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }
    assert_eq!(allocator.stats().unwrap().allocations, 0);
}

#[test]
fn test_round_trip_restores_free_count() {
    let class = SizeClass::for_size(700).unwrap();
    let plan = PreallocationPlan::single(class, 2);
    let allocator = BlockAllocator::with_region(region(8192), Some(&plan)).unwrap();

    let before = allocator.usage().unwrap().free_in(class);
    let handle = allocator.allocate(700).unwrap();
    allocator.deallocate(handle).unwrap();
    assert_eq!(allocator.usage().unwrap().free_in(class), before);

    let again = allocator.allocate(700).unwrap();
    assert_eq!(again.class(), class);
}

#[test]
fn test_double_free_is_refused_without_damage() {
    let allocator = BlockAllocator::with_region(region(4096), None).unwrap();
    let handle = allocator.allocate(64).unwrap();
    allocator.deallocate(handle).unwrap();
    let usage = allocator.usage().unwrap();

    let err = allocator.deallocate(handle).unwrap_err();
    assert_eq!(err, MemoryError::DoubleFree(handle));
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert_eq!(allocator.usage().unwrap(), usage);

    // The block is handed out exactly once afterwards
    let a = allocator.allocate(64).unwrap();
    let b = allocator.allocate(64).unwrap();
    assert_ne!(a.offset(), b.offset());
}

#[test]
fn test_stale_handle_rejected_after_reuse() {
    let allocator = BlockAllocator::with_region(region(64), None).unwrap();
    let first = allocator.allocate(32).unwrap();
    allocator.deallocate(first).unwrap();
    let second = allocator.allocate(32).unwrap();
    assert_eq!(first.offset(), second.offset());

    assert!(allocator.deallocate(first).is_err());
    assert!(allocator.is_valid(second));
    allocator.deallocate(second).unwrap();
}

#[test]
fn test_foreign_handle_rejected() {
    let a = BlockAllocator::with_region(region(4096), None).unwrap();
    let b = BlockAllocator::with_region(region(4096), None).unwrap();
    let handle = a.allocate(32).unwrap();

    let err = b.deallocate(handle).unwrap_err();
    assert_eq!(err, MemoryError::ForeignBlock(handle));
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert!(a.is_valid(handle));
}

#[test]
fn test_exhaustion_of_smallest_class() {
    const N: usize = 64;
    let allocator = BlockAllocator::with_region(region(N * 32), None).unwrap();

    let mut offsets: Vec<usize> = (0..N)
        .map(|_| allocator.allocate(32).unwrap().offset())
        .collect();
    offsets.sort_unstable();
    offsets.dedup();
    assert_eq!(offsets.len(), N);

    let err = allocator.allocate(32).unwrap_err();
    assert!(matches!(err, MemoryError::OutOfMemory { requested: 32, .. }));
    assert_eq!(err.kind(), ErrorKind::OutOfMemory);
    assert_eq!(allocator.stats().unwrap().oom_count, 1);
}

#[test]
fn test_split_populates_intermediate_classes() {
    let plan = PreallocationPlan::single(SizeClass::for_size(1024).unwrap(), 1);
    let allocator = BlockAllocator::with_region(region(1024), Some(&plan)).unwrap();

    let handle = allocator.allocate(100).unwrap();
    assert_eq!(handle.size(), 128);

    let usage = allocator.usage().unwrap();
    let free = |size: usize| usage.free_in(SizeClass::for_size(size).unwrap());
    assert_eq!(free(128), 1);
    assert_eq!(free(256), 1);
    assert_eq!(free(512), 1);
    assert_eq!(free(1024), 0);
    assert_eq!(usage.allocated_bytes, 128);
    assert_eq!(usage.free_bytes, 1024 - 128);
    assert_eq!(allocator.stats().unwrap().splits, 1);
}

#[test]
fn test_freed_split_pieces_are_not_merged() {
    let plan = PreallocationPlan::single(SizeClass::for_size(1024).unwrap(), 1);
    let allocator = BlockAllocator::with_region(region(1024), Some(&plan)).unwrap();

    let handle = allocator.allocate(100).unwrap();
    allocator.deallocate(handle).unwrap();

    assert!(matches!(
        allocator.allocate(1024),
        Err(MemoryError::OutOfMemory { .. })
    ));
    assert_eq!(allocator.usage().unwrap().free_bytes, 1024);
}
