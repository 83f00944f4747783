use super::Allocator;
use crate::entity::EntityId;
use crate::test_util;

#[test]
fn test_reuse_after_barrier() {
    test_util::init();

    let mut alloc = Allocator::new(8, 2);

    let first: Vec<_> = (0..3).map(|_| alloc.allocate().id).collect();
    assert_eq!(first, [EntityId::new(0, 1), EntityId::new(1, 1), EntityId::new(2, 1)]);

    assert!(alloc.free(first[1]));
    assert_eq!(alloc.recycled_count(), 1);

    let e3 = alloc.allocate().id;
    let e4 = alloc.allocate().id;
    assert_eq!(e3, EntityId::new(3, 1), "recycle queue is below the barrier");
    assert_eq!(e4, EntityId::new(4, 1), "recycle queue is below the barrier");

    assert!(alloc.free(e4));
    assert!(alloc.free(e3));
    assert_eq!(alloc.recycled_count(), 3);

    let reused = alloc.allocate();
    assert!(reused.recycled);
    assert_eq!(reused.id, EntityId::new(1, 2), "the oldest recycled slot is reused first");

    assert_eq!(alloc.allocate().id, EntityId::new(4, 2));
    assert_eq!(alloc.recycled_count(), 1);
    assert_eq!(alloc.live_count(), 4);
}

#[test]
fn test_stale_id_stays_dead() {
    test_util::init();

    let mut alloc = Allocator::new(4, 0);

    let stale = alloc.allocate().id;
    assert!(alloc.is_alive(stale));
    assert!(alloc.free(stale));
    assert!(!alloc.is_alive(stale));
    assert!(!alloc.free(stale), "freeing twice is a no-op");

    let fresh = alloc.allocate().id;
    assert_eq!(fresh.index(), stale.index(), "barrier 0 reuses immediately");
    assert!(fresh.generation() > stale.generation());
    assert!(!alloc.is_alive(stale));
    assert!(alloc.is_alive(fresh));
    assert_eq!(alloc.get(stale.index()), Some(fresh));
}

#[test]
fn test_generations_strictly_increase() {
    test_util::init();

    const ROUNDS: usize = 64;
    const BARRIER: usize = 16;

    let mut alloc = Allocator::new(4, BARRIER);
    let mut last_generation = vec![0u32; ROUNDS * 2];

    for _ in 0..5 {
        let ids: Vec<_> = (0..ROUNDS).map(|_| alloc.allocate().id).collect();
        for &id in &ids {
            let last = &mut last_generation[id.usize()];
            assert!(id.generation() > *last, "{id} was issued without a newer generation");
            *last = id.generation();
        }

        for &id in &ids {
            assert!(alloc.free(id));
        }
        for &id in &ids {
            assert!(!alloc.is_alive(id));
        }
    }

    assert!(alloc.capacity() >= ROUNDS + BARRIER);
}

#[test]
fn test_growth_reports_new_len() {
    test_util::init();

    let mut alloc = Allocator::new(2, 0);
    assert_eq!(alloc.allocate().grown_to, None);
    assert_eq!(alloc.allocate().grown_to, None);
    assert_eq!(alloc.allocate().grown_to, Some(4));
    assert_eq!(alloc.capacity(), 4);
}

#[test]
fn test_iter_alive() {
    test_util::init();

    let mut alloc = Allocator::new(4, 10);
    let ids: Vec<_> = (0..6).map(|_| alloc.allocate().id).collect();
    alloc.free(ids[0]);
    alloc.free(ids[3]);

    let alive: Vec<_> = alloc.iter_alive().collect();
    assert_eq!(alive, [ids[1], ids[2], ids[4], ids[5]]);
}
