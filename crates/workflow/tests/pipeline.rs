//! End-to-end pipeline tests against the simulated world.
//!
//! Time is paused in every test, so convergence delays and the
//! container-open timeout elapse instantly.

use kitsmith_config::AppConfig;
use kitsmith_core::{
    Facing, ItemId, Position, RunEvent, SequenceState, Stage, StagePayload, Status,
};
use kitsmith_index::{FileStore, InMemoryStore, IndexStore, LocationIndex};
use kitsmith_sim::{Registry, SimAction, SimWorld, SimWorldBuilder};
use kitsmith_workflow::{ReferenceKit, Session};
use std::sync::Arc;

const SUPPLY: Position = Position::new(-5, 64, 0);
const DISCARD: Position = Position::new(-5, 64, 5);
const DESTINATION: Position = Position::new(-5, 64, -5);
const REFERENCE: Position = Position::new(-8, 64, 0);
const STORAGE: Position = Position::new(10, 64, 10);

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.locations.supply = SUPPLY;
    config.locations.discard = DISCARD;
    config.locations.destination = DESTINATION;
    config.locations.reference = REFERENCE;
    config
}

/// Fixed chests, `sites` placement sites, `empties` empty containers in
/// supply, and a double chest of golden apples at `STORAGE`.
fn world(sites: i32, empties: usize) -> SimWorldBuilder {
    let registry = Registry::standard();
    let empty = registry.stack("shulker_box", 1).unwrap();
    let apples = registry
        .packaged_full_of("shulker_box", "golden_apple", 27)
        .unwrap();

    SimWorld::builder()
        .actor_at(Position::new(0, 64, 0))
        .chest(SUPPLY, vec![empty; empties])
        .chest(DISCARD, vec![])
        .chest(DESTINATION, vec![])
        .chest(REFERENCE, vec![])
        .double_chest(STORAGE, Facing::North, vec![apples.clone(), apples])
        .blocks((0..sites).map(|x| Position::new(x, 63, 5)), "smooth_stone")
        .give(vec![registry.stack("diamond_pickaxe", 1).unwrap()])
}

fn apple_index() -> LocationIndex {
    let mut index = LocationIndex::new();
    index.record(STORAGE, [ItemId(10)]);
    index
}

fn session(world: &SimWorld, store: Arc<dyn IndexStore>) -> Session {
    Session::new(Arc::new(world.clone()), store, config())
}

#[tokio::test(start_paused = true)]
async fn full_sequence_assembles_kits() {
    let world = world(3, 3).build();
    let store = Arc::new(InMemoryStore::with_index(apple_index()));
    let mut session = session(&world, store.clone())
        .with_kit(ReferenceKit::parse_list("golden_apple"));
    let mut events = session.events().subscribe();

    let report = session.run_sequence().await;

    assert_eq!(report.state, SequenceState::Done);
    assert_eq!(report.status, Status::Success);
    assert_eq!(report.message, "Broke 3 shulkers");
    assert!(report.scan.is_none(), "non-empty index must skip the scan");
    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].status, Status::Success);
    assert_eq!(report.items[0].stage, Stage::Dispose);

    // Three finished kits in the destination, one apple stack each
    let delivered = world.container_slots(DESTINATION).await.unwrap();
    assert_eq!(delivered.len(), 3);
    for kit in &delivered {
        assert!(kit.is_packaged_container());
        assert_eq!(kit.contents.len(), 1);
        assert_eq!(kit.contents[0].name, "golden_apple");
        assert_eq!(kit.contents[0].count, 64);
    }

    // The emptied working source went to discard with its leftovers
    let discarded = world.container_slots(DISCARD).await.unwrap();
    assert_eq!(discarded.len(), 1);
    assert_eq!(discarded[0].contents.len(), 24);

    assert_eq!(world.container_slots(SUPPLY).await.unwrap().len(), 0);
    assert!(session.working_source().is_none());
    assert_eq!(session.placement().placed(), 0);
    assert_eq!(store.save_count().await, 0);

    let mut completed = false;
    while let Ok(event) = events.try_recv() {
        if let RunEvent::SequenceCompleted { result, .. } = event.as_ref() {
            assert_eq!(result, "Broke 3 shulkers");
            completed = true;
        }
    }
    assert!(completed);
}

#[tokio::test(start_paused = true)]
async fn failed_fill_still_disposes_working_source() {
    let world = world(3, 0).build();
    let store = Arc::new(InMemoryStore::with_index(apple_index()));
    let mut session = session(&world, store)
        .with_kit(ReferenceKit::parse_list("golden_apple"));

    let report = session.run_sequence().await;

    assert_eq!(report.state, SequenceState::Done);
    assert_eq!(report.status, Status::Partial);
    assert!(report.placement.as_ref().unwrap().is_failure());
    assert_eq!(report.message, "Broke 0 shulkers");
    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].stage, Stage::Fill);
    assert_eq!(report.items[0].status, Status::Failure);

    // The untouched working source went to discard, nothing is stranded
    assert!(session.working_source().is_none());
    let discarded = world.container_slots(DISCARD).await.unwrap();
    assert_eq!(discarded.len(), 1);
    assert_eq!(discarded[0].contents.len(), 27);
    assert!(
        world
            .actions()
            .await
            .iter()
            .any(|a| matches!(a, SimAction::Break(_)))
    );
}

#[tokio::test(start_paused = true)]
async fn empty_kit_and_empty_reference_fails_before_placement() {
    let world = world(3, 3).build();
    let mut session = session(&world, Arc::new(InMemoryStore::with_index(apple_index())));

    let report = session.run_sequence().await;

    assert_eq!(report.state, SequenceState::Failed);
    assert_eq!(report.status, Status::Failure);
    assert_eq!(
        report.to_string(),
        "Sequence failed: Reference kit is empty or not set"
    );
    assert!(report.placement.is_none());
    assert!(
        !world
            .actions()
            .await
            .iter()
            .any(|a| matches!(a, SimAction::Withdraw { .. } | SimAction::Place(_)))
    );
}

#[tokio::test(start_paused = true)]
async fn reference_read_populates_empty_kit() {
    let registry = Registry::standard();
    let world = world(2, 2).build();
    world
        .set_container_slots(
            REFERENCE,
            vec![
                registry.stack("golden_apple", 1).unwrap(),
                registry.stack("golden_apple", 1).unwrap(),
            ],
        )
        .await;
    let mut session = session(&world, Arc::new(InMemoryStore::with_index(apple_index())));

    let report = session.read_reference().await;
    assert_eq!(report.status, Status::Success);
    assert_eq!(
        report.message,
        "Reference kit loaded with 2 items: golden_apple, golden_apple"
    );
    assert_eq!(session.kit().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_reference_read_keeps_previous_kit() {
    let world = world(2, 2).build();
    world.fail_opens(REFERENCE, u32::MAX).await;
    let mut session = session(&world, Arc::new(InMemoryStore::new()))
        .with_kit(ReferenceKit::parse_list("ender_pearl,arrow"));

    let report = session.read_reference().await;
    assert!(report.is_failure());
    assert_eq!(session.kit().items(), &["ender_pearl", "arrow"]);
}

#[tokio::test(start_paused = true)]
async fn placement_never_places_more_than_withdrawn() {
    // Five empties but only two usable sites
    let world = world(2, 5).build();
    let mut session = session(&world, Arc::new(InMemoryStore::new()));

    for _ in 0..2 {
        let report = session.place_containers().await;
        let placement = session.placement();
        assert!(placement.placed() <= placement.withdrawn());

        match report.payload {
            StagePayload::Placement {
                withdrawn,
                placed,
                returned,
                ..
            } => {
                assert!(placed <= withdrawn);
                assert_eq!(placed + returned, withdrawn);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    // First call placed two and returned three; the second found its sites
    // occupied and returned everything
    let first_sites: Vec<Position> = (0..2).map(|x| Position::new(x, 64, 5)).collect();
    for site in &first_sites {
        assert_eq!(world.block(*site).await.unwrap().name, "shulker_box");
    }
    assert_eq!(world.container_slots(SUPPLY).await.unwrap().len(), 3);
    assert_eq!(session.placement().placed(), 0);
}

#[tokio::test(start_paused = true)]
async fn placement_with_partial_sites_reports_partial() {
    let world = world(2, 3).build();
    let mut session = session(&world, Arc::new(InMemoryStore::new()));

    let report = session.place_containers().await;
    assert_eq!(report.status, Status::Partial);
    assert_eq!(report.message, "Placed 2 shulkers.");
    assert_eq!(session.placement().withdrawn(), 3);
    assert_eq!(session.placement().placed(), 2);
    assert_eq!(world.container_slots(SUPPLY).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rescanning_does_not_grow_the_index() {
    let registry = Registry::standard();
    let apples = registry.packaged_full_of("shulker_box", "golden_apple", 1).unwrap();
    let pearls = registry.packaged_full_of("shulker_box", "ender_pearl", 1).unwrap();
    let arrows = registry.packaged_full_of("shulker_box", "arrow", 1).unwrap();
    let world = SimWorld::builder()
        .actor_at(Position::new(0, 64, 0))
        .double_chest(Position::new(10, 64, 10), Facing::North, vec![apples])
        .double_chest(Position::new(10, 64, 14), Facing::North, vec![pearls])
        .double_chest(Position::new(10, 64, 18), Facing::North, vec![])
        .chest(Position::new(14, 64, 10), vec![arrows])
        .build();

    // One pair was indexed earlier under its other half
    let mut seeded = LocationIndex::new();
    seeded.record(Position::new(11, 64, 10), [ItemId(10)]);
    let store = Arc::new(InMemoryStore::with_index(seeded));
    let mut session = session(&world, store.clone());

    let first = session.scan().await;
    assert_eq!(first.status, Status::Success);
    assert_eq!(
        first.message,
        "Finished scanning all 3 double chests in a 64 block radius."
    );
    let after_first = store.load().await.unwrap();
    assert_eq!(after_first.len(), 2);
    assert!(after_first.contains(&Position::new(11, 64, 10)));
    assert!(!after_first.contains(&Position::new(10, 64, 10)));
    assert_eq!(after_first.find(ItemId(11)), Some(Position::new(10, 64, 14)));
    assert_eq!(after_first.find(ItemId(13)), None, "single chests are skipped");

    session.scan().await;
    assert_eq!(store.load().await.unwrap(), after_first);
}

#[tokio::test(start_paused = true)]
async fn scan_skips_unreachable_containers() {
    let registry = Registry::standard();
    let apples = registry.packaged_full_of("shulker_box", "golden_apple", 1).unwrap();
    let pearls = registry.packaged_full_of("shulker_box", "ender_pearl", 1).unwrap();
    let world = SimWorld::builder()
        .actor_at(Position::new(0, 64, 0))
        .double_chest(Position::new(10, 64, 10), Facing::North, vec![apples])
        .double_chest(Position::new(10, 64, 14), Facing::North, vec![pearls])
        .build();
    world.fail_moves(Position::new(10, 64, 10), u32::MAX).await;

    let store = Arc::new(InMemoryStore::new());
    let report = session(&world, store.clone()).scan().await;

    assert_eq!(report.status, Status::Partial);
    match report.payload {
        StagePayload::Scan { indexed, failed, .. } => {
            assert_eq!(indexed, 1);
            assert_eq!(failed, vec![Position::new(10, 64, 10)]);
        }
        other => panic!("unexpected payload {other:?}"),
    }
    assert_eq!(store.load().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn scan_without_containers_fails() {
    let world = SimWorld::builder().actor_at(Position::new(0, 64, 0)).build();
    let store = Arc::new(InMemoryStore::new());
    let report = session(&world, store.clone()).scan().await;

    assert!(report.is_failure());
    assert_eq!(report.message, "No chests found within 64 blocks.");
    assert_eq!(store.save_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn scanned_index_survives_a_file_round_trip() {
    let registry = Registry::standard();
    let apples = registry.packaged_full_of("shulker_box", "golden_apple", 1).unwrap();
    let world = SimWorld::builder()
        .actor_at(Position::new(0, 64, 0))
        .double_chest(Position::new(10, 64, 10), Facing::North, vec![apples])
        .build();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("itemDictionary.json");
    let store = Arc::new(FileStore::new(&path));
    session(&world, store.clone()).scan().await;

    let saved = store.load().await.unwrap();
    let reloaded = FileStore::new(&path).load().await.unwrap();
    assert_eq!(saved, reloaded);
    assert_eq!(reloaded.get(&Position::new(10, 64, 10)), Some(&[ItemId(10)][..]));
}

#[tokio::test(start_paused = true)]
async fn acquire_miss_has_no_side_effects() {
    let world = world(3, 3).build();
    let mut session = session(&world, Arc::new(InMemoryStore::with_index(apple_index())));
    session.place_containers().await;
    let placement_before = session.placement().clone();
    world.clear_actions().await;

    let report = session.acquire("ender_pearl").await;

    assert!(report.is_failure());
    assert!(report.message.contains("ender_pearl"));
    assert_eq!(session.placement(), &placement_before);
    assert!(session.working_source().is_none());
    assert!(world.actions().await.is_empty());
}

/// A double chest at `STORAGE` holding a golden apple shulker followed by
/// `second`.
fn two_shulker_world(second: &str) -> SimWorld {
    let registry = Registry::standard();
    let apples = registry.packaged_full_of("shulker_box", "golden_apple", 27).unwrap();
    let pearls = registry.packaged_full_of(second, "ender_pearl", 27).unwrap();
    world(0, 0)
        .double_chest(STORAGE, Facing::North, vec![apples, pearls])
        .build()
}

#[tokio::test(start_paused = true)]
async fn scan_indexes_only_withdrawable_shulkers() {
    let world = two_shulker_world("shulker_box");
    let store = Arc::new(InMemoryStore::new());
    let mut session = session(&world, store.clone());

    session.scan().await;

    let index = store.load().await.unwrap();
    assert_eq!(index.get(&STORAGE), Some(&[ItemId(10)][..]));
    assert_eq!(index.find(ItemId(11)), None);

    let report = session.acquire("ender_pearl").await;
    assert!(report.is_failure());
    assert!(session.working_source().is_none());
}

#[tokio::test(start_paused = true)]
async fn acquire_refuses_a_shadowed_shulker() {
    let world = two_shulker_world("shulker_box");
    let mut index = LocationIndex::new();
    index.record(STORAGE, [ItemId(10), ItemId(11)]);
    let mut session = session(&world, Arc::new(InMemoryStore::with_index(index)));

    let report = session.acquire("ender_pearl").await;

    assert!(report.is_failure());
    assert_eq!(
        report.message,
        format!("ender_pearl at {STORAGE} is behind another container of the same type")
    );
    assert!(session.working_source().is_none());
    assert!(
        !world
            .actions()
            .await
            .iter()
            .any(|a| matches!(a, SimAction::Withdraw { .. } | SimAction::Place(_)))
    );
}

#[tokio::test(start_paused = true)]
async fn acquire_takes_the_shulker_holding_the_item() {
    let world = two_shulker_world("red_shulker_box");
    let store = Arc::new(InMemoryStore::new());
    let mut session = session(&world, store.clone());
    session.scan().await;
    assert_eq!(store.load().await.unwrap().find(ItemId(11)), Some(STORAGE));

    let report = session.acquire("ender_pearl").await;

    assert_eq!(report.status, Status::Success, "{}", report.message);
    match report.payload {
        StagePayload::Acquire { first_content, .. } => {
            assert_eq!(first_content.as_deref(), Some("ender_pearl"));
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn acquire_checks_stock_before_withdrawing() {
    let world = world(3, 3).build();
    let mut session = session(&world, Arc::new(InMemoryStore::with_index(apple_index())));

    let report = session.acquire_count("golden_apple", 27 * 64 + 1).await;

    assert!(report.is_failure());
    assert!(report.message.starts_with("Not enough golden_apple"));
    assert!(session.working_source().is_none());
    assert!(
        !world
            .actions()
            .await
            .iter()
            .any(|a| matches!(a, SimAction::Withdraw { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn acquire_places_working_source() {
    let world = world(3, 3).build();
    let mut session = session(&world, Arc::new(InMemoryStore::with_index(apple_index())));

    let report = session.acquire("golden_apple").await;

    assert_eq!(report.status, Status::Success);
    let source = session.working_source().unwrap();
    assert_eq!(
        report.message,
        format!("Successfully placed Shulker box containing golden_apple at {source}")
    );
    assert_eq!(world.container_count(source, "golden_apple").await, 27 * 64);
    // One of the two packaged containers left storage
    assert_eq!(world.container_slots(STORAGE).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn fill_skips_a_container_that_times_out() {
    let world = world(3, 3).build();
    let mut session = session(&world, Arc::new(InMemoryStore::with_index(apple_index())));
    session.place_containers().await;
    session.acquire("golden_apple").await;
    let positions = session.placement().positions().to_vec();
    assert_eq!(positions.len(), 3);
    world.hang_opens(positions[1]).await;

    let report = session.fill().await;

    assert_eq!(report.status, Status::Partial);
    assert!(!report.is_failure());
    match report.payload {
        StagePayload::Fill {
            filled,
            failed,
            per_container,
            ..
        } => {
            assert_eq!(filled, 2);
            assert_eq!(failed, vec![positions[1]]);
            assert_eq!(per_container, 64);
        }
        other => panic!("unexpected payload {other:?}"),
    }
    assert_eq!(
        report.message,
        "Filled 2 shulkers with 64 items each. Failed to fill 1 shulkers."
    );
    // The timed-out open was attempted exactly once
    let opens = world
        .actions()
        .await
        .iter()
        .filter(|a| **a == SimAction::Open(positions[1]))
        .count();
    assert_eq!(opens, 1);
}

#[tokio::test(start_paused = true)]
async fn fill_without_working_source_fails() {
    let world = world(3, 3).build();
    let mut session = session(&world, Arc::new(InMemoryStore::new()));
    let report = session.fill().await;
    assert!(report.is_failure());
}

#[tokio::test(start_paused = true)]
async fn dispose_break_failure_is_fatal() {
    let world = world(3, 3).build();
    let mut session = session(&world, Arc::new(InMemoryStore::with_index(apple_index())));
    session.acquire("golden_apple").await;
    let source = session.working_source().unwrap();
    world.fail_breaks(source, 1).await;

    let report = session.dispose_working_source().await;

    assert!(report.is_failure());
    assert_eq!(session.working_source(), Some(source));
    assert!(world.container_slots(DISCARD).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn finalize_waits_for_slow_pickups() {
    let world = world(2, 2).build();
    let mut session = session(&world, Arc::new(InMemoryStore::new()));
    session.place_containers().await;
    world.delay_pickups(3).await;

    let report = session.finalize().await;

    assert_eq!(report.status, Status::Success);
    assert_eq!(report.message, "Broke 2 shulkers");
    assert_eq!(world.container_slots(DESTINATION).await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn finalize_gives_up_when_drops_never_arrive() {
    let world = world(2, 2).build();
    let mut session = session(&world, Arc::new(InMemoryStore::new()));
    session.place_containers().await;
    world.delay_pickups(10_000).await;

    let report = session.finalize().await;

    assert_eq!(report.status, Status::Partial);
    match report.payload {
        StagePayload::Finalize {
            broken,
            deposited,
            outstanding,
        } => {
            assert_eq!(broken, 2);
            assert_eq!(deposited, 0);
            assert_eq!(outstanding, 2);
        }
        other => panic!("unexpected payload {other:?}"),
    }
    assert_eq!(session.placement().broken(), 0, "placement set is consumed");
}

#[tokio::test(start_paused = true)]
async fn item_failures_do_not_stop_the_sequence() {
    let world = world(2, 2).build();
    let mut session = session(&world, Arc::new(InMemoryStore::with_index(apple_index())))
        .with_kit(ReferenceKit::parse_list("ender_pearl,golden_apple"));

    let report = session.run_sequence().await;

    assert_eq!(report.state, SequenceState::Done);
    assert_eq!(report.status, Status::Partial);
    assert_eq!(report.items.len(), 2);
    assert_eq!(report.items[0].status, Status::Failure);
    assert_eq!(report.items[0].stage, Stage::Acquire);
    assert_eq!(report.items[1].status, Status::Success);
    assert_eq!(report.succeeded_items(), 1);
    assert_eq!(report.message, "Broke 2 shulkers");
    assert!(serde_json::to_string(&report).unwrap().contains("ender_pearl"));
}

#[tokio::test(start_paused = true)]
async fn first_run_scans_an_empty_index() {
    let world = world(2, 2).build();
    let store = Arc::new(InMemoryStore::new());
    let mut session = session(&world, store.clone())
        .with_kit(ReferenceKit::parse_list("golden_apple"));

    let report = session.run_sequence().await;

    assert!(report.scan.is_some());
    assert_eq!(report.items[0].status, Status::Success);
    assert!(store.load().await.unwrap().contains(&STORAGE));
    assert!(!session.is_first_run());

    // Later runs in the same session never rescan
    let again = session.run_sequence().await;
    assert!(again.scan.is_none());
}
