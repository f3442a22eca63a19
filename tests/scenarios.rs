//! Scenario tests for searching, caching and invalidation.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use proptest::prelude::*;

use pathgraph_kernel::control::Pool;
use pathgraph_kernel::search::ResolvedFilter;
use pathgraph_kernel::{
    CacheLifespan, Collection, Control, ControlConfig, ManualClock, MonitorEvent, NetworkId,
    NetworkKind, NodeId, RecordingMonitor, SearchState, SearchStatus, SeekFilter, SeekRequest,
    SeekerId, SeekerState, TaggedEntity, Triangle,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// A(0,0,0) <-> B(5,0,0) <-> C(10,0,0), widths 3.
fn line() -> (Collection, NetworkId, [NodeId; 3]) {
    let mut collection = Collection::new();
    let net = collection.add_network("line", NetworkKind::Waypoint);
    collection.set_network_size(net, Vec3::splat(50.0)).unwrap();
    let a = collection.add_waypoint(net, "A", Vec3::ZERO, 1.0).unwrap();
    let b = collection.add_waypoint(net, "B", Vec3::new(5.0, 0.0, 0.0), 1.0).unwrap();
    let c = collection.add_waypoint(net, "C", Vec3::new(10.0, 0.0, 0.0), 1.0).unwrap();
    for (from, to) in [(a, b), (b, a), (b, c), (c, b)] {
        collection.connect(from, to, 3.0).unwrap();
    }
    (collection, net, [a, b, c])
}

fn control_with(config: ControlConfig, collection: Collection) -> (Control, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let mut control = Control::with_clock(config, clock.clone());
    control.load_graph(collection);
    control.init();
    (control, clock)
}

fn a_to_c() -> SeekRequest {
    SeekRequest::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)).with_clearance(1.0)
}

fn drive(control: &mut Control, id: SeekerId) -> SeekerState {
    let mut state = control.start_seeker(id).unwrap();
    for _ in 0..1_000 {
        if state != SeekerState::Seeking {
            break;
        }
        control.tick().unwrap();
        state = control.seeker(id).unwrap().state();
    }
    state
}

fn node(control: &Control, network: &str, name: &str) -> NodeId {
    let network = control.network_by_name(network).unwrap();
    control.collection().node_by_name(network, name).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Searching
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_line_path_and_cost() {
    let (collection, _, _) = line();
    let (mut control, _) = control_with(ControlConfig::default(), collection);

    let id = control.create_seeker(a_to_c());
    assert_eq!(drive(&mut control, id), SeekerState::Completed);

    let a = node(&control, "line", "A");
    let b = node(&control, "line", "B");
    let c = node(&control, "line", "C");
    let collection = control.collection();
    let expected = vec![
        collection.connection_between(a, b).unwrap(),
        collection.connection_between(b, c).unwrap(),
    ];
    let seeker = control.seeker(id).unwrap();
    assert_eq!(seeker.solution(), expected.as_slice());
    assert!((seeker.solution_cost(collection) - 10.0).abs() < 1e-5);
}

#[test]
fn test_disabled_connection_fails_search() {
    let (mut collection, _, [_, b, c]) = line();
    let bc = collection.connection_between(b, c).unwrap();
    collection.set_connection_enabled(bc, false).unwrap();
    let (mut control, _) = control_with(ControlConfig::default(), collection);

    let recorder = Arc::new(RecordingMonitor::new());
    let id = control.create_seeker(a_to_c());
    control.add_monitor(id, recorder.clone()).unwrap();

    assert_eq!(drive(&mut control, id), SeekerState::Failed);
    assert!(control.seeker(id).unwrap().solution().is_empty());
    assert_eq!(control.pool_of(id), Some(Pool::Idle));
    assert_eq!(recorder.events(), vec![MonitorEvent::Failed { seeker: id }]);
}

#[test]
fn test_narrow_connection_blocks_wide_agent() {
    let (collection, _, _) = line();
    let (mut control, _) = control_with(ControlConfig::default(), collection);
    let id = control.create_seeker(a_to_c().with_clearance(1.6));
    assert_eq!(drive(&mut control, id), SeekerState::Failed);
}

#[test]
fn test_start_equals_end_completes_synchronously() {
    let (collection, _, _) = line();
    let (mut control, _) = control_with(ControlConfig::default(), collection);
    let recorder = Arc::new(RecordingMonitor::new());
    let id = control.create_seeker(SeekRequest::new(Vec3::new(0.2, 0.0, 0.0), Vec3::ZERO));
    control.add_monitor(id, recorder.clone()).unwrap();

    assert_eq!(control.start_seeker(id).unwrap(), SeekerState::Completed);
    assert!(control.seeker(id).unwrap().solution().is_empty());
    assert_eq!(
        recorder.events(),
        vec![MonitorEvent::Completed {
            seeker: id,
            solution: Vec::new()
        }]
    );
}

#[test]
fn test_grid_node_contributes_its_connections() {
    let (mut collection, _, [_, b, _]) = line();

    let island = collection.add_network("island", NetworkKind::Waypoint);
    collection.set_network_position(island, Vec3::new(0.0, 0.0, 100.0)).unwrap();
    let d = collection.add_waypoint(island, "D", Vec3::ZERO, 1.0).unwrap();

    let grid = collection.add_network("bridge", NetworkKind::Grid);
    let g = collection.add_grid_node(grid, "G", Some(b)).unwrap();
    let gd = collection.connect(g, d, 3.0).unwrap().unwrap();
    assert_eq!(collection.grid_nodes_targeting(b), vec![g]);

    let (mut control, _) = control_with(ControlConfig::default(), collection);
    let request = SeekRequest::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 100.0)).with_clearance(1.0);
    let id = control.create_seeker(request);
    assert_eq!(drive(&mut control, id), SeekerState::Completed);

    let a = node(&control, "line", "A");
    let b = node(&control, "line", "B");
    let ab = control.collection().connection_between(a, b).unwrap();
    assert_eq!(control.seeker(id).unwrap().solution(), &[ab, gd]);
}

#[test]
fn test_navmesh_cells_searchable() {
    let vertices = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(4.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 3.0),
        Vec3::new(4.0, 0.0, 3.0),
    ];
    let mut collection = Collection::new();
    let (floor, report) = collection.build_navmesh("floor", &vertices, &[0, 1, 2, 1, 3, 2]).unwrap();
    assert!(report.is_clean());
    let first = collection.node_by_name(floor, "Cell 0").unwrap();
    let second = collection.node_by_name(floor, "Cell 1").unwrap();
    let edge = collection.connection_between(first, second).unwrap();

    let (mut control, _) = control_with(ControlConfig::default(), collection);
    let request = SeekRequest::new(Vec3::new(1.0, 0.0, 1.5), Vec3::new(2.0, 0.0, 2.25)).with_clearance(0.5);
    let id = control.create_seeker(request);
    assert_eq!(drive(&mut control, id), SeekerState::Completed);
    assert_eq!(control.seeker(id).unwrap().solution(), &[edge]);
}

#[test]
fn test_navmesh_overlapping_cells_not_connected() {
    let mut collection = Collection::new();
    let net = collection.add_network("dup", NetworkKind::Navmesh);
    let triangle = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Z);
    let a = collection.add_cell(net, "A", Vec3::ZERO, vec![triangle]).unwrap();
    let b = collection.add_cell(net, "B", Vec3::ZERO, vec![triangle]).unwrap();
    let report = collection.generate_connections(net).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].shared, 3);
    assert!(collection.connection_between(a, b).is_none());
    assert!(collection.connection_between(b, a).is_none());
}

#[test]
fn test_tag_filter_steers_search() {
    let (mut collection, net, [a, b, c]) = line();
    // Detour A -> D -> C around B.
    let d = collection.add_waypoint(net, "D", Vec3::new(5.0, 0.0, 6.0), 1.0).unwrap();
    let ad = collection.connect(a, d, 3.0).unwrap().unwrap();
    let dc = collection.connect(d, c, 3.0).unwrap().unwrap();
    collection.add_tag(TaggedEntity::Node(b), "mud").unwrap();

    let (mut control, _) = control_with(ControlConfig::default(), collection);
    let id = control.create_seeker(a_to_c().with_filter(SeekFilter::any().exclude("mud")));
    assert_eq!(drive(&mut control, id), SeekerState::Completed);
    assert_eq!(control.seeker(id).unwrap().solution(), &[ad, dc]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Caching
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_indefinite_cache_survives_ticks() {
    let (collection, _, _) = line();
    let config = ControlConfig {
        cache_lifespan: CacheLifespan::Indefinite,
        ..ControlConfig::default()
    };
    let (mut control, clock) = control_with(config, collection);

    let first = control.create_seeker(a_to_c());
    drive(&mut control, first);
    let original = control.seeker(first).unwrap().solution().to_vec();

    for _ in 0..50 {
        clock.advance_secs(60.0);
        control.tick().unwrap();
    }

    let second = control.create_seeker(a_to_c());
    assert_eq!(control.start_seeker(second).unwrap(), SeekerState::Completed);
    assert_eq!(control.seeker(second).unwrap().solution(), original.as_slice());
    assert_eq!(control.cache_stats().hits, 1);
}

#[test]
fn test_timed_cache_expires_after_lifespan() {
    let (collection, _, _) = line();
    let config = ControlConfig {
        cache_lifespan: CacheLifespan::Seconds(5.0),
        ..ControlConfig::default()
    };
    let (mut control, clock) = control_with(config, collection);

    let id = control.create_seeker(a_to_c());
    drive(&mut control, id);
    assert_eq!(control.pool_counts().cached, 1);

    clock.advance_secs(4.5);
    assert_eq!(control.tick().unwrap().expired, 0);
    assert_eq!(control.pool_counts().cached, 1);

    clock.advance_secs(1.0);
    assert_eq!(control.tick().unwrap().expired, 1);
    assert_eq!(control.pool_counts().cached, 0);
}

#[test]
fn test_cache_match_restarts_timer() {
    let (collection, _, _) = line();
    let config = ControlConfig {
        cache_lifespan: CacheLifespan::Seconds(5.0),
        ..ControlConfig::default()
    };
    let (mut control, clock) = control_with(config, collection);

    let first = control.create_seeker(a_to_c());
    drive(&mut control, first);

    clock.advance_secs(4.0);
    let second = control.create_seeker(a_to_c());
    assert_eq!(control.start_seeker(second).unwrap(), SeekerState::Completed);

    clock.advance_secs(4.0);
    control.tick().unwrap();
    assert_eq!(control.pool_counts().cached, 1);
}

#[test]
fn test_no_cache_default_stores_nothing() {
    let (collection, _, _) = line();
    let (mut control, _) = control_with(ControlConfig::default(), collection);
    let id = control.create_seeker(a_to_c());
    drive(&mut control, id);
    assert_eq!(control.pool_counts().cached, 0);
}

#[test]
fn test_cached_path_rejected_for_wider_agent() {
    let (mut collection, _, [a, b, _]) = line();
    let ab = collection.connection_between(a, b).unwrap();
    collection.set_connection_width(ab, 2.5).unwrap();
    let config = ControlConfig {
        cache_lifespan: CacheLifespan::Indefinite,
        ..ControlConfig::default()
    };
    let (mut control, _) = control_with(config, collection);

    let narrow = control.create_seeker(a_to_c());
    assert_eq!(drive(&mut control, narrow), SeekerState::Completed);

    let wide = control.create_seeker(a_to_c().with_clearance(1.4));
    assert_eq!(drive(&mut control, wide), SeekerState::Failed);
    assert_eq!(control.cache_stats().hits, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Invalidation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_invalidation_reaches_used_seekers_only() {
    let (collection, _, _) = line();
    let (mut control, _) = control_with(ControlConfig::default(), collection);

    let used = control.create_seeker(a_to_c());
    drive(&mut control, used);
    let idle = control.create_seeker(a_to_c());
    let active = control.create_seeker(a_to_c().with_frame_budget(Duration::ZERO));
    control.start_seeker(active).unwrap();

    let recorders: Vec<Arc<RecordingMonitor>> = [used, idle, active]
        .iter()
        .map(|id| {
            let recorder = Arc::new(RecordingMonitor::new());
            control.add_monitor(*id, recorder.clone()).unwrap();
            recorder
        })
        .collect();

    let b = node(&control, "line", "B");
    let c = node(&control, "line", "C");
    let bc = control.collection().connection_between(b, c).unwrap();
    control.set_connection_enabled(bc, false).unwrap();

    assert_eq!(recorders[0].events(), vec![MonitorEvent::Invalidated { seeker: used }]);
    assert!(recorders[1].is_empty());
    assert!(recorders[2].is_empty());
    assert_eq!(control.seeker(used).unwrap().state(), SeekerState::Invalidated);
    assert_eq!(control.pool_of(used), Some(Pool::Idle));
    assert_eq!(control.pool_of(active), Some(Pool::Active));
}

#[test]
fn test_unrelated_change_keeps_solution() {
    let (mut collection, net, _) = line();
    let spare = collection.add_waypoint(net, "spare", Vec3::new(0.0, 0.0, 8.0), 1.0).unwrap();
    let (mut control, _) = control_with(ControlConfig::default(), collection);

    let id = control.create_seeker(a_to_c());
    drive(&mut control, id);
    control.set_node_enabled(spare, false).unwrap();
    assert_eq!(control.seeker(id).unwrap().state(), SeekerState::Completed);
}

#[test]
fn test_edit_removal_invalidates() {
    let (collection, _, _) = line();
    let config = ControlConfig {
        cache_lifespan: CacheLifespan::Indefinite,
        ..ControlConfig::default()
    };
    let (mut control, _) = control_with(config, collection);
    let id = control.create_seeker(a_to_c());
    drive(&mut control, id);

    let b = node(&control, "line", "B");
    let removed = control.edit(|collection| collection.remove_node(b));
    assert!(removed);
    assert_eq!(control.seeker(id).unwrap().state(), SeekerState::Invalidated);
    assert_eq!(control.pool_counts().cached, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

fn point() -> impl Strategy<Value = Vec3> {
    (-50.0f32..50.0, -5.0f32..5.0, -50.0f32..50.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn scatter(points: &[Vec3]) -> (Collection, Vec<NodeId>) {
    let mut collection = Collection::new();
    let net = collection.add_network("scatter", NetworkKind::Waypoint);
    let nodes = points
        .iter()
        .enumerate()
        .map(|(i, p)| collection.add_waypoint(net, &format!("n{i}"), *p, 0.5).unwrap())
        .collect();
    (collection, nodes)
}

proptest! {
    #[test]
    fn prop_cost_is_scaled_distance(from in point(), to in point(), weight in 0.0f32..10.0) {
        let (mut collection, nodes) = scatter(&[from, to]);
        let id = collection.connect(nodes[0], nodes[1], 1.0).unwrap().unwrap();
        collection.set_connection_weight(id, weight).unwrap();

        let cost = collection.connection_cost(id).unwrap();
        let expected = from.distance(to) * weight;
        prop_assert!(cost >= 0.0);
        prop_assert!((cost - expected).abs() <= 1e-3 * expected.max(1.0));
    }

    #[test]
    fn prop_selections_have_non_decreasing_f(points in prop::collection::vec(point(), 3..10)) {
        let (mut collection, nodes) = scatter(&points);
        for &from in &nodes {
            for &to in &nodes {
                if from != to {
                    collection.connect(from, to, 2.0).unwrap();
                }
            }
        }

        let clock = ManualClock::new();
        let filter = ResolvedFilter::default();
        let end = nodes[nodes.len() - 1];
        let mut search = SearchState::new(&collection, nodes[0], end, 0.5, filter).unwrap();

        let mut last = f32::MIN;
        loop {
            // A zero budget performs exactly one selection per step.
            let status = search.step(&collection, &clock, Duration::ZERO);
            if let Some(f) = search.stats().last_f_score {
                prop_assert!(f + 1e-2 >= last, "f dropped from {} to {}", last, f);
                last = f;
            }
            if status != SearchStatus::Running {
                prop_assert!(matches!(status, SearchStatus::Completed(_)));
                break;
            }
        }
    }

    #[test]
    fn prop_disconnect_removes_only_outgoing(
        points in prop::collection::vec(point(), 2..8),
        edges in prop::collection::vec((0usize..8, 0usize..8), 0..30),
        pick in 0usize..8,
    ) {
        let (mut collection, nodes) = scatter(&points);
        for (from, to) in edges {
            let (from, to) = (nodes[from % nodes.len()], nodes[to % nodes.len()]);
            if from != to {
                collection.connect(from, to, 1.0).unwrap();
            }
        }
        let target = nodes[pick % nodes.len()];
        let outgoing = collection.outgoing(target).unwrap().to_vec();
        let survivors: Vec<_> = collection
            .connections()
            .filter(|(_, c)| c.from != target)
            .map(|(id, _)| id)
            .collect();

        let removed = collection.disconnect(target).unwrap();

        prop_assert_eq!(removed, outgoing.len());
        prop_assert!(collection.outgoing(target).unwrap().is_empty());
        for id in outgoing {
            prop_assert!(collection.connection(id).is_err());
        }
        for id in survivors {
            prop_assert!(collection.connection(id).is_ok());
        }
    }
}
