//! Integration tests for taskchain
//!
//! These drive the runner, chains and built-in tasks together against the
//! simulated world, plus the `tc` binary end to end.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use proptest::prelude::*;
use tempfile::TempDir;

use taskchain::sim::{SimRig, SimWorld};
use taskchain::{
    Agent, Behavior, CellPos, CellSearchTask, ChainId, Dispatcher, DispatcherConfig, GetToCellTask, HazardChain,
    ManualClock, MessagePriority, Runner, SearchSpace, TaskChain, TaskState, Terrain, TerrainSearch, UserTaskChain,
    WorldSensor,
};

// =============================================================================
// Helpers
// =============================================================================

struct Harness {
    agent: Agent,
    rig: SimRig,
    runner: Runner,
    user: ChainId,
    hazard: ChainId,
}

impl Harness {
    fn new(world: SimWorld) -> Self {
        let clock = Arc::new(ManualClock::new());
        let (mut agent, rig) = SimRig::agent(
            Arc::new(world),
            CellPos::new(0, 0),
            4.0,
            Behavior::default(),
            DispatcherConfig::default(),
            clock.clone(),
        );
        let mut runner = Runner::new();
        let user = runner.register_chain(Box::new(UserTaskChain::new(clock)));
        let hazard = runner.register_chain(Box::new(HazardChain::new()));
        runner.enable(&mut agent);
        Self {
            agent,
            rig,
            runner,
            user,
            hazard,
        }
    }

    fn user(&self) -> &UserTaskChain {
        self.runner.chain_as::<UserTaskChain>(self.user).expect("user chain")
    }

    fn run_task(&mut self, task: impl taskchain::Task) -> bool {
        self.runner
            .chain_as_mut::<UserTaskChain>(self.user)
            .expect("user chain")
            .run_task(&mut self.agent, task)
    }

    /// One frame: runner, then movement, then outbound messages
    fn step(&mut self) {
        self.runner.tick(&mut self.agent);
        self.rig.driver.step();
        let _ = self.agent.messages.tick();
    }

    fn searched(&self) -> Option<HashSet<CellPos>> {
        self.user()
            .current_task()
            .and_then(|node| node.downcast_ref::<CellSearchTask<TerrainSearch>>())
            .map(|search| search.searched())
    }
}

/// Ocean everywhere except a square of forest centred on the origin
fn forest_island(half: i32) -> SimWorld {
    let world = SimWorld::uniform(Terrain::Ocean);
    for x in -half..=half {
        for z in -half..=half {
            world.set_terrain(CellPos::new(x, z), Terrain::Forest);
        }
    }
    world
}

// =============================================================================
// Search Tests
// =============================================================================

#[test]
fn test_search_walks_whole_island_and_reports() {
    let mut h = Harness::new(forest_island(1));
    assert!(h.run_task(CellSearchTask::new(
        CellPos::new(0, 0),
        TerrainSearch::new(Terrain::Forest)
    )));

    let mut last_searched = HashSet::new();
    for _ in 0..2000 {
        let center = h.agent.current_cell();
        h.rig.world.load_around(center, 1);
        h.step();
        if let Some(searched) = h.searched() {
            last_searched = searched;
        }
        if !h.user().is_active() {
            break;
        }
    }

    assert!(!h.user().is_active(), "search should have finished");
    // 9 forest cells plus the 12 ocean cells bordering them
    assert_eq!(last_searched.len(), 21);
    assert!(last_searched.contains(&CellPos::new(2, 0)));
    assert!(!last_searched.contains(&CellPos::new(2, 2)));

    let history = h.user().history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].state, TaskState::Finished);
    assert!(history[0].description.contains("Searching forest from [0, 0]"));

    let sent = h.rig.transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("User task FINISHED: Searching forest"));
    assert_eq!(h.rig.world.listener_count(), 0);
}

/// Forest search that counts how often each cell is expanded
#[derive(Debug, Clone, Default)]
struct CountingForest {
    counts: Arc<Mutex<HashMap<CellPos, usize>>>,
}

impl PartialEq for CountingForest {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.counts, &other.counts)
    }
}

impl SearchSpace for CountingForest {
    fn contains(&self, world: &dyn WorldSensor, cell: CellPos) -> bool {
        *self.counts.lock().unwrap().entry(cell).or_default() += 1;
        world.cell_at(cell).is_some_and(|data| data.terrain == Terrain::Forest)
    }

    fn describe(&self) -> String {
        "counted forest".to_string()
    }
}

#[test]
fn test_concurrent_loads_search_each_cell_exactly_once() {
    let mut h = Harness::new(forest_island(2));
    let space = CountingForest::default();
    let counts = space.counts.clone();
    h.run_task(CellSearchTask::new(CellPos::new(0, 0), space));
    // First tick subscribes the listener while nothing is loaded
    h.step();
    assert_eq!(h.rig.world.listener_count(), 1);

    let world = h.rig.world.clone();
    let loader = thread::spawn(move || {
        for x in -3..=3 {
            for z in -3..=3 {
                world.load_cell(CellPos::new(x, z));
                thread::sleep(Duration::from_micros(200));
            }
        }
    });

    let mut last_searched = HashSet::new();
    for _ in 0..20_000 {
        h.step();
        if let Some(search) = h
            .user()
            .current_task()
            .and_then(|node| node.downcast_ref::<CellSearchTask<CountingForest>>())
        {
            last_searched = search.searched();
        }
        if !h.user().is_active() {
            break;
        }
        thread::sleep(Duration::from_micros(100));
    }
    loader.join().expect("loader thread panicked");

    assert!(!h.user().is_active(), "search should have finished");
    // 25 forest cells plus the 20 ocean cells bordering them
    assert_eq!(last_searched.len(), 45);
    assert!(last_searched.iter().all(|cell| cell.x.abs() <= 3 && cell.z.abs() <= 3));

    let counts = counts.lock().unwrap();
    let twice: Vec<_> = counts.iter().filter(|(_, n)| **n != 1).collect();
    assert!(twice.is_empty(), "cells expanded more than once: {:?}", twice);
    let counted: HashSet<CellPos> = counts.keys().copied().collect();
    assert_eq!(counted, last_searched);
    assert_eq!(h.rig.world.listener_count(), 0);
}

// =============================================================================
// Arbitration Tests
// =============================================================================

#[test]
fn test_hazard_preempts_user_goal_which_then_resumes() {
    let mut h = Harness::new(SimWorld::uniform(Terrain::Plains));
    h.rig.world.load_around(CellPos::new(0, 0), 8);
    let target = CellPos::new(5, 0);
    h.run_task(GetToCellTask::new(target));

    h.step();
    assert_eq!(h.runner.current_chain_id(), Some(h.user));

    let origin = CellPos::new(0, 0);
    h.rig.world.set_hazard(origin, true);
    let mut saw_hazard = false;
    for _ in 0..500 {
        h.step();
        if h.runner.current_chain_id() == Some(h.hazard) {
            saw_hazard = true;
            // The user goal is parked, not replaced
            let parked = h.user().current_task().expect("user task kept");
            assert_eq!(
                parked.downcast_ref::<GetToCellTask>().map(GetToCellTask::target),
                Some(target)
            );
        }
        if saw_hazard && h.agent.current_cell() != origin {
            h.rig.world.set_hazard(origin, false);
        }
        if !h.user().is_active() {
            break;
        }
    }

    assert!(saw_hazard, "hazard chain never took over");
    assert_eq!(h.agent.current_cell(), target);
    let history = h.user().history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].state, TaskState::Finished);
    assert!(!h.runner.chain(h.hazard).expect("hazard chain").is_active());
}

#[test]
fn test_hazard_ignored_when_avoidance_disabled() {
    let mut h = Harness::new(SimWorld::uniform(Terrain::Plains));
    h.rig.world.load_around(CellPos::new(0, 0), 2);
    h.rig.world.set_hazard(CellPos::new(0, 0), true);
    h.agent.settings.update(|b| b.hazard_avoidance = false);
    h.run_task(GetToCellTask::new(CellPos::new(3, 0)));

    for _ in 0..5 {
        h.step();
        assert_eq!(h.runner.current_chain_id(), Some(h.user));
    }
}

#[test]
fn test_disable_stops_everything() {
    let mut h = Harness::new(SimWorld::uniform(Terrain::Plains));
    h.run_task(GetToCellTask::new(CellPos::new(50, 0)));
    for _ in 0..3 {
        h.step();
    }
    assert!(h.agent.movement.is_active());
    assert!(!h.agent.behavior().pause_on_lost_focus);

    h.runner.disable(&mut h.agent);

    assert!(!h.runner.is_enabled());
    assert_eq!(h.runner.current_chain_id(), None);
    assert!(!h.user().is_active());
    assert!(!h.agent.movement.is_active());
    assert!(h.agent.behavior().pause_on_lost_focus);

    let status = h.runner.status();
    assert!(!status.enabled);
    assert!(status.chains.iter().all(|chain| !chain.active));
}

#[test]
fn test_rerequesting_same_search_keeps_progress() {
    let mut h = Harness::new(forest_island(3));
    let search = || CellSearchTask::new(CellPos::new(0, 0), TerrainSearch::new(Terrain::Forest));
    h.run_task(search());
    h.rig.world.load_around(CellPos::new(0, 0), 1);
    h.step();
    let before = h.searched().expect("search running");
    assert_eq!(before.len(), 9);

    assert!(!h.run_task(search()));
    h.step();
    let after = h.searched().expect("search running");
    assert!(after.is_superset(&before));
}

// =============================================================================
// Dispatcher Properties
// =============================================================================

fn unthrottled() -> DispatcherConfig {
    DispatcherConfig {
        fast_interval_ms: 0,
        medium_interval_ms: 0,
        slow_interval_ms: 0,
        ..Default::default()
    }
}

fn priority_from(n: u8) -> MessagePriority {
    match n % 4 {
        0 => MessagePriority::Low,
        1 => MessagePriority::Normal,
        2 => MessagePriority::High,
        _ => MessagePriority::Critical,
    }
}

proptest! {
    #[test]
    fn test_dispatch_order_is_priority_then_fifo(levels in prop::collection::vec(0u8..4, 1..40)) {
        let clock = Arc::new(ManualClock::new());
        let (mut agent, rig) = SimRig::agent(
            Arc::new(SimWorld::uniform(Terrain::Plains)),
            CellPos::new(0, 0),
            1.0,
            Behavior::default(),
            unthrottled(),
            clock,
        );

        let mut expected: Vec<(MessagePriority, usize)> = Vec::new();
        for (idx, level) in levels.iter().enumerate() {
            let priority = priority_from(*level);
            agent.messages.enqueue_chat(format!("m{}", idx), priority);
            expected.push((priority, idx));
        }
        expected.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        for _ in 0..levels.len() {
            prop_assert!(agent.messages.tick().unwrap().is_some());
        }
        prop_assert!(agent.messages.is_empty());

        let sent = rig.transport.sent();
        let want: Vec<String> = expected.iter().map(|(_, idx)| format!("m{}", idx)).collect();
        prop_assert_eq!(sent, want);
    }

    #[test]
    fn test_queue_bound_keeps_highest(levels in prop::collection::vec(0u8..4, 1..60), max_queue in 1usize..10) {
        let clock = Arc::new(ManualClock::new());
        let transport = taskchain::sim::SimTransport::new();
        let config = DispatcherConfig { max_queue, ..unthrottled() };
        let mut dispatcher = Dispatcher::new(config, Box::new(transport), clock);

        for level in &levels {
            dispatcher.enqueue_chat("x", priority_from(*level));
        }

        prop_assert!(dispatcher.len() <= max_queue);
        let stats = dispatcher.stats();
        prop_assert_eq!(stats.total_enqueued as usize, levels.len());
        prop_assert_eq!(stats.total_dropped as usize, levels.len().saturating_sub(max_queue));
    }
}

// =============================================================================
// Binary Tests
// =============================================================================

fn tc(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tc").expect("tc binary");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"));
    cmd
}

#[test]
fn test_cli_config_prints_defaults() {
    let home = TempDir::new().expect("Failed to create temp dir");
    tc(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("tick-rate-hz: 20"))
        .stdout(predicate::str::contains("search-terrain: forest"));
}

#[test]
fn test_cli_config_reads_local_file_as_json() {
    let home = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(home.path().join(".taskchain.yml"), "sim:\n  seed: 42\n").expect("write config");

    let output = tc(&home).args(["config", "-f", "json"]).output().expect("run tc");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(value["sim"]["seed"], 42);
    assert_eq!(value["dispatcher"]["fast-limit"], 6);
}

#[test]
fn test_cli_run_respects_tick_limit() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let config = home.path().join("fast.yml");
    std::fs::write(&config, "runner:\n  tick-rate-hz: 200\n").expect("write config");

    let output = tc(&home)
        .args(["-c"])
        .arg(&config)
        .args(["run", "--ticks", "5", "--seed", "3", "-f", "json"])
        .output()
        .expect("run tc");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(value["seed"], 3);
    assert!(value["ticks"].as_u64().expect("ticks") <= 5);
    assert_eq!(value["terrain"], "forest");
    assert_eq!(value["runner"]["enabled"], true);
}

#[test]
fn test_cli_rejects_unknown_terrain() {
    let home = TempDir::new().expect("Failed to create temp dir");
    tc(&home)
        .args(["run", "--terrain", "lava"])
        .assert()
        .failure();
}

#[test]
fn test_cli_missing_explicit_config_fails() {
    let home = TempDir::new().expect("Failed to create temp dir");
    tc(&home)
        .args(["-c", "nope.yml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_cli_rejects_invalid_sim_config() {
    let home = TempDir::new().expect("Failed to create temp dir");
    for (name, yaml) in [
        ("radius.yml", "sim:\n  world-radius: -1\n"),
        ("loader.yml", "sim:\n  loader-interval-ms: 0\n"),
    ] {
        let config = home.path().join(name);
        std::fs::write(&config, yaml).expect("write config");
        tc(&home)
            .arg("-c")
            .arg(&config)
            .args(["run", "--ticks", "5"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}
