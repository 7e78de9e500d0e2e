//! Ordering properties over randomly generated dependency graphs

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::CallbackLog;
use crate::context::{ContextError, ContextRegistry, ListenerId};

const NODES: usize = 40;
const EDGE_PROBABILITY: f64 = 0.12;

struct RandomGraph {
    registry: ContextRegistry,
    log: CallbackLog,
    names: Vec<String>,
    ids: Vec<ListenerId>,
    edges: Vec<(usize, usize)>,
}

/// Edges only ever point from a lower to a higher topological rank, so the
/// graph is acyclic. Registration order is shuffled independently of rank.
fn random_graph(seed: u64) -> RandomGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let log = CallbackLog::new();
    let mut registry = ContextRegistry::new();

    let names: Vec<String> = (0..NODES).map(|rank| format!("n{rank}")).collect();
    let mut order: Vec<usize> = (0..NODES).collect();
    order.shuffle(&mut rng);

    let mut ids = vec![ListenerId::default(); NODES];
    for rank in order {
        ids[rank] = registry.register(log.listener(names[rank].clone()));
    }

    let mut edges = Vec::new();
    for master in 0..NODES {
        for slave in master + 1..NODES {
            if rng.gen_bool(EDGE_PROBABILITY) {
                registry.add_dependency(ids[master], ids[slave]).unwrap();
                edges.push((master, slave));
            }
        }
    }

    RandomGraph {
        registry,
        log,
        names,
        ids,
        edges,
    }
}

fn assert_each_fired_once(graph: &RandomGraph, suffix: &str) {
    for name in &graph.names {
        assert_eq!(graph.log.count(&format!("{name}.{suffix}")), 1, "{name}.{suffix}");
    }
    assert_eq!(graph.log.len(), NODES);
}

#[test]
fn test_activation_respects_every_edge() {
    for seed in 0..16 {
        let mut graph = random_graph(seed);
        graph.registry.notify_active().unwrap();
        assert_each_fired_once(&graph, "on_activate");

        for &(master, slave) in &graph.edges {
            let slave_up = graph.log.position(&format!("{}.on_activate", graph.names[slave]));
            let master_up = graph.log.position(&format!("{}.on_activate", graph.names[master]));
            assert!(slave_up < master_up, "seed {seed}: edge {master} -> {slave}");
        }
    }
}

#[test]
fn test_deactivation_respects_every_edge() {
    for seed in 0..16 {
        let mut graph = random_graph(seed);
        graph.registry.notify_active().unwrap();
        graph.log.take();

        graph.registry.notify_inactive().unwrap();
        assert_each_fired_once(&graph, "on_deactivate");

        for &(master, slave) in &graph.edges {
            let master_down = graph.log.position(&format!("{}.on_deactivate", graph.names[master]));
            let slave_down = graph.log.position(&format!("{}.on_deactivate", graph.names[slave]));
            assert!(master_down < slave_down, "seed {seed}: edge {master} -> {slave}");
        }
    }
}

#[test]
fn test_repeated_cycles_stay_balanced() {
    let mut graph = random_graph(99);
    for _ in 0..5 {
        graph.registry.notify_active().unwrap();
        graph.registry.notify_active().unwrap();
        graph.registry.notify_inactive().unwrap();
    }

    let stats = graph.registry.stats();
    assert_eq!(stats.activations_fired, 5 * NODES as u64);
    assert_eq!(stats.deactivations_fired, 5 * NODES as u64);
    assert_eq!(stats.context_generation, 5);
}

#[test]
fn test_reversed_edges_are_rejected() {
    let mut graph = random_graph(7);
    let before = graph.registry.stats();

    for &(master, slave) in &graph.edges {
        let (new_master, new_slave) = (graph.ids[slave], graph.ids[master]);
        assert_eq!(
            graph.registry.add_dependency(new_master, new_slave),
            Err(ContextError::CycleDetected {
                master: new_master,
                slave: new_slave
            })
        );
    }
    assert_eq!(graph.registry.stats(), before);
}

#[test]
fn test_random_unregistration_keeps_edges_consistent() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut graph = random_graph(3);
    graph.registry.notify_active().unwrap();

    let mut victims = graph.ids.clone();
    victims.shuffle(&mut rng);
    victims.truncate(NODES / 2);
    for &victim in &victims {
        graph.registry.unregister(victim).unwrap();
    }

    let registry = &graph.registry;
    for id in registry.ids() {
        for &dep in registry.dependencies(id).unwrap() {
            assert!(!victims.contains(&dep));
            assert!(registry.dependers(dep).unwrap().contains(&id));
        }
        for &depender in registry.dependers(id).unwrap() {
            assert!(!victims.contains(&depender));
            assert!(registry.dependencies(depender).unwrap().contains(&id));
        }
        if registry.is_signaled(id).unwrap() {
            for &dep in registry.dependencies(id).unwrap() {
                assert!(registry.is_signaled(dep).unwrap());
            }
        }
    }
}
