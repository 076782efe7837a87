//! Property tests over randomly generated trees and seeds.

use std::collections::HashMap;

use dodag_sim::trickle::next_interval;
use dodag_sim::{
    run_simulation, DodagSimulation, MessageKind, NotifyPolicy, SimConfig, SimulationReport,
    Topology,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn run(config: SimConfig) -> SimulationReport {
    run_simulation(config).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_tree_has_requested_size(n in 1usize..60, seed: u64) {
        let topo = Topology::generate(n, seed).unwrap();
        prop_assert_eq!(topo.len(), n);
        prop_assert_eq!(topo.edges().count(), n - 1);
        prop_assert!(topo.node(topo.root()).unwrap().is_root());
    }

    #[test]
    fn every_non_root_sends_one_dao_to_its_parent(n in 1usize..40, seed: u64) {
        let report = run(SimConfig::seeded(n, seed));
        let topo = &report.topology;
        prop_assert_eq!(report.dao_count(), n - 1);

        for record in report.log.of_kind(MessageKind::Dao) {
            let sender = topo.node_by_name(&record.node).unwrap();
            let parent = topo.name_of(sender.parent.unwrap()).unwrap();
            prop_assert_eq!(
                &record.detail,
                &format!("{} sends DAO to {}", record.node, parent)
            );
            prop_assert_eq!(record.time.as_f64(), 1.0);
        }
    }

    #[test]
    fn one_dio_per_parent_by_default(n in 1usize..40, seed: u64) {
        let report = run(SimConfig::seeded(n, seed));
        let parents = report.topology.nodes().iter().filter(|v| !v.is_leaf()).count();
        prop_assert_eq!(report.dio_count(), parents);
    }

    #[test]
    fn all_children_policy_matches_edge_count(n in 1usize..40, seed: u64) {
        let config = SimConfig::seeded(n, seed).with_notify_policy(NotifyPolicy::AllChildren);
        let report = run(config);
        prop_assert_eq!(report.dio_count(), n - 1);
    }

    #[test]
    fn fixed_seed_replays_identically(n in 1usize..25, seed: u64) {
        let config = SimConfig::seeded(n, seed).with_continuous_trickle(4);
        let a = run(config.clone());
        let b = run(config);
        prop_assert_eq!(a.log.log_hash(), b.log.log_hash());
        prop_assert_eq!(a.log.records(), b.log.records());
    }

    #[test]
    fn log_is_time_ordered(n in 1usize..25, seed: u64) {
        let report = run(SimConfig::seeded(n, seed).with_continuous_trickle(5));
        let times: Vec<f64> = report.log.records().iter().map(|r| r.time.as_f64()).collect();
        prop_assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn zero_jitter_doubles_from_min(min in 0.1f64..10.0, rounds in 1u32..8) {
        let config = SimConfig::seeded(1, 0)
            .with_interval(min)
            .with_jitter(0.0)
            .with_continuous_trickle(rounds);
        let sim = DodagSimulation::with_topology(config, Topology::chain(1).unwrap()).unwrap();
        let report = sim.run().unwrap();

        let times: Vec<f64> = report.log.of_kind(MessageKind::Dis).map(|r| r.time.as_f64()).collect();
        prop_assert_eq!(times.len(), rounds as usize);
        // Probe k opens at min * (2^k - 1).
        for (k, t) in times.iter().enumerate() {
            let expected = min * ((1u64 << k) - 1) as f64;
            prop_assert!((t - expected).abs() < 1e-9 * expected.max(1.0));
        }
    }

    #[test]
    fn next_dis_waits_for_the_open_window(n in 1usize..15, seed: u64, rounds in 1u32..6) {
        let config = SimConfig::seeded(n, seed).with_continuous_trickle(rounds);
        let mut sim = DodagSimulation::new(config).unwrap();
        while sim.step().unwrap().is_some() {}

        let rt = sim.runtime();
        let mut opened: HashMap<&str, Vec<f64>> = HashMap::new();
        for record in rt.log().of_kind(MessageKind::Dis) {
            opened.entry(record.node.as_str()).or_default().push(record.time.as_f64());
        }

        for node in rt.nodes() {
            let times = &opened[node.name.as_str()];
            let windows = node.trickle().history();
            prop_assert_eq!(times.len(), rounds as usize);
            // The k-th probe opens window k; the next one starts when it closes.
            for (k, pair) in times.windows(2).enumerate() {
                prop_assert!(pair[1] - pair[0] >= windows[k]);
                prop_assert_eq!(pair[1], pair[0] + windows[k]);
            }
        }
        prop_assert_eq!(rt.suppressed_probes(), 0);
    }

    #[test]
    fn next_interval_respects_floor_and_bound(
        interval in 0.01f64..100.0,
        jitter in 0.0f64..0.99,
        min in 0.01f64..50.0,
        seed: u64,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let next = next_interval(interval, jitter, min, &mut rng);
        prop_assert!(next >= min);
        let hi = (2.0 * interval + jitter * interval).max(min);
        let lo = (2.0 * interval - jitter * interval).max(min);
        prop_assert!(next <= hi + 1e-9 && next >= lo - 1e-9);
    }
}

#[test]
fn seeded_jitter_matches_formula() {
    use rand::Rng;

    let seed = 31;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let j: f64 = rng.gen_range(-0.5..=0.5);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    assert_eq!(next_interval(1.0, 0.5, 1.0, &mut rng), (2.0 + j).max(1.0));
}
