// tests/orchestrator_properties.rs

mod common;

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use plugin_sdk::build::OutputFile;
use plugin_sdk::config::{ProjectConfig, ServerConfig};
use plugin_sdk::dag::TaskSpec;
use plugin_sdk::engine::{BuildContext, BuildOptions, Orchestrator};
use plugin_sdk::errors::SdkError;
use plugin_sdk::exec::from_fn;
use plugin_sdk::fs::mock::MockFileSystem;

type Log = Arc<Mutex<Vec<String>>>;

fn ctx() -> BuildContext {
    BuildContext::new(
        Arc::new(MockFileSystem::new()),
        "/p",
        ServerConfig::default(),
        ProjectConfig::default(),
        BuildOptions::with_bundled_minimum().unwrap(),
    )
}

fn task(name: &str, deps: &[String], log: &Log) -> TaskSpec {
    let log = Arc::clone(log);
    let label = name.to_string();
    TaskSpec::new(name)
        .after(deps.iter().cloned())
        .body(from_fn(move |_ctx, _change| {
            log.lock().unwrap().push(label.clone());
            Ok(Vec::<OutputFile>::new())
        }))
}

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(f)
}

// Strategy for an acyclic graph: task N may only depend on tasks 0..N-1.
fn acyclic_deps(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<String>>> {
    (1..=max_tasks).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..n), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let deps: BTreeSet<usize> =
                            picks.into_iter().filter(|_| i > 0).map(|p| p % i.max(1)).collect();
                        deps.into_iter().map(|d| format!("task_{d}")).collect()
                    })
                    .collect()
            },
        )
    })
}

/// Every task reachable from `target`, itself included.
fn reachable(deps: &[Vec<String>], target: usize) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut stack = vec![format!("task_{target}")];
    while let Some(name) = stack.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let idx: usize = name["task_".len()..].parse().unwrap();
        stack.extend(deps[idx].iter().cloned());
    }
    seen
}

proptest! {
    #[test]
    fn acyclic_graphs_run_each_prerequisite_once_and_in_order(
        deps in acyclic_deps(10),
        target_pick in any::<usize>(),
    ) {
        let log: Log = Arc::default();
        let mut orch = Orchestrator::new();
        for (i, d) in deps.iter().enumerate() {
            orch.declare(task(&format!("task_{i}"), d, &log)).unwrap();
        }
        orch.validate().unwrap();

        let target = target_pick % deps.len();
        let ctx = ctx();
        block_on(orch.run(&ctx, &format!("task_{target}"))).unwrap();
        // A second request for the same task is memoized.
        block_on(orch.run(&ctx, &format!("task_{target}"))).unwrap();

        let ran = log.lock().unwrap().clone();
        let unique: HashSet<String> = ran.iter().cloned().collect();
        prop_assert_eq!(unique.len(), ran.len(), "a task ran twice: {:?}", ran);
        prop_assert_eq!(unique, reachable(&deps, target));

        for (pos, name) in ran.iter().enumerate() {
            let idx: usize = name["task_".len()..].parse().unwrap();
            for dep in &deps[idx] {
                let dep_pos = ran.iter().position(|n| n == dep);
                prop_assert!(dep_pos.is_some_and(|p| p < pos), "{} ran before {}", name, dep);
            }
        }
    }

    #[test]
    fn reachable_cycles_fail_before_any_body(len in 2usize..6, extra in 0usize..4) {
        let log: Log = Arc::default();
        let mut orch = Orchestrator::new();
        // ring_0 -> ring_1 -> ... -> ring_{len-1} -> ring_0, entered from a chain.
        // Every ring task names its prerequisite before that one is declared.
        for i in 0..len {
            let next = vec![format!("ring_{}", (i + 1) % len)];
            orch.declare(task(&format!("ring_{i}"), &next, &log)).unwrap();
        }
        for i in 0..extra {
            let dep = if i == 0 { "ring_0".to_string() } else { format!("entry_{}", i - 1) };
            orch.declare(task(&format!("entry_{i}"), &[dep], &log)).unwrap();
        }
        let target = if extra == 0 { "ring_0".to_string() } else { format!("entry_{}", extra - 1) };

        let result = block_on(orch.run(&ctx(), &target));

        let ring: Vec<String> = (0..=len).map(|i| format!("ring_{}", i % len)).collect();
        match result {
            Err(SdkError::TaskCycle(path)) => {
                prop_assert_eq!(path, ring.join(" -> "));
            }
            other => {
                prop_assert!(false, "expected a task cycle, got {:?}", other.map(|_| ()));
            }
        }
        prop_assert!(log.lock().unwrap().is_empty());
    }
}
