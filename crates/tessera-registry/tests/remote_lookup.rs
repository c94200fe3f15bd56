//! Cross-rank registry scenarios.

use std::sync::Arc;
use std::time::Duration;

use tessera_core::{from_bytes, Rank};
use tessera_registry::{
    DistributedRegistry, HandleKind, InvokeError, RegistryConfig, RegistryError, RemoteObject,
};
use tessera_test_utils::{run_world_with_fabric, FailingObject, MockObject};

fn config() -> RegistryConfig {
    RegistryConfig {
        request_timeout: Duration::from_secs(10),
        ..RegistryConfig::default()
    }
}

#[test]
fn lookup_from_another_rank_reaches_the_owner() {
    let out = run_world_with_fabric(2, |mut comm, fabric| {
        let mut reg = DistributedRegistry::connect(&mut comm, fabric, config()).unwrap();
        let hive = MockObject::new("hive-3 on rank 0");
        if comm.rank() == Rank(0) {
            assert!(reg.register("hive-3", hive.clone()).unwrap());
        }
        comm.barrier().unwrap();

        let label = if comm.rank() == Rank(1) {
            let handle = reg.lookup("hive-3").unwrap();
            assert!(matches!(handle.kind(), HandleKind::Remote { .. }));
            let label: String = handle.call("label", &()).unwrap();
            Some(label)
        } else {
            None
        };
        comm.barrier().unwrap();
        (label, hive.calls().len())
    });
    assert_eq!(out[1].0.as_deref(), Some("hive-3 on rank 0"));
    // The call ran on rank 0's object.
    assert_eq!(out[0].1, 1);
    assert_eq!(out[1].1, 0);
}

#[test]
fn names_are_unique_across_ranks() {
    let out = run_world_with_fabric(3, |mut comm, fabric| {
        let mut reg = DistributedRegistry::connect(&mut comm, fabric, config()).unwrap();
        // Ranks claim in turn so the winner is deterministic.
        let mut claimed = false;
        for turn in 0..comm.size() {
            if comm.rank().index() == turn {
                claimed = reg.register("hive", MockObject::new(format!("r{turn}"))).unwrap();
            }
            comm.barrier().unwrap();
        }
        let label: String = reg.lookup("hive").unwrap().call("label", &()).unwrap();
        comm.barrier().unwrap();
        (claimed, label)
    });
    assert_eq!(
        out,
        vec![
            (true, "r0".to_string()),
            (false, "r0".to_string()),
            (false, "r0".to_string())
        ]
    );
}

#[test]
fn migrated_object_moves_to_a_new_owner() {
    let out = run_world_with_fabric(2, |mut comm, fabric| {
        let mut reg = DistributedRegistry::connect(&mut comm, fabric, config()).unwrap();
        let me = comm.rank();
        let agent: Arc<dyn RemoteObject> = MockObject::new(format!("agent@{me}"));

        // Step 1: rank 0 owns the agent.
        if me == Rank(0) {
            reg.register("agent-7", Arc::clone(&agent)).unwrap();
        }
        comm.barrier().unwrap();

        // Step 2: it migrates; rank 0 releases the name, rank 1 claims it.
        if me == Rank(0) {
            assert!(reg.add_migrated_name(&agent));
            assert_eq!(reg.migrated_names(), ["agent-7"]);
            assert!(reg.unregister("agent-7").unwrap());
        }
        comm.barrier().unwrap();
        if me == Rank(1) {
            assert!(reg.register("agent-7", Arc::clone(&agent)).unwrap());
        }
        comm.barrier().unwrap();

        let handle = reg.lookup("agent-7").unwrap();
        let label: String = handle.call("label", &()).unwrap();
        reg.clear_migrated_names();
        comm.barrier().unwrap();
        (handle.is_local(), label, reg.migrated_names().len())
    });
    assert_eq!(out[0], (false, "agent@1".to_string(), 0));
    assert_eq!(out[1], (true, "agent@1".to_string(), 0));
}

#[test]
fn stale_remote_handle_reports_withdrawal() {
    let out = run_world_with_fabric(2, |mut comm, fabric| {
        let mut reg = DistributedRegistry::connect(&mut comm, fabric, config()).unwrap();
        if comm.rank() == Rank(0) {
            reg.register("short-lived", MockObject::new("x")).unwrap();
        }
        comm.barrier().unwrap();
        let handle = (comm.rank() == Rank(1)).then(|| reg.lookup("short-lived").unwrap());
        comm.barrier().unwrap();
        if comm.rank() == Rank(0) {
            reg.unregister("short-lived").unwrap();
        }
        comm.barrier().unwrap();
        let result = handle.map(|h| h.invoke("echo", &[1, 2]));
        let after = reg.lookup("short-lived").err();
        comm.barrier().unwrap();
        (result, after)
    });
    assert!(matches!(
        &out[1].0,
        Some(Err(RegistryError::Invocation {
            source: InvokeError::Withdrawn,
            ..
        }))
    ));
    for (_, after) in &out {
        assert!(matches!(after, Some(RegistryError::NotFound { .. })));
    }
}

#[test]
fn object_failures_come_back_to_the_caller() {
    let out = run_world_with_fabric(2, |mut comm, fabric| {
        let mut reg = DistributedRegistry::connect(&mut comm, fabric, config()).unwrap();
        if comm.rank() == Rank(1) {
            reg.register("flaky", FailingObject::new(1)).unwrap();
        }
        comm.barrier().unwrap();
        let results = if comm.rank() == Rank(0) {
            let h = reg.lookup("flaky").unwrap();
            vec![h.invoke("any", &[9]), h.invoke("any", &[9])]
        } else {
            Vec::new()
        };
        comm.barrier().unwrap();
        results
    });
    assert_eq!(out[0][0], Ok(vec![9]));
    assert!(matches!(
        out[0][1],
        Err(RegistryError::Invocation {
            source: InvokeError::Failed { .. },
            ..
        })
    ));
}

#[test]
fn host_can_be_any_rank() {
    let out = run_world_with_fabric(3, |mut comm, fabric| {
        let cfg = RegistryConfig {
            host_rank: Rank(2),
            ..config()
        };
        let mut reg = DistributedRegistry::connect(&mut comm, fabric, cfg).unwrap();
        if comm.rank() == Rank(0) {
            reg.register("n", MockObject::new("zero")).unwrap();
        }
        comm.barrier().unwrap();
        let bytes = reg.lookup("n").unwrap().invoke("calls", &[]).unwrap();
        let count: u64 = from_bytes(&bytes).unwrap();
        comm.barrier().unwrap();
        (reg.is_host(), count)
    });
    assert_eq!(out.iter().filter(|(host, _)| *host).count(), 1);
    assert!(out[2].0);
    let mut counts: Vec<u64> = out.iter().map(|(_, c)| *c).collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 2, 3]);
}

#[test]
fn invalid_host_is_rejected_before_communicating() {
    let out = run_world_with_fabric(2, |mut comm, fabric| {
        let cfg = RegistryConfig {
            host_rank: Rank(7),
            ..config()
        };
        DistributedRegistry::connect(&mut comm, fabric, cfg).err()
    });
    for err in out {
        assert!(matches!(err, Some(RegistryError::Config(_))));
    }
}
