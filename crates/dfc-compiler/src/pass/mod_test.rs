use super::*;
use crate::test_utils::*;
use dfc_ir::test_utils::sample_circuit;
use dfc_ir::{CircuitNode, IrError};

struct Failing;

impl CircuitPass for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn description(&self) -> &'static str {
        "Always fails"
    }

    fn run(&self, _circuit: &Circuit) -> IrResult<Circuit> {
        Err(IrError::traversal("failing", "refused"))
    }
}

/// Reverses the node order, which leaves readers ahead of their inputs
struct Reversing;

impl CircuitPass for Reversing {
    fn name(&self) -> &'static str {
        "reversing"
    }

    fn description(&self) -> &'static str {
        "Reverses the node order"
    }

    fn run(&self, circuit: &Circuit) -> IrResult<Circuit> {
        let mut nodes: Vec<CircuitNode> = circuit.nodes().to_vec();
        nodes.reverse();
        Ok(Circuit::new(circuit.name(), nodes))
    }
}

fn manager(passes: Vec<Box<dyn CircuitPass>>, verify: bool) -> PassManager {
    PassManager {
        passes,
        verify,
        log_level: Level::Debug,
    }
}

#[test]
fn test_default_pass_order() {
    let manager = PassManager::with_defaults();
    assert_eq!(manager.pass_names(), vec!["dead_code", "constant_fold", "dedup"]);
    assert_eq!(manager.pass_names(), DEFAULT_PASSES.to_vec());
    assert!(manager
        .describe()
        .iter()
        .all(|(_, description)| !description.is_empty()));
}

#[test]
fn test_from_options_keeps_requested_order() {
    let options = CompilerOptions {
        passes: vec!["dedup".to_string(), "dead_code".to_string()],
        ..CompilerOptions::default()
    };
    let manager = PassManager::from_options(&options).unwrap();
    assert_eq!(manager.pass_names(), vec!["dedup", "dead_code"]);
}

#[test]
fn test_from_options_unknown_pass() {
    let options = CompilerOptions {
        passes: vec!["inline".to_string()],
        ..CompilerOptions::default()
    };
    match PassManager::from_options(&options) {
        Err(CompilerError::UnknownPass { name, available }) => {
            assert_eq!(name, "inline");
            assert_eq!(available, "dead_code, constant_fold, dedup");
        }
        Err(other) => panic!("expected UnknownPass, got {other:?}"),
        Ok(_) => panic!("expected UnknownPass"),
    }
}

#[test]
fn test_pass_by_name() {
    for name in DEFAULT_PASSES {
        assert_eq!(pass_by_name(name).unwrap().name(), *name);
    }
    assert!(pass_by_name("DEAD_CODE").is_none());
}

#[test]
fn test_run_defaults_over_dead_branch() {
    let circuit = circuit_with_dead_branch();
    let result = PassManager::with_defaults().run(&circuit).unwrap();
    let ids: Vec<u64> = result.operators().map(|op| op.id().0).collect();
    assert_eq!(ids, vec![0, 1, 3]);
    assert_eq!(result.name(), circuit.name());
    // The input is untouched
    assert_eq!(circuit.operators().count(), 4);
}

#[test]
fn test_empty_pipeline_returns_equal_circuit() {
    let circuit = sample_circuit();
    let result = manager(vec![], true).run(&circuit).unwrap();
    assert_eq!(result.to_string(), circuit.to_string());
}

#[test]
fn test_failing_pass_aborts() {
    let result = manager(
        vec![Box::new(dead_code::DeadCodeElimination), Box::new(Failing)],
        true,
    )
    .run(&sample_circuit());
    match result {
        Err(CompilerError::PassFailed { pass, source }) => {
            assert_eq!(pass, "failing");
            assert!(matches!(source, IrError::TraversalFailed { .. }));
        }
        other => panic!("expected PassFailed, got {other:?}"),
    }
}

#[test]
fn test_verification_catches_malformed_output() {
    let result = manager(vec![Box::new(Reversing)], true).run(&sample_circuit());
    assert!(matches!(
        result,
        Err(CompilerError::VerificationFailed { ref pass, .. }) if pass == "reversing"
    ));

    // Without verification the malformed circuit is returned as is
    let unchecked = manager(vec![Box::new(Reversing)], false)
        .run(&sample_circuit())
        .unwrap();
    assert!(unchecked.validate().is_err());
}

#[test]
fn test_malformed_input_rejected_before_any_pass() {
    let mut nodes = sample_circuit().nodes().to_vec();
    nodes.reverse();
    let malformed = Circuit::new("malformed", nodes);
    let result = PassManager::with_defaults().run(&malformed);
    assert!(matches!(result, Err(CompilerError::Ir(_))));
}
