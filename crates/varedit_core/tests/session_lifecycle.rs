use futures::executor::block_on;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use varedit_core::{
    CancelOutcome, ConfirmationSurface, Decision, DecisionResponder, DiscardPrompt, Scope,
    SessionRegistry, VariableDefinition, VariableDefinitionList, VariableEditWorkflow,
    WorkflowError, WorkflowState,
};

#[derive(Default)]
struct HoldingSurface {
    held: Mutex<Vec<DecisionResponder>>,
    dismissed: AtomicUsize,
}

impl ConfirmationSurface for HoldingSurface {
    fn present(&self, prompt: DiscardPrompt) {
        self.held.lock().unwrap().push(prompt.responder);
    }

    fn dismiss(&self) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }
}

fn vars(names: &[&str]) -> VariableDefinitionList {
    names
        .iter()
        .map(|name| VariableDefinition::text(*name, ""))
        .collect()
}

fn workflow_for(
    scope: Scope,
    registry: &SessionRegistry,
    surface: Arc<HoldingSurface>,
) -> VariableEditWorkflow {
    VariableEditWorkflow::builder()
        .scope(scope)
        .committed(vars(&["A"]))
        .registry(registry.clone())
        .confirmation_surface(surface)
        .build()
        .unwrap()
}

fn dashboard(name: &str) -> Scope {
    Scope::dashboard("perses", name).unwrap()
}

#[test]
fn one_session_per_scope_across_workflows() {
    let registry = SessionRegistry::new();
    let surface = Arc::new(HoldingSurface::default());
    let mut first = workflow_for(dashboard("cpu"), &registry, surface.clone());
    let mut second = workflow_for(dashboard("cpu"), &registry, surface.clone());
    let mut other = workflow_for(dashboard("memory"), &registry, surface);

    first.open().unwrap();
    let err = second.open().map(|_| ()).unwrap_err();
    assert_eq!(err, WorkflowError::SessionAlreadyOpen(dashboard("cpu")));
    assert_eq!(second.state(), WorkflowState::Closed);

    other.open().unwrap();
    assert_eq!(registry.active_count(), 2);

    assert!(matches!(first.begin_cancel().unwrap(), CancelOutcome::Closed));
    second.open().unwrap();
    assert!(registry.is_active(&dashboard("cpu")));
}

#[test]
fn teardown_while_awaiting_resolves_cancelled() {
    let registry = SessionRegistry::new();
    let surface = Arc::new(HoldingSurface::default());
    let mut workflow = workflow_for(dashboard("cpu"), &registry, surface.clone());
    workflow.open().unwrap();
    workflow.update(vars(&["A", "B"])).unwrap();

    let CancelOutcome::AwaitingDecision(mut pending) = workflow.begin_cancel().unwrap() else {
        panic!("dirty cancel should ask for confirmation");
    };
    assert_eq!(pending.try_decision(), None);

    assert!(workflow.teardown());
    assert_eq!(pending.try_decision(), Some(Decision::DiscardCancelled));
    assert_eq!(surface.dismissed.load(Ordering::SeqCst), 1);
    assert_eq!(workflow.state(), WorkflowState::Closed);
    assert_eq!(workflow.store().get(), &vars(&["A"]));
    assert!(!registry.is_active(&dashboard("cpu")));

    let late = surface.held.lock().unwrap().pop().unwrap();
    assert!(!late.confirm());
}

#[test]
fn dropping_workflow_releases_scope_and_pending_decision() {
    let registry = SessionRegistry::new();
    let surface = Arc::new(HoldingSurface::default());
    let mut workflow = workflow_for(dashboard("cpu"), &registry, surface.clone());
    workflow.open().unwrap();
    workflow.update(vars(&[])).unwrap();

    let CancelOutcome::AwaitingDecision(pending) = workflow.begin_cancel().unwrap() else {
        panic!("dirty cancel should ask for confirmation");
    };
    drop(workflow);

    assert_eq!(block_on(pending), Decision::DiscardCancelled);
    assert_eq!(registry.active_count(), 0);
}

#[test]
fn abandoned_modal_resolves_cancelled_and_keeps_editing() {
    let registry = SessionRegistry::new();
    let surface = Arc::new(HoldingSurface::default());
    let mut workflow = workflow_for(dashboard("cpu"), &registry, surface.clone());
    workflow.open().unwrap();
    workflow.update(vars(&["Z"])).unwrap();

    let CancelOutcome::AwaitingDecision(pending) = workflow.begin_cancel().unwrap() else {
        panic!("dirty cancel should ask for confirmation");
    };
    surface.held.lock().unwrap().clear();

    let decision = block_on(pending);
    assert_eq!(decision, Decision::DiscardCancelled);
    assert_eq!(
        workflow.resolve_discard(decision).unwrap(),
        WorkflowState::Open
    );
    assert_eq!(workflow.transient(), Some(&vars(&["Z"])));
}

#[test]
fn resolve_without_pending_decision_is_usage_error() {
    let registry = SessionRegistry::new();
    let mut workflow = workflow_for(
        dashboard("cpu"),
        &registry,
        Arc::new(HoldingSurface::default()),
    );
    workflow.open().unwrap();

    let err = workflow
        .resolve_discard(Decision::DiscardConfirmed)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Usage(_)));
    assert_eq!(workflow.state(), WorkflowState::Open);
}
