//! FFI use-case API for the variable editor UI.
//!
//! # Responsibility
//! - Expose the editor workflow to Dart via FRB as sync, scope-keyed calls.
//! - Carry variable lists as JSON in the dashboard API wire shape.
//! - Stand in for the confirmation modal: the pending responder is parked
//!   per scope until the UI reports the user's choice.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Remote saves are performed by the host between
//!   `variables_submit_begin` and `variables_submit_complete`.
//! - One workflow per scope lives in this process at a time.

use async_trait::async_trait;
use log::warn;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use varedit_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, CancelOutcome,
    ConfirmationSurface, DecisionResponder, DiscardPrompt, PendingDecision, PersistenceError,
    PersistenceResult, Scope, SessionRegistry, VariableDefinitionList, VariableEditWorkflow,
    VariablePersistence, WorkflowState,
};

static SESSIONS: OnceLock<Mutex<HashMap<Scope, HostedWorkflow>>> = OnceLock::new();
static REGISTRY: OnceLock<SessionRegistry> = OnceLock::new();

/// Workflow parked between FFI calls.
struct HostedWorkflow {
    workflow: VariableEditWorkflow,
    surface: Arc<ParkedSurface>,
    pending: Option<PendingDecision>,
}

/// Confirmation surface whose modal lives on the Dart side.
#[derive(Default)]
struct ParkedSurface {
    responder: Mutex<Option<DiscardPrompt>>,
}

impl ParkedSurface {
    fn take(&self) -> Option<DecisionResponder> {
        self.responder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|prompt| prompt.responder)
    }

    fn description(&self) -> Option<String> {
        self.responder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|prompt| prompt.description.clone())
    }
}

impl ConfirmationSurface for ParkedSurface {
    fn present(&self, prompt: DiscardPrompt) {
        *self
            .responder
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(prompt);
    }

    fn dismiss(&self) {
        self.take();
    }
}

/// Save collaborator for project scopes whose save call is made by the host.
///
/// Only reached when something drives the async submit path inside Rust,
/// which this API never does.
struct HostDrivenSave;

#[async_trait]
impl VariablePersistence for HostDrivenSave {
    async fn save(
        &self,
        _scope: &Scope,
        _definitions: &VariableDefinitionList,
    ) -> PersistenceResult<VariableDefinitionList> {
        Err(PersistenceError::Unavailable(
            "remote save is performed by the host".to_string(),
        ))
    }
}

/// Editor response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorResponse {
    /// Whether the call was accepted.
    pub ok: bool,
    /// Workflow state after the call (`closed|open|awaiting_discard_decision`).
    pub state: String,
    /// Working copy while open, committed list once closed.
    pub definitions_json: Option<String>,
    /// Modal description to render while a discard decision is pending.
    pub prompt: Option<String>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
}

impl EditorResponse {
    fn failure(state: WorkflowState, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            state: state.as_str().to_string(),
            definitions_json: None,
            prompt: None,
            message: message.into(),
        }
    }
}

/// Submit response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub ok: bool,
    /// When true the host must save `definitions_json` remotely and report
    /// back through `variables_submit_complete`.
    pub remote: bool,
    pub state: String,
    pub definitions_json: Option<String>,
    pub message: String,
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Idempotent for the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Opens the variable editor for a project (`dashboard = None`) or a
/// dashboard.
///
/// `committed_json` is the scope's current list; an empty string means no
/// variables.
///
/// # FFI contract
/// - Sync call. Never panics.
/// - Fails when the scope already has an open editor.
#[flutter_rust_bridge::frb(sync)]
pub fn variables_open(
    project: String,
    dashboard: Option<String>,
    committed_json: String,
) -> EditorResponse {
    let scope = match Scope::resolve(Some(project.as_str()), dashboard.as_deref()) {
        Ok(scope) => scope,
        Err(err) => return EditorResponse::failure(WorkflowState::Closed, err.to_string()),
    };
    let committed = match decode_definitions(committed_json.as_str()) {
        Ok(definitions) => definitions,
        Err(message) => return EditorResponse::failure(WorkflowState::Closed, message),
    };

    let mut sessions = lock_sessions();
    if let Some(existing) = sessions.get(&scope) {
        if existing.workflow.state() != WorkflowState::Closed {
            return EditorResponse::failure(
                existing.workflow.state(),
                format!("variables_open failed: an editor is already open for `{scope}`"),
            );
        }
    }
    // A closed workflow is replaced so the host's committed list wins.
    sessions.remove(&scope);

    let surface = Arc::new(ParkedSurface::default());
    let built = VariableEditWorkflow::builder()
        .scope(scope.clone())
        .committed(committed)
        .registry(registry().clone())
        .persistence(Arc::new(HostDrivenSave))
        .confirmation_surface(surface.clone())
        .build();
    let mut workflow = match built {
        Ok(workflow) => workflow,
        Err(err) => {
            return EditorResponse::failure(
                WorkflowState::Closed,
                format!("variables_open failed: {err}"),
            )
        }
    };
    if let Err(err) = workflow.open() {
        return EditorResponse::failure(
            workflow.state(),
            format!("variables_open failed: {err}"),
        );
    }

    let hosted = sessions.entry(scope).or_insert(HostedWorkflow {
        workflow,
        surface,
        pending: None,
    });
    describe(hosted, "Editor opened.")
}

/// Replaces the working copy of the open editor.
#[flutter_rust_bridge::frb(sync)]
pub fn variables_update(
    project: String,
    dashboard: Option<String>,
    definitions_json: String,
) -> EditorResponse {
    let definitions = match decode_definitions(definitions_json.as_str()) {
        Ok(definitions) => definitions,
        Err(message) => return EditorResponse::failure(WorkflowState::Open, message),
    };
    with_hosted(project, dashboard, |hosted| {
        hosted
            .workflow
            .update(definitions)
            .map(|()| describe(hosted, "Working copy updated."))
            .map_err(|err| format!("variables_update failed: {err}"))
    })
}

/// Starts a submit.
///
/// Dashboard scopes commit immediately. Project scopes return
/// `remote = true`; the host saves `definitions_json` and then calls
/// `variables_submit_complete`.
///
/// Variable names are checked here and only here; open, update and the
/// host's saved list are taken as given.
#[flutter_rust_bridge::frb(sync)]
pub fn variables_submit_begin(
    project: String,
    dashboard: Option<String>,
    definitions_json: String,
) -> SubmitResponse {
    let failure = |state: WorkflowState, message: String| SubmitResponse {
        ok: false,
        remote: false,
        state: state.as_str().to_string(),
        definitions_json: None,
        message,
    };

    let definitions = match decode_submitted(definitions_json.as_str()) {
        Ok(definitions) => definitions,
        Err(message) => return failure(WorkflowState::Open, message),
    };
    let scope = match Scope::resolve(Some(project.as_str()), dashboard.as_deref()) {
        Ok(scope) => scope,
        Err(err) => return failure(WorkflowState::Closed, err.to_string()),
    };

    let mut sessions = lock_sessions();
    let Some(hosted) = sessions.get_mut(&scope) else {
        return failure(
            WorkflowState::Closed,
            format!("variables_submit_begin failed: no editor for `{scope}`"),
        );
    };

    let request = match hosted.workflow.begin_submit(definitions) {
        Ok(request) => request,
        Err(err) => {
            return failure(
                hosted.workflow.state(),
                format!("variables_submit_begin failed: {err}"),
            )
        }
    };

    if request.remote {
        return SubmitResponse {
            ok: true,
            remote: true,
            state: hosted.workflow.state().as_str().to_string(),
            definitions_json: encode_definitions(&request.definitions),
            message: "Awaiting remote save.".to_string(),
        };
    }

    match hosted.workflow.complete_submit(Ok(request.definitions)) {
        Ok(()) => SubmitResponse {
            ok: true,
            remote: false,
            state: hosted.workflow.state().as_str().to_string(),
            definitions_json: encode_definitions(hosted.workflow.store().get()),
            message: "Variables applied.".to_string(),
        },
        Err(err) => failure(
            hosted.workflow.state(),
            format!("variables_submit_begin failed: {err}"),
        ),
    }
}

/// Reports the outcome of the host's remote save.
///
/// Pass `saved_json` (the list as stored) on success, or `error` on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn variables_submit_complete(
    project: String,
    dashboard: Option<String>,
    saved_json: Option<String>,
    error: Option<String>,
) -> EditorResponse {
    let outcome = match (saved_json, error) {
        (_, Some(message)) => Err(PersistenceError::Rejected(message)),
        (Some(raw), None) => match decode_definitions(raw.as_str()) {
            Ok(saved) => Ok(saved),
            Err(message) => Err(PersistenceError::Rejected(message)),
        },
        (None, None) => Err(PersistenceError::Unavailable(
            "host reported neither a saved list nor an error".to_string(),
        )),
    };

    with_hosted(project, dashboard, |hosted| {
        hosted
            .workflow
            .complete_submit(outcome)
            .map(|()| describe(hosted, "Variables saved."))
            .map_err(|err| format!("variables_submit_complete failed: {err}"))
    })
}

/// Cancels the editor.
///
/// Returns state `closed` when nothing needed confirming, or
/// `awaiting_discard_decision` with `prompt` set when the UI must show the
/// discard modal and report back through `variables_resolve_discard`.
#[flutter_rust_bridge::frb(sync)]
pub fn variables_cancel(project: String, dashboard: Option<String>) -> EditorResponse {
    with_hosted(project, dashboard, |hosted| {
        match hosted.workflow.begin_cancel() {
            Ok(CancelOutcome::Closed) => Ok(describe(hosted, "Editor closed.")),
            Ok(CancelOutcome::AwaitingDecision(pending)) => {
                hosted.pending = Some(pending);
                Ok(describe(hosted, "Discard confirmation required."))
            }
            Err(err) => Err(format!("variables_cancel failed: {err}")),
        }
    })
}

/// Reports the discard modal choice: `discard = true` for "discard changes".
#[flutter_rust_bridge::frb(sync)]
pub fn variables_resolve_discard(
    project: String,
    dashboard: Option<String>,
    discard: bool,
) -> EditorResponse {
    with_hosted(project, dashboard, |hosted| {
        let Some(mut pending) = hosted.pending.take() else {
            return Err("variables_resolve_discard failed: no discard decision is pending".to_string());
        };
        if let Some(responder) = hosted.surface.take() {
            if discard {
                responder.confirm();
            } else {
                responder.decline();
            }
        }
        let Some(decision) = pending.try_decision() else {
            hosted.pending = Some(pending);
            return Err("variables_resolve_discard failed: decision not delivered".to_string());
        };
        hosted
            .workflow
            .resolve_discard(decision)
            .map(|_| describe(hosted, decision.as_str()))
            .map_err(|err| format!("variables_resolve_discard failed: {err}"))
    })
}

/// Tears the editor down (view unmounted). Pending decisions resolve as
/// cancelled and uncommitted edits are dropped.
#[flutter_rust_bridge::frb(sync)]
pub fn variables_close(project: String, dashboard: Option<String>) -> EditorResponse {
    with_hosted(project, dashboard, |hosted| {
        let discarded = hosted.workflow.teardown();
        hosted.pending = None;
        if discarded {
            warn!("event=ffi_editor_teardown module=ffi status=discarded");
        }
        Ok(describe(hosted, "Editor closed."))
    })
}

/// Committed list of a scope as JSON; empty string when the scope has no
/// editor in this process.
#[flutter_rust_bridge::frb(sync)]
pub fn variables_committed(project: String, dashboard: Option<String>) -> String {
    let Ok(scope) = Scope::resolve(Some(project.as_str()), dashboard.as_deref()) else {
        return String::new();
    };
    lock_sessions()
        .get(&scope)
        .and_then(|hosted| encode_definitions(hosted.workflow.store().get()))
        .unwrap_or_default()
}

fn sessions() -> &'static Mutex<HashMap<Scope, HostedWorkflow>> {
    SESSIONS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn lock_sessions() -> std::sync::MutexGuard<'static, HashMap<Scope, HostedWorkflow>> {
    sessions().lock().unwrap_or_else(PoisonError::into_inner)
}

fn registry() -> &'static SessionRegistry {
    REGISTRY.get_or_init(SessionRegistry::new)
}

fn with_hosted(
    project: String,
    dashboard: Option<String>,
    f: impl FnOnce(&mut HostedWorkflow) -> Result<EditorResponse, String>,
) -> EditorResponse {
    let scope = match Scope::resolve(Some(project.as_str()), dashboard.as_deref()) {
        Ok(scope) => scope,
        Err(err) => return EditorResponse::failure(WorkflowState::Closed, err.to_string()),
    };
    let mut sessions = lock_sessions();
    let Some(hosted) = sessions.get_mut(&scope) else {
        return EditorResponse::failure(
            WorkflowState::Closed,
            format!("no editor is open for `{scope}`"),
        );
    };
    match f(&mut *hosted) {
        Ok(response) => response,
        Err(message) => EditorResponse::failure(hosted.workflow.state(), message),
    }
}

fn describe(hosted: &HostedWorkflow, message: impl Into<String>) -> EditorResponse {
    let state = hosted.workflow.state();
    let definitions = hosted
        .workflow
        .transient()
        .unwrap_or_else(|| hosted.workflow.store().get());
    let prompt = match state {
        WorkflowState::AwaitingDiscardDecision => hosted.surface.description(),
        _ => None,
    };
    EditorResponse {
        ok: true,
        state: state.as_str().to_string(),
        definitions_json: encode_definitions(definitions),
        prompt,
        message: message.into(),
    }
}

fn decode_definitions(raw: &str) -> Result<VariableDefinitionList, String> {
    if raw.trim().is_empty() {
        return Ok(VariableDefinitionList::empty());
    }
    serde_json::from_str(raw).map_err(|err| format!("invalid variables JSON: {err}"))
}

fn decode_submitted(raw: &str) -> Result<VariableDefinitionList, String> {
    let definitions = decode_definitions(raw)?;
    definitions
        .validate()
        .map_err(|err| format!("variables_submit_begin failed: {err}"))?;
    Ok(definitions)
}

fn encode_definitions(definitions: &VariableDefinitionList) -> Option<String> {
    serde_json::to_string(definitions).ok()
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, variables_cancel, variables_close, variables_committed,
        variables_open, variables_resolve_discard, variables_submit_begin,
        variables_submit_complete, variables_update,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    const ONE_VAR: &str = r#"[{"kind":"TextVariable","spec":{"name":"A","value":""}}]"#;
    const TWO_VARS: &str = r#"[{"kind":"TextVariable","spec":{"name":"A","value":""}},{"kind":"TextVariable","spec":{"name":"B","value":""}}]"#;

    fn unique_project(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_relative_log_dir() {
        let error = init_logging("info".to_string(), "tmp/logs".to_string());
        assert!(error.contains("absolute"));
    }

    #[test]
    fn dashboard_edit_then_confirmed_discard_keeps_committed_list() {
        let project = unique_project("discard");
        let dashboard = Some("demo".to_string());

        let opened = variables_open(project.clone(), dashboard.clone(), ONE_VAR.to_string());
        assert!(opened.ok, "{}", opened.message);
        assert_eq!(opened.state, "open");

        let again = variables_open(project.clone(), dashboard.clone(), ONE_VAR.to_string());
        assert!(!again.ok);

        let updated = variables_update(project.clone(), dashboard.clone(), TWO_VARS.to_string());
        assert!(updated.ok, "{}", updated.message);

        let cancelled = variables_cancel(project.clone(), dashboard.clone());
        assert!(cancelled.ok, "{}", cancelled.message);
        assert_eq!(cancelled.state, "awaiting_discard_decision");
        assert!(cancelled.prompt.is_some());

        let blocked = variables_update(project.clone(), dashboard.clone(), ONE_VAR.to_string());
        assert!(!blocked.ok);

        let resolved = variables_resolve_discard(project.clone(), dashboard.clone(), true);
        assert!(resolved.ok, "{}", resolved.message);
        assert_eq!(resolved.state, "closed");

        let committed: serde_json::Value =
            serde_json::from_str(&variables_committed(project, dashboard)).expect("committed json");
        assert_eq!(committed.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn declined_discard_keeps_editing() {
        let project = unique_project("decline");
        let dashboard = Some("demo".to_string());
        variables_open(project.clone(), dashboard.clone(), String::new());
        variables_update(project.clone(), dashboard.clone(), ONE_VAR.to_string());
        variables_cancel(project.clone(), dashboard.clone());

        let resolved = variables_resolve_discard(project.clone(), dashboard.clone(), false);
        assert!(resolved.ok, "{}", resolved.message);
        assert_eq!(resolved.state, "open");

        let closed = variables_close(project, dashboard);
        assert_eq!(closed.state, "closed");
    }

    #[test]
    fn project_submit_round_trips_through_host_save() {
        let project = unique_project("project-save");

        let opened = variables_open(project.clone(), None, String::new());
        assert!(opened.ok, "{}", opened.message);

        let begun = variables_submit_begin(project.clone(), None, ONE_VAR.to_string());
        assert!(begun.ok, "{}", begun.message);
        assert!(begun.remote);

        let failed = variables_submit_complete(
            project.clone(),
            None,
            None,
            Some("conflict".to_string()),
        );
        assert!(!failed.ok);
        assert_eq!(failed.state, "open");

        let begun = variables_submit_begin(project.clone(), None, ONE_VAR.to_string());
        assert!(begun.ok, "{}", begun.message);
        let saved = variables_submit_complete(project.clone(), None, begun.definitions_json, None);
        assert!(saved.ok, "{}", saved.message);
        assert_eq!(saved.state, "closed");
        assert!(variables_committed(project, None).contains("\"A\""));
    }

    #[test]
    fn names_are_checked_on_submit_only() {
        let project = unique_project("names");
        let legacy = r#"[{"kind":"TextVariable","spec":{"name":"bad name"}}]"#;
        let duplicated = r#"[{"kind":"TextVariable","spec":{"name":"A"}},{"kind":"TextVariable","spec":{"name":"A"}}]"#;

        let opened = variables_open(project.clone(), None, legacy.to_string());
        assert!(opened.ok, "{}", opened.message);

        let updated = variables_update(project.clone(), None, duplicated.to_string());
        assert!(updated.ok, "{}", updated.message);

        let rejected = variables_submit_begin(project.clone(), None, duplicated.to_string());
        assert!(!rejected.ok);
        assert_eq!(rejected.state, "open");
        assert!(rejected.message.contains("`A`"));

        let begun = variables_submit_begin(project.clone(), None, ONE_VAR.to_string());
        assert!(begun.ok, "{}", begun.message);
        let saved = variables_submit_complete(project.clone(), None, Some(legacy.to_string()), None);
        assert!(saved.ok, "{}", saved.message);
        assert!(variables_committed(project, None).contains("bad name"));
    }
}
