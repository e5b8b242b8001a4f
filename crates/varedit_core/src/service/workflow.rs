//! Variable editor workflow.
//!
//! # Responsibility
//! - Drive one scope's editor through `Closed -> Open -> Closed`, staging
//!   edits in a transient copy until submit.
//! - Route submits through local commit or the remote save collaborator.
//! - Ask the confirmation gate before discarding dirty edits on cancel.
//!
//! # Invariants
//! - One open session per scope (enforced through `SessionRegistry`).
//! - The committed store is written at most once per session, and only
//!   after the save collaborator succeeded.
//! - A failed submit keeps the session open with the submitted edits.
//! - Triggers invalid for the current state fail with `UsageError` and leave
//!   the state untouched.
//! - Tearing a workflow down while a decision is pending resolves that
//!   decision as cancelled.

use crate::config::{CancelPolicy, ConfigError, WorkflowConfig};
use crate::edit::gate::{ConfirmationSurface, Decision, DiscardConfirmationGate, PendingDecision};
use crate::edit::session::{SessionId, SessionLease, SessionRegistry};
use crate::edit::transient::TransientEditState;
use crate::model::scope::{Scope, ScopeError};
use crate::model::variable::VariableDefinitionList;
use crate::repo::definition_store::VariableDefinitionStore;
use crate::repo::persistence::{PersistenceError, PersistenceResult, VariablePersistence};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Externally visible workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Closed,
    /// Editor open; a submit may be in flight (see `is_submitting`).
    Open,
    AwaitingDiscardDecision,
}

impl WorkflowState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::AwaitingDiscardDecision => "awaiting_discard_decision",
        }
    }
}

/// Workflow trigger names, used in usage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOperation {
    Open,
    Update,
    Submit,
    CompleteSubmit,
    Cancel,
    ResolveDiscard,
}

impl WorkflowOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Update => "update",
            Self::Submit => "submit",
            Self::CompleteSubmit => "complete_submit",
            Self::Cancel => "cancel",
            Self::ResolveDiscard => "resolve_discard",
        }
    }
}

/// Trigger rejected because of the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError {
    pub operation: WorkflowOperation,
    pub state: WorkflowState,
    pub reason: &'static str,
}

impl Display for UsageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "`{}` is not allowed in state `{}`: {}",
            self.operation.as_str(),
            self.state.as_str(),
            self.reason
        )
    }
}

impl Error for UsageError {}

/// Workflow construction and trigger errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    Usage(UsageError),
    Persistence(PersistenceError),
    MissingScope(ScopeError),
    /// The scope needs remote saves but no save collaborator was provided.
    MissingPersistence(Scope),
    MissingConfirmationSurface,
    SessionAlreadyOpen(Scope),
    InvalidConfig(ConfigError),
}

impl Display for WorkflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::MissingScope(err) => write!(f, "{err}"),
            Self::MissingPersistence(scope) => {
                write!(f, "scope `{scope}` requires a persistence collaborator")
            }
            Self::MissingConfirmationSurface => write!(
                f,
                "cancel policy confirm_when_dirty requires a confirmation surface"
            ),
            Self::SessionAlreadyOpen(scope) => {
                write!(f, "an editor session is already open for `{scope}`")
            }
            Self::InvalidConfig(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkflowError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Usage(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::MissingScope(err) => Some(err),
            Self::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UsageError> for WorkflowError {
    fn from(value: UsageError) -> Self {
        Self::Usage(value)
    }
}

impl From<PersistenceError> for WorkflowError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

impl From<ScopeError> for WorkflowError {
    fn from(value: ScopeError) -> Self {
        Self::MissingScope(value)
    }
}

impl From<ConfigError> for WorkflowError {
    fn from(value: ConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}

/// Result of the synchronous half of `cancel`.
#[derive(Debug)]
pub enum CancelOutcome {
    /// Session discarded without asking (clean edits or discard policy).
    Closed,
    /// Modal presented; feed its decision to `resolve_discard`.
    AwaitingDecision(PendingDecision),
}

/// Work item produced by `begin_submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub session_id: SessionId,
    pub scope: Scope,
    pub definitions: VariableDefinitionList,
    /// Whether the list must go through the remote save service before it
    /// may be committed.
    pub remote: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Editing,
    Submitting,
    AwaitingDiscardDecision,
}

impl SessionPhase {
    fn busy_reason(self) -> &'static str {
        match self {
            Self::Editing => "the editor is open",
            Self::Submitting => "a submit is already in flight",
            Self::AwaitingDiscardDecision => "a discard decision is pending",
        }
    }
}

struct EditSession {
    lease: SessionLease,
    baseline: VariableDefinitionList,
    transient: TransientEditState,
    phase: SessionPhase,
}

/// Builder for `VariableEditWorkflow`.
#[derive(Default)]
pub struct VariableEditWorkflowBuilder {
    scope: Option<Result<Scope, ScopeError>>,
    committed: VariableDefinitionList,
    config: WorkflowConfig,
    registry: Option<SessionRegistry>,
    persistence: Option<Arc<dyn VariablePersistence>>,
    surface: Option<Arc<dyn ConfirmationSurface>>,
}

impl VariableEditWorkflowBuilder {
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(Ok(scope));
        self
    }

    /// Resolves the scope from optional context identifiers at `build` time.
    pub fn scope_context(mut self, project: Option<&str>, dashboard: Option<&str>) -> Self {
        self.scope = Some(Scope::resolve(project, dashboard));
        self
    }

    /// Initial committed list of the scope.
    pub fn committed(mut self, definitions: VariableDefinitionList) -> Self {
        self.committed = definitions;
        self
    }

    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares the per-scope session guard with other workflows.
    pub fn registry(mut self, registry: SessionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn persistence(mut self, persistence: Arc<dyn VariablePersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn confirmation_surface(mut self, surface: Arc<dyn ConfirmationSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Builds a closed workflow.
    ///
    /// # Errors
    /// - `MissingScope` when no scope (or an unresolvable scope context) was given.
    /// - `MissingPersistence` when the persistence policy needs remote saves
    ///   for this scope and no collaborator was given.
    /// - `MissingConfirmationSurface` when cancel must confirm and no surface
    ///   was given.
    /// - `InvalidConfig` when the config fails validation.
    pub fn build(self) -> Result<VariableEditWorkflow, WorkflowError> {
        let scope = self.scope.unwrap_or(Err(ScopeError::MissingProject))?;
        self.config.validate()?;

        if self.config.persistence_policy.uses_remote(&scope) && self.persistence.is_none() {
            return Err(WorkflowError::MissingPersistence(scope));
        }
        if self.config.cancel_policy == CancelPolicy::ConfirmWhenDirty && self.surface.is_none() {
            return Err(WorkflowError::MissingConfirmationSurface);
        }

        info!(
            "event=variables_workflow_init module=workflow status=ok scope_kind={} count={}",
            scope.kind_label(),
            self.committed.len()
        );

        Ok(VariableEditWorkflow {
            config: self.config,
            store: VariableDefinitionStore::new(scope, self.committed),
            registry: self.registry.unwrap_or_default(),
            gate: self.surface.map(DiscardConfirmationGate::new),
            persistence: self.persistence,
            session: None,
        })
    }
}

/// Edit/cancel/commit state machine for one scope's variable definitions.
pub struct VariableEditWorkflow {
    config: WorkflowConfig,
    store: VariableDefinitionStore,
    registry: SessionRegistry,
    gate: Option<DiscardConfirmationGate>,
    persistence: Option<Arc<dyn VariablePersistence>>,
    session: Option<EditSession>,
}

impl VariableEditWorkflow {
    pub fn builder() -> VariableEditWorkflowBuilder {
        VariableEditWorkflowBuilder::default()
    }

    pub fn state(&self) -> WorkflowState {
        match self.session.as_ref().map(|session| session.phase) {
            None => WorkflowState::Closed,
            Some(SessionPhase::Editing | SessionPhase::Submitting) => WorkflowState::Open,
            Some(SessionPhase::AwaitingDiscardDecision) => WorkflowState::AwaitingDiscardDecision,
        }
    }

    pub fn scope(&self) -> &Scope {
        self.store.scope()
    }

    pub fn store(&self) -> &VariableDefinitionStore {
        &self.store
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.lease.id())
    }

    /// Working copy of the open session.
    pub fn transient(&self) -> Option<&VariableDefinitionList> {
        self.session
            .as_ref()
            .map(|session| session.transient.current())
    }

    /// Whether the open session differs from the snapshot taken at open.
    pub fn is_dirty(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.transient.is_dirty(&session.baseline))
    }

    pub fn is_submitting(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.phase == SessionPhase::Submitting)
    }

    /// Opens the editor and seeds the working copy from the committed list.
    pub fn open(&mut self) -> Result<&VariableDefinitionList, WorkflowError> {
        if let Some(session) = self.session.as_ref() {
            return Err(usage(
                WorkflowOperation::Open,
                self.state(),
                session.phase.busy_reason(),
            ));
        }

        let lease = self
            .registry
            .try_acquire(self.store.scope())
            .map_err(|conflict| WorkflowError::SessionAlreadyOpen(conflict.0))?;
        let baseline = self.store.get().clone();
        let transient = TransientEditState::seed(&baseline);

        info!(
            "event=variables_editor_open module=workflow status=ok scope_kind={} session_id={} count={}",
            self.store.scope().kind_label(),
            lease.id(),
            baseline.len()
        );

        let session = self.session.insert(EditSession {
            lease,
            baseline,
            transient,
            phase: SessionPhase::Editing,
        });
        Ok(session.transient.current())
    }

    /// Replaces the working copy with `next`.
    pub fn update(&mut self, next: VariableDefinitionList) -> Result<(), WorkflowError> {
        let session = self.editing_session(WorkflowOperation::Update)?;
        session.transient.update(next);
        debug!(
            "event=variables_editor_update module=workflow status=ok session_id={} count={}",
            session.lease.id(),
            session.transient.current().len()
        );
        Ok(())
    }

    /// Stages `candidate` and marks a submit as in flight.
    ///
    /// The caller must finish with `complete_submit` (or `abandon_submit`).
    pub fn begin_submit(
        &mut self,
        candidate: VariableDefinitionList,
    ) -> Result<SubmitRequest, WorkflowError> {
        let scope = self.store.scope().clone();
        let remote = self.config.persistence_policy.uses_remote(&scope);
        let session = self.editing_session(WorkflowOperation::Submit)?;

        session.transient.update(candidate);
        session.phase = SessionPhase::Submitting;

        info!(
            "event=variables_submit_begin module=workflow status=pending scope_kind={} session_id={} remote={} count={}",
            scope.kind_label(),
            session.lease.id(),
            remote,
            session.transient.current().len()
        );

        Ok(SubmitRequest {
            session_id: session.lease.id(),
            scope,
            definitions: session.transient.current().clone(),
            remote,
        })
    }

    /// Finishes an in-flight submit with the save outcome.
    ///
    /// On success the saved list is committed and the session closes. On
    /// failure the session returns to editing and the error is returned.
    pub fn complete_submit(
        &mut self,
        outcome: PersistenceResult<VariableDefinitionList>,
    ) -> Result<(), WorkflowError> {
        if !self.is_submitting() {
            return Err(usage(
                WorkflowOperation::CompleteSubmit,
                self.state(),
                "no submit is in flight",
            ));
        }

        match outcome {
            Ok(saved) => {
                self.store.commit(saved);
                self.close_session("submitted");
                Ok(())
            }
            Err(err) => {
                if let Some(session) = self.session.as_mut() {
                    session.phase = SessionPhase::Editing;
                    warn!(
                        "event=variables_submit_failed module=workflow status=error session_id={} error={}",
                        session.lease.id(),
                        err
                    );
                }
                Err(WorkflowError::Persistence(err))
            }
        }
    }

    /// Returns an in-flight submit to editing without touching the store.
    ///
    /// For drivers that dropped the save before it answered.
    pub fn abandon_submit(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) if session.phase == SessionPhase::Submitting => {
                session.phase = SessionPhase::Editing;
                warn!(
                    "event=variables_submit_abandoned module=workflow status=cancelled session_id={}",
                    session.lease.id()
                );
                true
            }
            _ => false,
        }
    }

    /// Submits `candidate`, saving remotely first when the scope needs it.
    pub async fn submit(&mut self, candidate: VariableDefinitionList) -> Result<(), WorkflowError> {
        let request = self.begin_submit(candidate)?;
        let outcome = if request.remote {
            match self.persistence.clone() {
                Some(persistence) => persistence.save(&request.scope, &request.definitions).await,
                None => Err(PersistenceError::Unavailable(
                    "no persistence collaborator configured".to_string(),
                )),
            }
        } else {
            Ok(request.definitions)
        };
        self.complete_submit(outcome)
    }

    /// Starts a cancel.
    ///
    /// Clean sessions, and any session under `CancelPolicy::AlwaysDiscard`,
    /// close immediately. Dirty sessions present the discard modal and move
    /// to `AwaitingDiscardDecision`.
    pub fn begin_cancel(&mut self) -> Result<CancelOutcome, WorkflowError> {
        let dirty = {
            let session = self.editing_session(WorkflowOperation::Cancel)?;
            session.transient.is_dirty(&session.baseline)
        };

        if !dirty {
            self.close_session("cancelled_clean");
            return Ok(CancelOutcome::Closed);
        }
        if self.config.cancel_policy == CancelPolicy::AlwaysDiscard {
            self.close_session("cancelled_discard_policy");
            return Ok(CancelOutcome::Closed);
        }

        let state = self.state();
        let Some(gate) = self.gate.as_mut() else {
            return Err(WorkflowError::MissingConfirmationSurface);
        };
        let pending = gate.request(&self.config.discard_prompt).map_err(|_| {
            usage(
                WorkflowOperation::Cancel,
                state,
                SessionPhase::AwaitingDiscardDecision.busy_reason(),
            )
        })?;

        if let Some(session) = self.session.as_mut() {
            session.phase = SessionPhase::AwaitingDiscardDecision;
        }
        Ok(CancelOutcome::AwaitingDecision(pending))
    }

    /// Applies the user's discard decision.
    ///
    /// `DiscardConfirmed` closes without writing the store;
    /// `DiscardCancelled` reopens the editor with its edits intact. A modal
    /// still waiting on its responder is closed and the gate returns to idle.
    pub fn resolve_discard(&mut self, decision: Decision) -> Result<WorkflowState, WorkflowError> {
        let phase = self.session.as_ref().map(|session| session.phase);
        if phase != Some(SessionPhase::AwaitingDiscardDecision) {
            return Err(usage(
                WorkflowOperation::ResolveDiscard,
                self.state(),
                "no discard decision is pending",
            ));
        }
        if let Some(gate) = self.gate.as_mut() {
            gate.settle(decision);
        }

        match decision {
            Decision::DiscardConfirmed => self.close_session(decision.as_str()),
            Decision::DiscardCancelled => {
                if let Some(session) = self.session.as_mut() {
                    session.phase = SessionPhase::Editing;
                    info!(
                        "event=variables_discard_declined module=workflow status=ok session_id={}",
                        session.lease.id()
                    );
                }
            }
        }
        Ok(self.state())
    }

    /// Cancels, waiting for the user's decision when one is needed.
    pub async fn cancel(&mut self) -> Result<WorkflowState, WorkflowError> {
        match self.begin_cancel()? {
            CancelOutcome::Closed => Ok(WorkflowState::Closed),
            CancelOutcome::AwaitingDecision(pending) => {
                let decision = pending.await;
                self.resolve_discard(decision)
            }
        }
    }

    /// Discards any open session, resolving a pending decision as cancelled.
    ///
    /// Returns whether a session was open.
    pub fn teardown(&mut self) -> bool {
        if let Some(gate) = self.gate.as_mut() {
            gate.abort();
        }
        if self.session.is_none() {
            return false;
        }
        self.close_session("teardown");
        true
    }

    fn editing_session(
        &mut self,
        operation: WorkflowOperation,
    ) -> Result<&mut EditSession, WorkflowError> {
        let state = self.state();
        match self.session.as_mut() {
            Some(session) if session.phase == SessionPhase::Editing => Ok(session),
            Some(session) => Err(usage(operation, state, session.phase.busy_reason())),
            None => Err(usage(operation, state, "no editor session is open")),
        }
    }

    fn close_session(&mut self, reason: &str) {
        if let Some(session) = self.session.take() {
            info!(
                "event=variables_editor_close module=workflow status=ok scope_kind={} session_id={} reason={} revision={}",
                self.store.scope().kind_label(),
                session.lease.id(),
                reason,
                self.store.revision()
            );
        }
    }
}

impl Drop for VariableEditWorkflow {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn usage(operation: WorkflowOperation, state: WorkflowState, reason: &'static str) -> WorkflowError {
    WorkflowError::Usage(UsageError {
        operation,
        state,
        reason,
    })
}
