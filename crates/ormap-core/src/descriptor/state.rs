//! Resolution state machine.
//!
//! [`transition`] is pure: it maps the current state and a request to the
//! next state and the ordered steps the resolver must run to get there.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How far a class descriptor has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveState {
    /// Nothing resolved.
    #[default]
    Unresolved,
    /// Strategy, table, primary key and non-relation fields resolved.
    NonRelationResolved,
    /// Every field resolved.
    Resolved,
    /// Post-pass over the whole catalog done.
    Initialized,
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolveState::Unresolved => "unresolved",
            ResolveState::NonRelationResolved => "non-relation-resolved",
            ResolveState::Resolved => "resolved",
            ResolveState::Initialized => "initialized",
        };
        f.write_str(name)
    }
}

/// What a caller asks of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveRequest {
    /// Resolve everything except relation fields.
    NonRelations,
    /// Resolve everything.
    Relations,
    /// Run the post-pass.
    Initialize,
    /// Forget the mapping.
    Clear,
}

/// One step of resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Bring the superclass to the non-relation state.
    ResolveSuperclass,
    /// Select and install the class strategy.
    InstallStrategy,
    /// Map the class onto its table.
    MapClass,
    /// Resolve primary key fields and install the table's primary key.
    ResolvePrimaryKeyFields,
    /// Resolve fields that do not involve relations.
    ResolveNonRelationFields,
    /// Resolve the version.
    ResolveVersion,
    /// Resolve the discriminator.
    ResolveDiscriminator,
    /// Bring the superclass to the resolved state.
    ResolveSuperclassRelations,
    /// Resolve relation fields.
    ResolveRelationFields,
    /// Re-resolve fields whose key referenced an incomplete primary key.
    RetryIncompleteForeignKeys,
    /// Record column insert/update flags.
    MarkColumnIo,
    /// Resolve class-level unique constraints.
    ResolveUniques,
    /// Compute field post-pass data.
    InitializeFields,
    /// Initialize custom strategies.
    InitializeStrategy,
    /// Drop every resolved attachment.
    ClearMapping,
}

const NON_RELATION_STEPS: &[Effect] = &[
    Effect::ResolveSuperclass,
    Effect::InstallStrategy,
    Effect::MapClass,
    Effect::ResolvePrimaryKeyFields,
    Effect::ResolveNonRelationFields,
    Effect::ResolveVersion,
    Effect::ResolveDiscriminator,
];

const RELATION_STEPS: &[Effect] = &[
    Effect::ResolveSuperclassRelations,
    Effect::ResolveRelationFields,
    Effect::RetryIncompleteForeignKeys,
    Effect::MarkColumnIo,
    Effect::ResolveUniques,
];

const INITIALIZE_STEPS: &[Effect] = &[Effect::InitializeFields, Effect::InitializeStrategy];

/// Outcome of a valid request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State after the effects ran.
    pub next: ResolveState,
    /// Steps to run, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(state: ResolveState) -> Self {
        Self {
            next: state,
            effects: Vec::new(),
        }
    }

    fn to(next: ResolveState, steps: &[&[Effect]]) -> Self {
        Self {
            next,
            effects: steps.iter().flat_map(|s| s.iter().copied()).collect(),
        }
    }
}

/// A request the current state cannot satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    /// State at the time of the request.
    pub state: ResolveState,
    /// The request.
    pub request: ResolveRequest,
}

/// Next state and steps for a request.
pub fn transition(
    state: ResolveState,
    request: ResolveRequest,
) -> Result<Transition, InvalidTransition> {
    use ResolveRequest as Req;
    use ResolveState as S;

    let outcome = match (state, request) {
        (S::Unresolved, Req::Clear) => Transition::stay(S::Unresolved),
        (_, Req::Clear) => Transition::to(S::Unresolved, &[&[Effect::ClearMapping]]),

        (S::Unresolved, Req::NonRelations) => {
            Transition::to(S::NonRelationResolved, &[NON_RELATION_STEPS])
        }
        (S::Unresolved, Req::Relations) => {
            Transition::to(S::Resolved, &[NON_RELATION_STEPS, RELATION_STEPS])
        }
        (S::NonRelationResolved, Req::Relations) => Transition::to(S::Resolved, &[RELATION_STEPS]),
        (S::Resolved, Req::Initialize) => Transition::to(S::Initialized, &[INITIALIZE_STEPS]),

        (S::Unresolved | S::NonRelationResolved, Req::Initialize) => {
            return Err(InvalidTransition { state, request })
        }
        (current, _) => Transition::stay(current),
    };
    Ok(outcome)
}
