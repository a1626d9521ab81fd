/// Structural violation detected while building a [`crate::Statechart`].
///
/// These are load-time checks: once a `Statechart` exists, the interpreter
/// trusts the invariants they establish.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ModelError {
    #[error("state name '{0}' is used more than once")]
    DuplicateStateName(String),
    #[error("transition from '{from}' references unknown state '{to}'")]
    UnknownState { from: String, to: String },
    #[error("'{0}' is not a known state")]
    NoSuchState(String),
    #[error("initial child '{initial}' of '{parent}' does not exist")]
    UnknownInitial { parent: String, initial: String },
    #[error("initial child '{initial}' of '{parent}' is not a child of '{parent}'")]
    InitialNotAChild { parent: String, initial: String },
    #[error("compound state '{0}' has no initial child")]
    MissingInitial(String),
    #[error("history state '{0}' is not attached to a compound parent")]
    HistoryNotOnCompound(String),
    #[error("orthogonal state '{parent}' has child '{child}' which is neither compound nor orthogonal")]
    InvalidOrthogonalChild { parent: String, child: String },
    #[error("the statechart has no root initial state")]
    MissingRootInitial,
}
