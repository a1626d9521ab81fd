/// An edge in the state hierarchy's transition relation.
///
/// `to_state: None` denotes an internal transition (no exit/entry, the
/// action still runs). `event: None` denotes an eventless transition,
/// always a candidate whenever `from_state` is active and the guard holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from_state: String,
    pub to_state: Option<String>,
    pub event: Option<String>,
    pub guard: Option<String>,
    pub action: Option<String>,
    pub preconditions: Vec<String>,
    pub invariants: Vec<String>,
    pub postconditions: Vec<String>,
}

impl Transition {
    pub fn new(from_state: impl Into<String>) -> Self {
        Self {
            from_state: from_state.into(),
            to_state: None,
            event: None,
            guard: None,
            action: None,
            preconditions: Vec::new(),
            invariants: Vec::new(),
            postconditions: Vec::new(),
        }
    }

    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to_state = Some(state.into());
        self
    }

    pub fn on(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn guarded_by(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn is_internal(&self) -> bool {
        self.to_state.is_none()
    }

    pub fn is_eventless(&self) -> bool {
        self.event.is_none()
    }
}
