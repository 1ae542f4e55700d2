use std::fmt;

/// A caller the identity collaborator has flagged as a privileged reviewer.
///
/// The engine trusts the flag completely; holding a `Reviewer` is the proof
/// that the check already passed. Reviewer-only operations take one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reviewer {
    name: String,
}

impl Reviewer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Reviewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
