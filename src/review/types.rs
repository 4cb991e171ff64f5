use crate::source::ItemDetail;

/// A confirmed record that the user worked on an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub detail: ItemDetail,
    /// Free-form notes, lines joined with '\n'. Empty when the user
    /// confirmed without describing the work.
    pub notes: String,
}

/// Result of reviewing one candidate. Skipping is a user choice, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    Worked(Annotation),
    NotWorked,
    Skipped,
}

impl std::fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewOutcome::Worked(_) => write!(f, "worked"),
            ReviewOutcome::NotWorked => write!(f, "not worked"),
            ReviewOutcome::Skipped => write!(f, "skipped"),
        }
    }
}
