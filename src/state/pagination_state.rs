/// Pagination state definitions
///
/// This module defines the states a pagination driver moves through while
/// revealing more items, and the reasons a collection leg stops.
use std::fmt;

/// Current state of the pagination driver
///
/// `Idle -> Triggering -> Measuring -> {Idle | Stalled | Exhausted | Blocked}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaginationState {
    // ===== Active States =====
    /// Waiting for the next cycle
    Idle,

    /// Scroll issued, waiting for content to render
    Triggering,

    /// Comparing the rendered items against the previous cycle
    Measuring,

    /// The last cycle revealed nothing new
    Stalled,

    // ===== Terminal States =====
    /// No more collection will happen on this leg
    Exhausted,

    /// The page accessor failed beyond the retry budget
    Blocked,
}

impl PaginationState {
    /// Returns true if the driver will not advance again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Blocked)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: PaginationState) -> bool {
        use PaginationState::*;
        match self {
            Idle | Stalled => matches!(next, Triggering | Exhausted | Blocked),
            Triggering => matches!(next, Measuring | Blocked | Exhausted),
            Measuring => matches!(next, Idle | Stalled | Exhausted | Blocked),
            Exhausted | Blocked => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Triggering => "triggering",
            Self::Measuring => "measuring",
            Self::Stalled => "stalled",
            Self::Exhausted => "exhausted",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for PaginationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a collection leg (or a whole run) stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    // ===== Exhausted =====
    /// The caller's record limit was reached
    MaxRecords,

    /// An item older than the date range start was seen
    DateBoundPassed,

    // ===== Natural End =====
    /// Consecutive stalls reached the threshold
    NoMoreContent,

    /// The page rendered its empty-state placeholder
    EmptyResults,

    /// Nothing rendered within the initial load timeout
    NoContent,

    // ===== Caller / Failure =====
    /// The caller cancelled the run
    Cancelled,

    /// The page accessor failed beyond the retry budget
    Interrupted,
}

impl StopReason {
    /// Returns true if the stop satisfied a caller bound
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::MaxRecords | Self::DateBoundPassed)
    }

    /// Returns true if the source ran out of content
    pub fn is_natural_end(&self) -> bool {
        matches!(self, Self::NoMoreContent | Self::EmptyResults | Self::NoContent)
    }

    /// Returns true if every record the run could yield was collected
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::Interrupted)
    }

    /// Returns true if the whole run must end, not just the current leg
    pub fn ends_run(&self) -> bool {
        matches!(self, Self::MaxRecords | Self::Cancelled | Self::Interrupted)
    }

    /// Converts the reason to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::MaxRecords => "max_records",
            Self::DateBoundPassed => "date_bound_passed",
            Self::NoMoreContent => "no_more_content",
            Self::EmptyResults => "empty_results",
            Self::NoContent => "no_content",
            Self::Cancelled => "cancelled",
            Self::Interrupted => "interrupted",
        }
    }

    /// Parses a reason from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "max_records" => Some(Self::MaxRecords),
            "date_bound_passed" => Some(Self::DateBoundPassed),
            "no_more_content" => Some(Self::NoMoreContent),
            "empty_results" => Some(Self::EmptyResults),
            "no_content" => Some(Self::NoContent),
            "cancelled" => Some(Self::Cancelled),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Returns all stop reasons
    pub fn all_reasons() -> Vec<Self> {
        vec![
            Self::MaxRecords,
            Self::DateBoundPassed,
            Self::NoMoreContent,
            Self::EmptyResults,
            Self::NoContent,
            Self::Cancelled,
            Self::Interrupted,
        ]
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MaxRecords => "record limit reached",
            Self::DateBoundPassed => "date range passed",
            Self::NoMoreContent => "no more content",
            Self::EmptyResults => "no results",
            Self::NoContent => "nothing rendered",
            Self::Cancelled => "cancelled",
            Self::Interrupted => "interrupted",
        };
        write!(f, "{}", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(PaginationState::Exhausted.is_terminal());
        assert!(PaginationState::Blocked.is_terminal());
        assert!(!PaginationState::Idle.is_terminal());
        assert!(!PaginationState::Stalled.is_terminal());
    }

    #[test]
    fn test_transitions() {
        use PaginationState::*;
        assert!(Idle.can_transition_to(Triggering));
        assert!(Triggering.can_transition_to(Measuring));
        assert!(Measuring.can_transition_to(Idle));
        assert!(Measuring.can_transition_to(Stalled));
        assert!(Stalled.can_transition_to(Triggering));
        assert!(Stalled.can_transition_to(Exhausted));

        assert!(!Idle.can_transition_to(Measuring));
        assert!(!Exhausted.can_transition_to(Idle));
        assert!(!Blocked.can_transition_to(Triggering));
    }

    #[test]
    fn test_stop_reason_roundtrip() {
        for reason in StopReason::all_reasons() {
            let s = reason.to_db_string();
            assert_eq!(StopReason::from_db_string(s), Some(reason));
        }
        assert_eq!(StopReason::from_db_string("unknown"), None);
    }

    #[test]
    fn test_stop_reason_categories() {
        for reason in StopReason::all_reasons() {
            let categories = [reason.is_exhausted(), reason.is_natural_end(), !reason.is_complete()];
            assert_eq!(
                categories.iter().filter(|c| **c).count(),
                1,
                "{:?} must be in exactly one category",
                reason
            );
        }
        assert!(StopReason::MaxRecords.ends_run());
        assert!(!StopReason::DateBoundPassed.ends_run());
        assert!(!StopReason::NoMoreContent.ends_run());
    }

    #[test]
    fn test_display() {
        assert_eq!(PaginationState::Measuring.to_string(), "measuring");
        assert_eq!(StopReason::NoMoreContent.to_string(), "no more content");
    }
}
