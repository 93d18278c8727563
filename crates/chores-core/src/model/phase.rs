use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The nine workflow phases, in their only legal order.
///
/// Every stage (design, plan, work) has a worker sub-stage, a review
/// sub-stage and a hand-off sub-stage. `WorkDone` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Design,
    DesignReview,
    DesignReady,
    Plan,
    PlanReview,
    PlanReady,
    Work,
    WorkReview,
    WorkDone,
}

/// Which kind of agent owns a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Worker,
    Reviewer,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Reviewer => "reviewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Phase {
    /// All phases in workflow order.
    pub const ALL: [Self; 9] = [
        Self::Design,
        Self::DesignReview,
        Self::DesignReady,
        Self::Plan,
        Self::PlanReview,
        Self::PlanReady,
        Self::Work,
        Self::WorkReview,
        Self::WorkDone,
    ];

    /// Phase assigned to newly created chores.
    pub const FIRST: Self = Self::Design;

    /// The single terminal phase.
    pub const TERMINAL: Self = Self::WorkDone;

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::DesignReview => "design_review",
            Self::DesignReady => "design_ready",
            Self::Plan => "plan",
            Self::PlanReview => "plan_review",
            Self::PlanReady => "plan_ready",
            Self::Work => "work",
            Self::WorkReview => "work_review",
            Self::WorkDone => "work_done",
        }
    }

    /// Compact label for status lines.
    #[must_use]
    pub const fn short_label(self) -> &'static str {
        match self {
            Self::Design => "DSN",
            Self::DesignReview => "D-R",
            Self::DesignReady => "D-OK",
            Self::Plan => "PLN",
            Self::PlanReview => "P-R",
            Self::PlanReady => "P-OK",
            Self::Work => "WRK",
            Self::WorkReview => "W-R",
            Self::WorkDone => "DONE",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::WorkDone)
    }

    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::DesignReview | Self::PlanReview | Self::WorkReview => Role::Reviewer,
            _ => Role::Worker,
        }
    }

    /// The table's single allowed successor, or `None` for the terminal phase.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Design => Some(Self::DesignReview),
            Self::DesignReview => Some(Self::DesignReady),
            Self::DesignReady => Some(Self::Plan),
            Self::Plan => Some(Self::PlanReview),
            Self::PlanReview => Some(Self::PlanReady),
            Self::PlanReady => Some(Self::Work),
            Self::Work => Some(Self::WorkReview),
            Self::WorkReview => Some(Self::WorkDone),
            Self::WorkDone => None,
        }
    }

    /// Working phase a reviewer sends a chore back to when rejecting it.
    ///
    /// Not part of the forward table; only review phases have one.
    #[must_use]
    pub const fn rejection_target(self) -> Option<Self> {
        match self {
            Self::DesignReview => Some(Self::Design),
            Self::PlanReview => Some(Self::Plan),
            Self::WorkReview => Some(Self::Work),
            _ => None,
        }
    }

    /// Validate a single forward step from `self` to `target`.
    ///
    /// Only the exact successor is accepted. Skips, reversals and no-ops are
    /// rejected; rejection back to a working phase goes through
    /// [`Phase::rejection_target`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] naming why `target` is not the successor.
    pub fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        if self == target {
            return Err(InvalidTransition {
                from: self,
                to: target,
                reason: "no-op transition is not allowed",
            });
        }

        match self.next() {
            Some(next) if next == target => Ok(()),
            None => Err(InvalidTransition {
                from: self,
                to: target,
                reason: "work_done is terminal",
            }),
            Some(_) if target < self => Err(InvalidTransition {
                from: self,
                to: target,
                reason: "phases only move forward",
            }),
            Some(_) => Err(InvalidTransition {
                from: self,
                to: target,
                reason: "phases cannot be skipped",
            }),
        }
    }
}

/// Error returned when a phase transition is not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: Phase,
    pub to: Phase,
    pub reason: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.reason)
    }
}

impl std::error::Error for InvalidTransition {}

/// Error returned when parsing a phase from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePhaseError {
    pub got: String,
}

impl fmt::Display for ParsePhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid phase: '{}'", self.got)
    }
}

impl std::error::Error for ParsePhaseError {}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == normalized)
            .ok_or_else(|| ParsePhaseError { got: s.to_string() })
    }
}
