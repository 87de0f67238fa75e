// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Project lifecycle state machine.
//!
//! ```text
//!            AcceptBid           SetReady            Accept
//!   Open ──────────────▶ InWork ─────────▶ InReview ────────▶ Completed
//!                          │                  │
//!                          └──── Cancel ──────┴──────────────▶ Canceled
//! ```
//!
//! `Completed` and `Canceled` are terminal. Who may fire an event is decided
//! by the marketplace before the transition is looked up here.

use crate::models::ProjectStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectEvent {
    AcceptBid,
    SetReady,
    Accept,
    Cancel,
}

impl std::fmt::Display for ProjectEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProjectEvent::AcceptBid => "accept a bid",
            ProjectEvent::SetReady => "be set ready",
            ProjectEvent::Accept => "be accepted",
            ProjectEvent::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

impl ProjectStatus {
    /// Target state of `event`, or `None` if the event is not allowed here.
    pub fn transition(self, event: ProjectEvent) -> Option<ProjectStatus> {
        use ProjectEvent::*;
        use ProjectStatus::*;

        match (self, event) {
            (Open, AcceptBid) => Some(InWork),
            (InWork, SetReady) => Some(InReview),
            (InReview, Accept) => Some(Completed),
            (InWork | InReview, Cancel) => Some(Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [ProjectStatus; 5] = [
        ProjectStatus::Open,
        ProjectStatus::InWork,
        ProjectStatus::InReview,
        ProjectStatus::Completed,
        ProjectStatus::Canceled,
    ];

    const ALL_EVENTS: [ProjectEvent; 4] = [
        ProjectEvent::AcceptBid,
        ProjectEvent::SetReady,
        ProjectEvent::Accept,
        ProjectEvent::Cancel,
    ];

    #[test]
    fn allowed_transitions() {
        assert_eq!(
            ProjectStatus::Open.transition(ProjectEvent::AcceptBid),
            Some(ProjectStatus::InWork)
        );
        assert_eq!(
            ProjectStatus::InWork.transition(ProjectEvent::SetReady),
            Some(ProjectStatus::InReview)
        );
        assert_eq!(
            ProjectStatus::InReview.transition(ProjectEvent::Accept),
            Some(ProjectStatus::Completed)
        );
        assert_eq!(
            ProjectStatus::InWork.transition(ProjectEvent::Cancel),
            Some(ProjectStatus::Canceled)
        );
        assert_eq!(
            ProjectStatus::InReview.transition(ProjectEvent::Cancel),
            Some(ProjectStatus::Canceled)
        );
    }

    #[test]
    fn open_projects_cannot_be_canceled() {
        assert_eq!(ProjectStatus::Open.transition(ProjectEvent::Cancel), None);
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        for state in ALL_STATES.into_iter().filter(|s| s.is_terminal()) {
            for event in ALL_EVENTS {
                assert_eq!(state.transition(event), None, "{state} on {event:?}");
            }
        }
    }

    #[test]
    fn exactly_five_transitions_exist() {
        let count = ALL_STATES
            .iter()
            .flat_map(|s| ALL_EVENTS.iter().map(move |e| s.transition(*e)))
            .filter(Option::is_some)
            .count();
        assert_eq!(count, 5);
    }
}
