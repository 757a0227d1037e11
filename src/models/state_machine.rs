use super::PaymentStatus;

/// Shared transition table enforced by both the webhook path and the
/// reconciliation worker.
///
/// PENDING is the only non-terminal state. An attempted transition out of
/// a terminal state is legal-but-ignored: callers keep the current state
/// and treat the attempt as a duplicate resolution, which is what makes
/// the two resolution paths safe to race.
#[derive(Debug, Clone)]
pub struct PaymentStateMachine;

impl PaymentStateMachine {
    /// Returns valid next states from the current state.
    pub fn valid_transitions(current: PaymentStatus) -> Vec<PaymentStatus> {
        match current {
            PaymentStatus::Pending => vec![
                PaymentStatus::Accepted,
                PaymentStatus::Refused,
                PaymentStatus::Failed,
            ],
            PaymentStatus::Accepted | PaymentStatus::Refused | PaymentStatus::Failed => vec![],
        }
    }

    /// Checks if a transition is valid. PENDING -> PENDING is not a
    /// transition (callers treat it as an explicit no-op).
    pub fn can_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
        Self::valid_transitions(from).contains(&to)
    }
}
