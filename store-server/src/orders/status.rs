//! Order status state machine
//!
//! Happy path: pending → confirmed → processing → shipped → delivered.
//! pending may fail to payment_failed; pending/confirmed/processing may be
//! cancelled; delivered and cancelled may be refunded.

use crate::db::models::OrderStatus;

/// Whether `from → to` is a legal transition.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, PaymentFailed)
            | (Pending, Cancelled)
            | (Confirmed, Processing)
            | (Confirmed, Cancelled)
            | (Processing, Shipped)
            | (Processing, Cancelled)
            | (Shipped, Delivered)
            | (Delivered, Refunded)
            | (Cancelled, Refunded)
    )
}

/// States a cancellation request is accepted from.
pub fn cancellable(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
    )
}

/// States with no outgoing transition.
pub fn is_terminal(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::PaymentFailed | OrderStatus::Refunded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    const ALL: [OrderStatus; 8] = [
        Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded, PaymentFailed,
    ];

    #[test]
    fn happy_path_is_legal() {
        assert!(can_transition(Pending, Confirmed));
        assert!(can_transition(Confirmed, Processing));
        assert!(can_transition(Processing, Shipped));
        assert!(can_transition(Shipped, Delivered));
        assert!(can_transition(Delivered, Refunded));
    }

    #[test]
    fn cancellation_only_before_shipment() {
        assert!(can_transition(Pending, Cancelled));
        assert!(can_transition(Confirmed, Cancelled));
        assert!(can_transition(Processing, Cancelled));
        assert!(!can_transition(Shipped, Cancelled));
        assert!(!can_transition(Delivered, Cancelled));
        assert!(cancellable(Processing));
        assert!(!cancellable(Shipped));
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for status in ALL {
            assert!(!can_transition(PaymentFailed, status));
            assert!(!can_transition(Refunded, status));
        }
        assert!(is_terminal(PaymentFailed));
        assert!(is_terminal(Refunded));
        assert!(!is_terminal(Delivered));
    }

    #[test]
    fn no_skipping_forward() {
        assert!(!can_transition(Pending, Processing));
        assert!(!can_transition(Pending, Shipped));
        assert!(!can_transition(Confirmed, Delivered));
        assert!(!can_transition(Shipped, Refunded));
    }
}
