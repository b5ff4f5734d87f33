//! Which actions the dashboard offers for an order or an account, given its
//! current status.
//!
//! The backend owns the real state machines and validates every transition;
//! these functions only decide which buttons a page renders.

use serde::Serialize;

use crate::structs::{OrderStatus, VerificationStatus};

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Assigned,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Assigned => "assigned",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Option<OrderStatus> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Assigned => "Driver assigned",
            OrderStatus::OutForDelivery => "Out for delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Unknown => "Unknown",
        }
    }

    /// The single forward step out of this status, if any.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Assigned),
            OrderStatus::Assigned => Some(OrderStatus::OutForDelivery),
            OrderStatus::OutForDelivery => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Unknown => None,
        }
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Drivers can be (re)assigned until the order is closed.
    pub fn accepts_driver(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending
                | OrderStatus::Confirmed
                | OrderStatus::Assigned
                | OrderStatus::OutForDelivery
        )
    }

    /// Buttons for this status: the forward step first, then cancellation.
    pub fn actions(&self) -> Vec<OrderAction> {
        let mut actions = Vec::new();
        if let Some(target) = self.next() {
            actions.push(OrderAction::advance(*self, target));
        }
        if self.can_cancel() {
            actions.push(OrderAction::cancel());
        }
        actions
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OrderAction {
    pub target: OrderStatus,
    pub label: &'static str,
    pub confirm: &'static str,
    pub destructive: bool,
}

impl OrderAction {
    fn advance(from: OrderStatus, target: OrderStatus) -> Self {
        let (label, confirm) = match from {
            OrderStatus::Pending => (
                "Confirm order and start preparing",
                "Confirm this order?",
            ),
            OrderStatus::Confirmed => (
                "Send driver for pickup",
                "Mark this order as assigned to its driver?",
            ),
            OrderStatus::Assigned => (
                "Start delivery",
                "Mark this order as out for delivery?",
            ),
            _ => (
                "Confirm delivery completed",
                "Mark this order as delivered?",
            ),
        };
        OrderAction {
            target,
            label,
            confirm,
            destructive: false,
        }
    }

    fn cancel() -> Self {
        OrderAction {
            target: OrderStatus::Cancelled,
            label: "Reject order",
            confirm: "Reject this order?",
            destructive: true,
        }
    }
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::PendingReview => "pending_review",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
            VerificationStatus::Suspended => "suspended",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VerificationStatus::PendingReview => "Under review",
            VerificationStatus::Verified => "Verified",
            VerificationStatus::Rejected => "Rejected",
            VerificationStatus::Suspended => "Suspended",
        }
    }

    pub fn actions(&self) -> Vec<AccountAction> {
        match self {
            VerificationStatus::PendingReview => vec![
                AccountAction {
                    target: VerificationStatus::Verified,
                    label: "Approve",
                    destructive: false,
                },
                AccountAction {
                    target: VerificationStatus::Rejected,
                    label: "Reject",
                    destructive: true,
                },
            ],
            VerificationStatus::Verified => vec![AccountAction {
                target: VerificationStatus::Suspended,
                label: "Suspend",
                destructive: true,
            }],
            VerificationStatus::Suspended => vec![AccountAction {
                target: VerificationStatus::Verified,
                label: "Reinstate",
                destructive: false,
            }],
            VerificationStatus::Rejected => Vec::new(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountAction {
    pub target: VerificationStatus,
    pub label: &'static str,
    pub destructive: bool,
}
