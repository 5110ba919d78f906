use robot::{Errno, InstrumentId, SubscriptionId, SubscriptionMask};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubscriptionStatus {
    /// Requested, no `subscribe_result` yet.
    Pending,
    Active,
    Failed(Errno),
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionStatus::Pending => f.write_str("pending"),
            SubscriptionStatus::Active => f.write_str("active"),
            SubscriptionStatus::Failed(errno) => write!(f, "failed: {}", errno),
        }
    }
}

/// One subscribe request and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    pub(crate) id: SubscriptionId,
    /// `None` for the market-wide channel.
    pub(crate) instr_id: Option<InstrumentId>,
    pub(crate) target: String,
    pub(crate) mask: SubscriptionMask,
    pub(crate) status: SubscriptionStatus,
}

impl Subscription {
    pub fn get_id(&self) -> SubscriptionId {
        self.id
    }

    pub fn get_instr_id(&self) -> Option<InstrumentId> {
        self.instr_id
    }

    /// Alias the subscription was made for, `*` for the market-wide channel.
    pub fn get_target(&self) -> &str {
        &self.target
    }

    pub fn get_mask(&self) -> SubscriptionMask {
        self.mask
    }

    pub fn get_status(&self) -> SubscriptionStatus {
        self.status
    }

    /// True if a result for (`instr_id`, `mask`) answers this request.
    pub(crate) fn answers(&self, instr_id: Option<InstrumentId>, mask: SubscriptionMask) -> bool {
        self.instr_id == instr_id && self.mask == mask
    }
}
