//! Order model shared by the order pool and the order engines.
//!
//! Contains the order state set, reject reasons, the replace mask, order
//! options, the ticket an engine receives on creation, and the asynchronous
//! confirmations an engine sends back.

use crate::model::identity::InstrumentId;
use crate::model::types::{Price, Qty};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire code of the side ('1' buy, '2' sell).
    pub fn code(self) -> u8 {
        match self {
            Side::Buy => b'1',
            Side::Sell => b'2',
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'1' => Some(Side::Buy),
            b'2' => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Life-cycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    Initial = 0,
    Active = 1,
    Destroyed = 2,
    Canceled = 3,
    Rejected = 4,
    Filled = 5,
    Expired = 6,
    AwaitingActive = 7,
    AwaitingDestroy = 8,
    AwaitingCancel = 9,
    AwaitingReplace = 10,
}

impl OrderState {
    /// True if the order has a live exchange-facing representation and may
    /// still receive fills or confirmations.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            OrderState::Active
                | OrderState::AwaitingActive
                | OrderState::AwaitingCancel
                | OrderState::AwaitingReplace
                | OrderState::AwaitingDestroy
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Canceled
                | OrderState::Rejected
                | OrderState::Filled
                | OrderState::Expired
                | OrderState::Destroyed
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            OrderState::Initial => "initial",
            OrderState::Active => "active",
            OrderState::Destroyed => "destroyed",
            OrderState::Canceled => "canceled",
            OrderState::Rejected => "rejected",
            OrderState::Filled => "filled",
            OrderState::Expired => "expired",
            OrderState::AwaitingActive => "awaiting_active",
            OrderState::AwaitingDestroy => "awaiting_destroy",
            OrderState::AwaitingCancel => "awaiting_cancel",
            OrderState::AwaitingReplace => "awaiting_replace",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reason attached to a reject confirmation. Passed to hooks verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejReason {
    Other = 1,
    TooLate = 2,
    UnknownInstr = 3,
    Duplicate = 4,
    ExceedLimit = 5,
    ExchClosed = 6,
    BrokerOpt = 7,
    WrongAccount = 8,
    AlreadyInPending = 9,
    Unknown = 10,
    InternalError = 11,
    TranLimit = 12,
    Removed = 13,
    Guard = 14,
}

impl RejReason {
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => RejReason::TooLate,
            3 => RejReason::UnknownInstr,
            4 => RejReason::Duplicate,
            5 => RejReason::ExceedLimit,
            6 => RejReason::ExchClosed,
            7 => RejReason::BrokerOpt,
            8 => RejReason::WrongAccount,
            9 => RejReason::AlreadyInPending,
            10 => RejReason::Unknown,
            11 => RejReason::InternalError,
            12 => RejReason::TranLimit,
            13 => RejReason::Removed,
            14 => RejReason::Guard,
            _ => RejReason::Other,
        }
    }
}

/// Bitmask of the fields a replace request changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplaceMask(u32);

impl ReplaceMask {
    pub const QTY: Self = Self(1);
    pub const PRICE: Self = Self(2);
    pub const EXT_REF: Self = Self(4);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

/// Policy knobs of the engine's cancel-retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderOption {
    MaxCancelAttempts(u32),
    CancelTimeoutMs(u32),
}

impl OrderOption {
    pub fn code(self) -> u32 {
        match self {
            OrderOption::MaxCancelAttempts(_) => 1,
            OrderOption::CancelTimeoutMs(_) => 2,
        }
    }

    pub fn value(self) -> u32 {
        match self {
            OrderOption::MaxCancelAttempts(value) | OrderOption::CancelTimeoutMs(value) => value,
        }
    }
}

/// Everything an engine needs to create its side of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub name: String,
    pub instr_id: InstrumentId,
    pub account: String,
    pub client_code: String,
    pub side: Side,
    pub qty: Qty,
    pub price: Price,
    pub ext_ref: String,
}

/// Fields changed by a replace. Absent fields keep their value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplaceRequest {
    pub qty: Option<Qty>,
    pub price: Option<Price>,
    pub ext_ref: Option<String>,
}

impl ReplaceRequest {
    pub fn qty(qty: Qty) -> Self {
        Self {
            qty: Some(qty),
            ..Default::default()
        }
    }

    pub fn price(price: Price) -> Self {
        Self {
            price: Some(price),
            ..Default::default()
        }
    }

    pub fn with_qty(mut self, qty: Qty) -> Self {
        self.qty = Some(qty);
        self
    }

    pub fn with_price(mut self, price: Price) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_ext_ref(mut self, ext_ref: impl Into<String>) -> Self {
        self.ext_ref = Some(ext_ref.into());
        self
    }

    /// Builds the mask of fields this request changes.
    pub fn mask(&self) -> ReplaceMask {
        let mut mask = ReplaceMask::default();
        if self.qty.is_some() {
            mask.insert(ReplaceMask::QTY);
        }
        if self.price.is_some() {
            mask.insert(ReplaceMask::PRICE);
        }
        if self.ext_ref.is_some() {
            mask.insert(ReplaceMask::EXT_REF);
        }
        mask
    }
}

/// Engine-side handle of an order.
///
/// Not `Clone`: the order owns it, and giving it back to
/// `OrderEngine::destroy` consumes it, so it is released exactly once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct OrderHandle(u64);

impl OrderHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Asynchronous confirmation kinds sent by an order engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEventKind {
    Activated,
    BeforeSend,
    Trade { qty: Qty, price: Price },
    Canceled,
    UnexpectedCanceled,
    Expired,
    Destroyed,
    Replaced,
    Rejected { reason: RejReason, text: String },
    CancelRejected { reason: RejReason, text: String },
    ReplaceRejected { reason: RejReason, text: String },
}

/// A confirmation addressed to an order by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub name: String,
    pub kind: OrderEventKind,
}

impl OrderEvent {
    pub fn new(name: impl Into<String>, kind: OrderEventKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn activated(name: impl Into<String>) -> Self {
        Self::new(name, OrderEventKind::Activated)
    }

    pub fn trade(name: impl Into<String>, qty: Qty, price: Price) -> Self {
        Self::new(name, OrderEventKind::Trade { qty, price })
    }

    pub fn canceled(name: impl Into<String>) -> Self {
        Self::new(name, OrderEventKind::Canceled)
    }

    pub fn replaced(name: impl Into<String>) -> Self {
        Self::new(name, OrderEventKind::Replaced)
    }

    pub fn destroyed(name: impl Into<String>) -> Self {
        Self::new(name, OrderEventKind::Destroyed)
    }

    pub fn rejected(name: impl Into<String>, reason: RejReason, text: impl Into<String>) -> Self {
        Self::new(
            name,
            OrderEventKind::Rejected {
                reason,
                text: text.into(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_and_terminal_sets_are_disjoint() {
        let all = [
            OrderState::Initial,
            OrderState::Active,
            OrderState::Destroyed,
            OrderState::Canceled,
            OrderState::Rejected,
            OrderState::Filled,
            OrderState::Expired,
            OrderState::AwaitingActive,
            OrderState::AwaitingDestroy,
            OrderState::AwaitingCancel,
            OrderState::AwaitingReplace,
        ];
        for state in all {
            assert!(!(state.is_active() && state.is_terminal()), "{}", state);
        }
        assert!(!OrderState::Initial.is_active());
        assert!(!OrderState::Initial.is_terminal());
        assert!(OrderState::AwaitingDestroy.is_active());
    }

    #[test]
    fn test_replace_mask_from_request() {
        assert!(ReplaceRequest::default().mask().is_empty());
        let mask = ReplaceRequest::qty(5).with_ext_ref("x").mask();
        assert!(mask.contains(ReplaceMask::QTY));
        assert!(!mask.contains(ReplaceMask::PRICE));
        assert_eq!(mask.bits(), 5);
    }

    #[test]
    fn test_side_codes() {
        assert_eq!(Side::from_code(Side::Sell.code()), Some(Side::Sell));
        assert_eq!(Side::from_code(b'0'), None);
        assert_eq!(RejReason::from_code(99), RejReason::Other);
    }
}
