//! Market Data models.
//!
//! Fixed-shape snapshots (book, quote, trade, common info), the subscription
//! mask, and the events a feed transport delivers to a node.

use crate::error::{Error, Result};
use crate::model::identity::InstrumentId;
use crate::model::order::Side;
use crate::model::types::{Price, Qty, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Number of price levels carried by a book snapshot on each side.
pub const BOOK_DEPTH: usize = 20;

/// Message kinds of the market-data protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtoType {
    Heartbeat = 0,
    Resolve = 1,
    Subscribe = 2,
    Symbol = 3,
    Book = 4,
    Trade = 5,
    SubscribeResult = 6,
    FeedState = 7,
    Quote = 8,
    CommonInfo = 9,
}

/// Bitset selecting market-data categories and snapshot/stream mode.
///
/// `SNAPSHOT` and `UPDATES` qualify the category bits: one-shot snapshot,
/// continuous stream, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SubscriptionMask(u32);

impl SubscriptionMask {
    pub const BOOK: Self = Self(1);
    pub const TRADE: Self = Self(2);
    pub const QUOTE: Self = Self(4);
    pub const COMMON: Self = Self(8);
    pub const SNAPSHOT: Self = Self(16);
    pub const UPDATES: Self = Self(32);

    const NAMES: [(Self, &'static str); 6] = [
        (Self::BOOK, "book"),
        (Self::TRADE, "trade"),
        (Self::QUOTE, "quote"),
        (Self::COMMON, "common"),
        (Self::SNAPSHOT, "snapshot"),
        (Self::UPDATES, "updates"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & 0x3f)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if at least one data category (book, trade, quote, common) is selected.
    pub const fn has_category(self) -> bool {
        self.0 & 0x0f != 0
    }
}

impl BitOr for SubscriptionMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SubscriptionMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for SubscriptionMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for SubscriptionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join("|"))
    }
}

/// Connectivity state reported by a feed for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedState {
    Ok = 0,
    ConnectionFailed = 1,
    Unavailable = 2,
}

impl FeedState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(FeedState::Ok),
            1 => Some(FeedState::ConnectionFailed),
            2 => Some(FeedState::Unavailable),
            _ => None,
        }
    }
}

/// One price level of a book.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub qty: Qty,
}

impl BookLevel {
    pub fn new(price: Price, qty: Qty) -> Self {
        Self { price, qty }
    }

    /// An empty level has no quantity.
    pub fn is_empty(&self) -> bool {
        self.qty == 0
    }
}

/// Full book snapshot with `BOOK_DEPTH` levels per side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub instr_id: InstrumentId,
    asks: Vec<BookLevel>,
    bids: Vec<BookLevel>,
    pub exch_ts: Timestamp,
    pub ts: Timestamp,
}

impl BookSnapshot {
    /// Creates an empty book for the instrument.
    pub fn new(instr_id: InstrumentId) -> Self {
        Self {
            instr_id,
            asks: vec![BookLevel::default(); BOOK_DEPTH],
            bids: vec![BookLevel::default(); BOOK_DEPTH],
            exch_ts: 0,
            ts: 0,
        }
    }

    /// Returns the bid level at `idx` (0 is the best).
    pub fn get_bid(&self, idx: usize) -> Result<&BookLevel> {
        self.bids.get(idx).ok_or_else(|| level_out_of_range(idx))
    }

    /// Returns the ask level at `idx` (0 is the best).
    pub fn get_ask(&self, idx: usize) -> Result<&BookLevel> {
        self.asks.get(idx).ok_or_else(|| level_out_of_range(idx))
    }

    /// Sets the bid level at `idx`.
    ///
    /// # Returns
    ///
    /// * `Err(Error::InvalidArg)` if `idx` is not below `BOOK_DEPTH`.
    pub fn set_bid(&mut self, idx: usize, price: Price, qty: Qty) -> Result<()> {
        let level = self.bids.get_mut(idx).ok_or_else(|| level_out_of_range(idx))?;
        *level = BookLevel::new(price, qty);
        Ok(())
    }

    /// Sets the ask level at `idx`.
    pub fn set_ask(&mut self, idx: usize, price: Price, qty: Qty) -> Result<()> {
        let level = self.asks.get_mut(idx).ok_or_else(|| level_out_of_range(idx))?;
        *level = BookLevel::new(price, qty);
        Ok(())
    }

    pub fn bids(&self) -> &[BookLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[BookLevel] {
        &self.asks
    }

    /// Best bid, if the top level is populated.
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first().filter(|level| !level.is_empty())
    }

    /// Best ask, if the top level is populated.
    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first().filter(|level| !level.is_empty())
    }
}

fn level_out_of_range(idx: usize) -> Error {
    Error::InvalidArg(format!(
        "book level {} is out of range 0..{}",
        idx, BOOK_DEPTH
    ))
}

/// Best bid/ask snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub instr_id: InstrumentId,
    pub ask: BookLevel,
    pub bid: BookLevel,
    pub flag: u32,
    pub exch_ts: Timestamp,
    pub ts: Timestamp,
}

impl QuoteSnapshot {
    pub fn new(instr_id: InstrumentId) -> Self {
        Self {
            instr_id,
            ask: BookLevel::default(),
            bid: BookLevel::default(),
            flag: 0,
            exch_ts: 0,
            ts: 0,
        }
    }
}

/// A single print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSnapshot {
    pub instr_id: InstrumentId,
    pub price: Price,
    pub qty: Qty,
    pub side: Side,
    pub exch_ts: Timestamp,
    pub ts: Timestamp,
}

impl TradeSnapshot {
    pub fn new(instr_id: InstrumentId, price: Price, qty: Qty, side: Side) -> Self {
        Self {
            instr_id,
            price,
            qty,
            side,
            exch_ts: 0,
            ts: 0,
        }
    }
}

/// Presence flags of the `CommonInfoSnapshot` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommonInfoFlags(u32);

impl CommonInfoFlags {
    pub const OI: Self = Self(1);
    pub const MIN: Self = Self(2);
    pub const MAX: Self = Self(4);
    pub const OPEN: Self = Self(8);
    pub const HIGH: Self = Self(16);
    pub const LOW: Self = Self(32);
    pub const LAST: Self = Self(64);
    pub const VOLUME: Self = Self(128);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

/// Daily aggregate fields of an instrument.
///
/// Setters record which fields are present in `flags`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommonInfoSnapshot {
    pub instr_id: InstrumentId,
    pub flags: CommonInfoFlags,
    pub oi: f64,
    pub min: Price,
    pub max: Price,
    pub open: Price,
    pub close: Price,
    pub high: Price,
    pub low: Price,
    pub last: Price,
    pub volume: f64,
    pub exch_ts: Timestamp,
    pub ts: Timestamp,
}

impl CommonInfoSnapshot {
    pub fn new(instr_id: InstrumentId) -> Self {
        Self {
            instr_id,
            ..Default::default()
        }
    }

    pub fn set_oi(&mut self, oi: f64) {
        self.oi = oi;
        self.flags.insert(CommonInfoFlags::OI);
    }

    pub fn set_min(&mut self, price: Price) {
        self.min = price;
        self.flags.insert(CommonInfoFlags::MIN);
    }

    pub fn set_max(&mut self, price: Price) {
        self.max = price;
        self.flags.insert(CommonInfoFlags::MAX);
    }

    pub fn set_open(&mut self, price: Price) {
        self.open = price;
        self.flags.insert(CommonInfoFlags::OPEN);
    }

    pub fn set_high(&mut self, price: Price) {
        self.high = price;
        self.flags.insert(CommonInfoFlags::HIGH);
    }

    pub fn set_low(&mut self, price: Price) {
        self.low = price;
        self.flags.insert(CommonInfoFlags::LOW);
    }

    pub fn set_last(&mut self, price: Price) {
        self.last = price;
        self.flags.insert(CommonInfoFlags::LAST);
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
        self.flags.insert(CommonInfoFlags::VOLUME);
    }
}

/// Outbound message published by a node acting as a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MdataMessage {
    Heartbeat,
    Book(BookSnapshot),
    Trade(TradeSnapshot),
    Quote(QuoteSnapshot),
    CommonInfo(CommonInfoSnapshot),
}

impl MdataMessage {
    pub fn proto_type(&self) -> ProtoType {
        match self {
            MdataMessage::Heartbeat => ProtoType::Heartbeat,
            MdataMessage::Book(_) => ProtoType::Book,
            MdataMessage::Trade(_) => ProtoType::Trade,
            MdataMessage::Quote(_) => ProtoType::Quote,
            MdataMessage::CommonInfo(_) => ProtoType::CommonInfo,
        }
    }
}

/// Events a market-data transport delivers to the node event loop.
///
/// `instr_id == 0` in subscription-level events means "no instrument", i.e.
/// the market-wide channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MdataEvent {
    Heartbeat,
    Book(BookSnapshot),
    Trade(TradeSnapshot),
    Quote(QuoteSnapshot),
    CommonInfo(CommonInfoSnapshot),
    Symbol {
        instr_id: InstrumentId,
        alias: String,
    },
    SubscribeResult {
        instr_id: InstrumentId,
        mask: SubscriptionMask,
        error: i32,
    },
    FeedState {
        instr_id: InstrumentId,
        mask: SubscriptionMask,
        state: FeedState,
    },
    Connected,
    Disconnected,
    /// A peer asks this node to resolve an alias (server side).
    Resolve { alias: String },
    /// A peer subscribes to data published by this node (server side).
    Subscribe {
        instr_id: InstrumentId,
        mask: SubscriptionMask,
    },
}

impl MdataEvent {
    pub fn proto_type(&self) -> Option<ProtoType> {
        match self {
            MdataEvent::Heartbeat => Some(ProtoType::Heartbeat),
            MdataEvent::Book(_) => Some(ProtoType::Book),
            MdataEvent::Trade(_) => Some(ProtoType::Trade),
            MdataEvent::Quote(_) => Some(ProtoType::Quote),
            MdataEvent::CommonInfo(_) => Some(ProtoType::CommonInfo),
            MdataEvent::Symbol { .. } => Some(ProtoType::Symbol),
            MdataEvent::SubscribeResult { .. } => Some(ProtoType::SubscribeResult),
            MdataEvent::FeedState { .. } => Some(ProtoType::FeedState),
            MdataEvent::Resolve { .. } => Some(ProtoType::Resolve),
            MdataEvent::Subscribe { .. } => Some(ProtoType::Subscribe),
            MdataEvent::Connected | MdataEvent::Disconnected => None,
        }
    }
}
