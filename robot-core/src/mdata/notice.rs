use robot::{
    BookSnapshot, CommonInfoSnapshot, Errno, FeedState, Instrument, InstrumentId, QuoteSnapshot,
    SubscriptionId, SubscriptionMask, TradeSnapshot,
};

/// A market-data event resolved against the instrument db.
///
/// Data notices carry the instrument the update is for; subscription-level
/// notices carry `None` for the market-wide channel.
#[derive(Debug, Clone, PartialEq)]
pub enum MdataNotice {
    Heartbeat,
    Book {
        instrument: Instrument,
        book: BookSnapshot,
    },
    Trade {
        instrument: Instrument,
        trade: TradeSnapshot,
    },
    Quote {
        instrument: Instrument,
        quote: QuoteSnapshot,
    },
    CommonInfo {
        instrument: Instrument,
        info: CommonInfoSnapshot,
    },
    /// The feed announced the id it uses for an alias.
    Symbol {
        instr_id: InstrumentId,
        alias: String,
    },
    SubscribeResult {
        /// The request this result answers, if it was made by this engine.
        subscription: Option<SubscriptionId>,
        instrument: Option<Instrument>,
        mask: SubscriptionMask,
        error: Errno,
    },
    FeedState {
        instrument: Option<Instrument>,
        mask: SubscriptionMask,
        state: FeedState,
    },
    Connected,
    Disconnected,
    /// A peer asks this node to resolve an alias.
    Resolve {
        alias: String,
        instrument: Option<Instrument>,
    },
    /// A peer subscribes to data this node publishes.
    Subscribe {
        instrument: Option<Instrument>,
        mask: SubscriptionMask,
    },
}
