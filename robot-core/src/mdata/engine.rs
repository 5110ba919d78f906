use super::notice::MdataNotice;
use super::subscription::{Subscription, SubscriptionStatus};
use crate::config::Config;
use log::{debug, info, warn};
use robot::{
    BookSnapshot, CommonInfoSnapshot, Errno, Error, Instrument, InstrumentDB, InstrumentId,
    MarketDataTransport, MdataEvent, MdataMessage, QuoteSnapshot, Result, SubscriptionId,
    SubscriptionMask, TradeSnapshot,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Target name of market-wide subscriptions.
const ALL_INSTRUMENTS: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Started,
    Stopped,
    Destroyed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Created => "created",
            EngineState::Started => "started",
            EngineState::Stopped => "stopped",
            EngineState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// Last value seen per instrument and category.
#[derive(Debug, Default)]
struct LastValues {
    books: HashMap<InstrumentId, BookSnapshot>,
    quotes: HashMap<InstrumentId, QuoteSnapshot>,
    trades: HashMap<InstrumentId, TradeSnapshot>,
    common: HashMap<InstrumentId, CommonInfoSnapshot>,
}

/// Subscription bookkeeping and dispatch of one market-data transport.
///
/// Life cycle: `Created -> Started -> Stopped -> Destroyed`. Events are only
/// accepted while started.
pub struct MarketDataEngine {
    transport: Option<Box<dyn MarketDataTransport>>,
    state: EngineState,
    connected: bool,
    keep_last_values: bool,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    next_id: SubscriptionId,
    last: LastValues,
}

impl MarketDataEngine {
    /// Creates an engine over `transport`.
    ///
    /// # Arguments
    ///
    /// * `config` - The `mdata_engine` config element, if any. Its
    ///   `keep_last_values` attribute (default `true`) enables the last-value
    ///   caches.
    /// * `transport` - Feed connection.
    pub fn new(config: Option<&Config>, transport: Box<dyn MarketDataTransport>) -> Result<Self> {
        let keep_last_values = match config {
            Some(config) => config.get_attr_b_or("keep_last_values", true)?,
            None => true,
        };
        Ok(Self {
            transport: Some(transport),
            state: EngineState::Created,
            connected: false,
            keep_last_values,
            subscriptions: BTreeMap::new(),
            next_id: 0,
            last: LastValues::default(),
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// True between the transport's `Connected` and `Disconnected` events.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Connects the transport.
    ///
    /// # Returns
    ///
    /// * `Err(Error::ConnectFailed)` if the transport cannot connect or the
    ///   engine was destroyed.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            EngineState::Started => return Ok(()),
            EngineState::Destroyed => return Err(Error::ConnectFailed(Errno::WrongState)),
            EngineState::Created | EngineState::Stopped => {}
        }
        let transport = self
            .transport
            .as_mut()
            .ok_or(Error::ConnectFailed(Errno::NotConnected))?;
        transport.connect().map_err(Error::ConnectFailed)?;
        self.state = EngineState::Started;
        info!("market data started");
        Ok(())
    }

    /// Disconnects the transport. Stopping a non-started engine does nothing.
    pub fn stop(&mut self) {
        if self.state != EngineState::Started {
            return;
        }
        if let Some(transport) = self.transport.as_mut() {
            transport.disconnect();
        }
        self.connected = false;
        self.state = EngineState::Stopped;
        info!("market data stopped");
    }

    /// Stops the engine and drops the transport.
    pub fn destroy(&mut self) {
        self.stop();
        self.transport = None;
        self.state = EngineState::Destroyed;
    }

    /// Subscribes to `alias`, or to the market-wide channel with `None`.
    ///
    /// The request is recorded as pending until its `subscribe_result` arrives.
    ///
    /// # Returns
    ///
    /// * `Ok(SubscriptionId)` of the request.
    /// * `Err(Error::SubscribeFailed)` if the engine is stopped or destroyed,
    ///   the alias does not resolve, the mask selects no category, or the transport
    ///   refuses.
    pub fn subscribe(
        &mut self,
        instruments: &InstrumentDB,
        alias: Option<&str>,
        mask: SubscriptionMask,
    ) -> Result<SubscriptionId> {
        let target = alias.unwrap_or(ALL_INSTRUMENTS).to_string();
        let failed = |errno: Errno| Error::SubscribeFailed {
            target: target.clone(),
            errno,
        };
        if matches!(self.state, EngineState::Stopped | EngineState::Destroyed) {
            return Err(failed(Errno::WrongState));
        }
        if !mask.has_category() {
            return Err(failed(Errno::InvalidArg));
        }
        let instr_id = match alias {
            Some(alias) => Some(
                instruments
                    .get_by_alias(alias)
                    .ok_or_else(|| failed(Errno::NotFound))?
                    .get_id(),
            ),
            None => None,
        };
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| failed(Errno::NotConnected))?;
        transport.subscribe(instr_id, mask).map_err(failed)?;

        self.next_id += 1;
        let id = self.next_id;
        info!("subscribed {} to {} as #{}", mask, target, id);
        self.subscriptions.insert(
            id,
            Subscription {
                id,
                instr_id,
                target,
                mask,
                status: SubscriptionStatus::Pending,
            },
        );
        Ok(id)
    }

    /// Drops every subscription of `alias` (or of the market-wide channel).
    ///
    /// # Returns
    ///
    /// The number of dropped subscriptions.
    pub fn unsubscribe(&mut self, instruments: &InstrumentDB, alias: Option<&str>) -> Result<usize> {
        let instr_id = match alias {
            Some(alias) => Some(
                instruments
                    .get_by_alias(alias)
                    .ok_or_else(|| Error::NotFound(format!("instrument '{}'", alias)))?
                    .get_id(),
            ),
            None => None,
        };
        let ids: Vec<SubscriptionId> = self
            .subscriptions
            .values()
            .filter(|subscription| subscription.instr_id == instr_id)
            .map(|subscription| subscription.id)
            .collect();

        for id in &ids {
            if let Some(subscription) = self.subscriptions.remove(id) {
                if let Some(transport) = self.transport.as_mut() {
                    if let Err(errno) = transport.unsubscribe(instr_id, subscription.mask) {
                        warn!("unsubscribe of #{} failed: {}", id, errno);
                    }
                }
            }
        }
        Ok(ids.len())
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.values()
    }

    pub fn get_subscription(&self, id: SubscriptionId) -> Option<&Subscription> {
        self.subscriptions.get(&id)
    }

    /// Publishes an outbound message. Does nothing once the engine is destroyed.
    pub fn send(&mut self, message: &MdataMessage) -> Result<()> {
        match self.transport.as_mut() {
            Some(transport) => transport.publish(message).map_err(|errno| Error::SendFailed {
                name: format!("{:?} message", message.proto_type()),
                errno,
            }),
            None => {
                debug!("no transport, {:?} message dropped", message.proto_type());
                Ok(())
            }
        }
    }

    pub fn get_book(&self, instr_id: InstrumentId) -> Option<&BookSnapshot> {
        self.last.books.get(&instr_id)
    }

    pub fn get_quote(&self, instr_id: InstrumentId) -> Option<&QuoteSnapshot> {
        self.last.quotes.get(&instr_id)
    }

    pub fn get_trade(&self, instr_id: InstrumentId) -> Option<&TradeSnapshot> {
        self.last.trades.get(&instr_id)
    }

    pub fn get_common_info(&self, instr_id: InstrumentId) -> Option<&CommonInfoSnapshot> {
        self.last.common.get(&instr_id)
    }

    /// Applies a transport event.
    ///
    /// Returns the notice to dispatch, or `None` when the event is dropped:
    /// the engine is not started, or the data is for an unknown instrument.
    pub fn apply(&mut self, instruments: &InstrumentDB, event: MdataEvent) -> Option<MdataNotice> {
        if self.state != EngineState::Started {
            debug!("engine {}, {:?} dropped", self.state, event.proto_type());
            return None;
        }
        let notice = match event {
            MdataEvent::Heartbeat => MdataNotice::Heartbeat,
            MdataEvent::Book(book) => {
                let instrument = known(instruments, book.instr_id, "book")?;
                if self.keep_last_values {
                    self.last.books.insert(book.instr_id, book.clone());
                }
                MdataNotice::Book { instrument, book }
            }
            MdataEvent::Trade(trade) => {
                let instrument = known(instruments, trade.instr_id, "trade")?;
                if self.keep_last_values {
                    self.last.trades.insert(trade.instr_id, trade.clone());
                }
                MdataNotice::Trade { instrument, trade }
            }
            MdataEvent::Quote(quote) => {
                let instrument = known(instruments, quote.instr_id, "quote")?;
                if self.keep_last_values {
                    self.last.quotes.insert(quote.instr_id, quote.clone());
                }
                MdataNotice::Quote { instrument, quote }
            }
            MdataEvent::CommonInfo(info) => {
                let instrument = known(instruments, info.instr_id, "common info")?;
                if self.keep_last_values {
                    self.last.common.insert(info.instr_id, info.clone());
                }
                MdataNotice::CommonInfo { instrument, info }
            }
            MdataEvent::Symbol { instr_id, alias } => MdataNotice::Symbol { instr_id, alias },
            MdataEvent::SubscribeResult {
                instr_id,
                mask,
                error,
            } => {
                let instr_id = channel(instr_id);
                let error = Errno::from_code(error);
                let subscription = self.resolve_subscription(instr_id, mask, error);
                MdataNotice::SubscribeResult {
                    subscription,
                    instrument: instr_id.and_then(|id| instruments.get_by_id(id).cloned()),
                    mask,
                    error,
                }
            }
            MdataEvent::FeedState {
                instr_id,
                mask,
                state,
            } => {
                debug!("feed state {:?} for {} on {}", state, mask, instr_id);
                MdataNotice::FeedState {
                    instrument: channel(instr_id).and_then(|id| instruments.get_by_id(id).cloned()),
                    mask,
                    state,
                }
            }
            MdataEvent::Connected => {
                self.connected = true;
                info!("market data connected");
                MdataNotice::Connected
            }
            MdataEvent::Disconnected => {
                self.connected = false;
                warn!("market data disconnected");
                MdataNotice::Disconnected
            }
            MdataEvent::Resolve { alias } => {
                let instrument = instruments.get_by_alias(&alias).cloned();
                MdataNotice::Resolve { alias, instrument }
            }
            MdataEvent::Subscribe { instr_id, mask } => {
                let instrument = match channel(instr_id) {
                    Some(id) => Some(known(instruments, id, "subscribe")?),
                    None => None,
                };
                MdataNotice::Subscribe { instrument, mask }
            }
        };
        Some(notice)
    }

    /// Marks the oldest pending request matching the result.
    fn resolve_subscription(
        &mut self,
        instr_id: Option<InstrumentId>,
        mask: SubscriptionMask,
        error: Errno,
    ) -> Option<SubscriptionId> {
        let subscription = self.subscriptions.values_mut().find(|subscription| {
            subscription.status == SubscriptionStatus::Pending && subscription.answers(instr_id, mask)
        })?;
        subscription.status = if error.is_ok() {
            SubscriptionStatus::Active
        } else {
            warn!("subscription #{} to {} failed: {}", subscription.id, subscription.target, error);
            SubscriptionStatus::Failed(error)
        };
        Some(subscription.id)
    }
}

impl Drop for MarketDataEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Maps the wire convention `0 = market-wide` to `None`.
fn channel(instr_id: InstrumentId) -> Option<InstrumentId> {
    (instr_id != 0).then_some(instr_id)
}

fn known(instruments: &InstrumentDB, instr_id: InstrumentId, what: &str) -> Option<Instrument> {
    let instrument = instruments.get_by_id(instr_id).cloned();
    if instrument.is_none() {
        warn!("{} for unknown instrument {} dropped", what, instr_id);
    }
    instrument
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, TransportCall};
    use robot::{FeedState, Side};
    use serde_json::json;

    fn instruments() -> InstrumentDB {
        let mut db = InstrumentDB::new();
        db.add("SBER", "SBER", "Sberbank", "EQ").unwrap();
        db
    }

    fn started(transport: ScriptedTransport) -> MarketDataEngine {
        let mut engine = MarketDataEngine::new(None, Box::new(transport)).unwrap();
        engine.start().unwrap();
        engine
    }

    fn book_mask() -> SubscriptionMask {
        SubscriptionMask::BOOK | SubscriptionMask::SNAPSHOT
    }

    #[test]
    fn test_life_cycle() {
        let transport = ScriptedTransport::new();
        let mut engine = MarketDataEngine::new(None, Box::new(transport.clone())).unwrap();
        assert_eq!(engine.state(), EngineState::Created);

        engine.start().unwrap();
        engine.start().unwrap();
        engine.stop();
        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);

        engine.destroy();
        assert!(matches!(
            engine.start(),
            Err(Error::ConnectFailed(Errno::WrongState))
        ));
        assert_eq!(
            transport.calls(),
            vec![TransportCall::Connect, TransportCall::Disconnect]
        );
    }

    #[test]
    fn test_start_fails_without_connection() {
        let mut engine = MarketDataEngine::new(
            None,
            Box::new(ScriptedTransport::failing_connect(Errno::NotConnected)),
        )
        .unwrap();
        assert!(matches!(
            engine.start(),
            Err(Error::ConnectFailed(Errno::NotConnected))
        ));
        assert_eq!(engine.state(), EngineState::Created);
    }

    #[test]
    fn test_subscribe_result_activates_subscription() {
        let db = instruments();
        let transport = ScriptedTransport::new();
        let mut engine = started(transport.clone());
        let sber = db.get_by_alias("SBER").unwrap().get_id();

        let id = engine.subscribe(&db, Some("SBER"), book_mask()).unwrap();
        assert_eq!(
            engine.get_subscription(id).unwrap().get_status(),
            SubscriptionStatus::Pending
        );
        assert!(transport
            .calls()
            .contains(&TransportCall::Subscribe(Some(sber), book_mask())));

        let notice = engine
            .apply(
                &db,
                MdataEvent::SubscribeResult {
                    instr_id: sber,
                    mask: book_mask(),
                    error: 0,
                },
            )
            .unwrap();
        match notice {
            MdataNotice::SubscribeResult {
                subscription,
                instrument,
                error,
                ..
            } => {
                assert_eq!(subscription, Some(id));
                assert_eq!(instrument.unwrap().get_alias(), "SBER");
                assert!(error.is_ok());
            }
            other => panic!("unexpected notice {:?}", other),
        }
        assert_eq!(
            engine.get_subscription(id).unwrap().get_status(),
            SubscriptionStatus::Active
        );
    }

    #[test]
    fn test_failed_subscribe_result() {
        let db = instruments();
        let mut engine = started(ScriptedTransport::new());
        let id = engine.subscribe(&db, None, SubscriptionMask::TRADE).unwrap();

        engine.apply(
            &db,
            MdataEvent::SubscribeResult {
                instr_id: 0,
                mask: SubscriptionMask::TRADE,
                error: Errno::NotFound.code(),
            },
        );
        let subscription = engine.get_subscription(id).unwrap();
        assert_eq!(subscription.get_status(), SubscriptionStatus::Failed(Errno::NotFound));
        assert_eq!(subscription.get_target(), "*");
    }

    #[test]
    fn test_subscribe_failures() {
        let db = instruments();
        let mut engine = started(ScriptedTransport::new());
        assert!(matches!(
            engine.subscribe(&db, Some("LKOH"), book_mask()),
            Err(Error::SubscribeFailed {
                errno: Errno::NotFound,
                ..
            })
        ));
        assert!(matches!(
            engine.subscribe(&db, Some("SBER"), SubscriptionMask::SNAPSHOT),
            Err(Error::SubscribeFailed {
                errno: Errno::InvalidArg,
                ..
            })
        ));

        let mut refusing = started(ScriptedTransport::failing_subscribe(Errno::Busy));
        assert!(matches!(
            refusing.subscribe(&db, Some("SBER"), book_mask()),
            Err(Error::SubscribeFailed {
                errno: Errno::Busy,
                ..
            })
        ));
        assert_eq!(refusing.subscriptions().count(), 0);

        let mut stopped = started(ScriptedTransport::new());
        stopped.stop();
        assert!(matches!(
            stopped.subscribe(&db, Some("SBER"), book_mask()),
            Err(Error::SubscribeFailed {
                errno: Errno::WrongState,
                ..
            })
        ));
    }

    #[test]
    fn test_subscribe_before_start() {
        let db = instruments();
        let transport = ScriptedTransport::new();
        let mut engine = MarketDataEngine::new(None, Box::new(transport.clone())).unwrap();

        let id = engine.subscribe(&db, Some("SBER"), book_mask()).unwrap();
        assert_eq!(
            engine.get_subscription(id).unwrap().get_status(),
            SubscriptionStatus::Pending
        );
        engine.start().unwrap();

        let sber = db.get_by_alias("SBER").unwrap().get_id();
        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::Subscribe(Some(sber), book_mask()),
                TransportCall::Connect
            ]
        );
    }

    #[test]
    fn test_data_is_resolved_and_cached() {
        let db = instruments();
        let mut engine = started(ScriptedTransport::new());
        let sber = db.get_by_alias("SBER").unwrap().get_id();

        let mut book = BookSnapshot::new(sber);
        book.set_bid(0, 250.4, 10).unwrap();
        book.set_ask(0, 250.6, 5).unwrap();
        match engine.apply(&db, MdataEvent::Book(book.clone())).unwrap() {
            MdataNotice::Book { instrument, book } => {
                assert_eq!(instrument.get_id(), sber);
                assert_eq!(book.best_bid().unwrap().price, 250.4);
            }
            other => panic!("unexpected notice {:?}", other),
        }
        assert_eq!(engine.get_book(sber), Some(&book));

        engine.apply(&db, MdataEvent::Trade(TradeSnapshot::new(sber, 250.5, 3, Side::Buy)));
        assert_eq!(engine.get_trade(sber).unwrap().qty, 3);

        assert!(engine
            .apply(&db, MdataEvent::Book(BookSnapshot::new(999)))
            .is_none());
        assert!(engine.get_book(999).is_none());
    }

    #[test]
    fn test_events_dropped_unless_started() {
        let db = instruments();
        let mut engine = MarketDataEngine::new(None, Box::new(ScriptedTransport::new())).unwrap();
        assert!(engine.apply(&db, MdataEvent::Heartbeat).is_none());

        engine.start().unwrap();
        assert_eq!(engine.apply(&db, MdataEvent::Connected), Some(MdataNotice::Connected));
        assert!(engine.is_connected());
        engine.stop();
        assert!(!engine.is_connected());
        assert!(engine.apply(&db, MdataEvent::Heartbeat).is_none());
    }

    #[test]
    fn test_feed_state_and_server_side_requests() {
        let db = instruments();
        let mut engine = started(ScriptedTransport::new());
        let sber = db.get_by_alias("SBER").unwrap().get_id();

        let notice = engine.apply(
            &db,
            MdataEvent::FeedState {
                instr_id: 0,
                mask: SubscriptionMask::QUOTE,
                state: FeedState::Unavailable,
            },
        );
        assert_eq!(
            notice,
            Some(MdataNotice::FeedState {
                instrument: None,
                mask: SubscriptionMask::QUOTE,
                state: FeedState::Unavailable,
            })
        );

        match engine.apply(&db, MdataEvent::Resolve { alias: "SBER".into() }) {
            Some(MdataNotice::Resolve { instrument, .. }) => {
                assert_eq!(instrument.unwrap().get_id(), sber)
            }
            other => panic!("unexpected notice {:?}", other),
        }
        assert!(engine
            .apply(
                &db,
                MdataEvent::Subscribe {
                    instr_id: 42,
                    mask: SubscriptionMask::BOOK
                }
            )
            .is_none());
    }

    #[test]
    fn test_unsubscribe_and_publish() {
        let db = instruments();
        let transport = ScriptedTransport::new();
        let mut engine = started(transport.clone());
        engine.subscribe(&db, Some("SBER"), book_mask()).unwrap();
        engine.subscribe(&db, Some("SBER"), SubscriptionMask::TRADE).unwrap();
        engine.subscribe(&db, None, SubscriptionMask::COMMON).unwrap();

        assert_eq!(engine.unsubscribe(&db, Some("SBER")).unwrap(), 2);
        assert_eq!(engine.subscriptions().count(), 1);
        assert!(engine.unsubscribe(&db, Some("LKOH")).is_err());

        engine.send(&MdataMessage::Heartbeat).unwrap();
        assert_eq!(
            transport.calls().last(),
            Some(&TransportCall::Publish(MdataMessage::Heartbeat))
        );
        engine.destroy();
        engine.send(&MdataMessage::Heartbeat).unwrap();
    }

    #[test]
    fn test_last_values_can_be_disabled() {
        let db = instruments();
        let config = Config::from_value("mdata_engine", json!({ "keep_last_values": false })).unwrap();
        let mut engine =
            MarketDataEngine::new(Some(&config), Box::new(ScriptedTransport::new())).unwrap();
        engine.start().unwrap();
        let sber = db.get_by_alias("SBER").unwrap().get_id();

        assert!(engine.apply(&db, MdataEvent::Book(BookSnapshot::new(sber))).is_some());
        assert!(engine.get_book(sber).is_none());
    }
}
