use super::order::{NewOrder, Order};
use log::{debug, info, warn};
use robot::{
    Errno, Error, InstrumentDB, NodeId, Object, OrderEngine, OrderEvent, OrderEventKind, OrderHandle,
    OrderOption, OrderState, ReplaceRequest, Result,
};
use std::collections::{BTreeMap, VecDeque};

/// An order confirmation after the pool applied it.
///
/// `order` is the state right after the confirmation; for `Destroyed` it is the
/// last state of an order the pool has already forgotten.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderNotice {
    pub order: Order,
    pub kind: OrderEventKind,
}

impl OrderNotice {
    pub fn name(&self) -> &str {
        self.order.get_name()
    }
}

struct Entry {
    order: Order,
    /// `None` once handed back to the engine by a non-forced destroy.
    handle: Option<OrderHandle>,
}

/// The orders of one node, keyed by unique name.
///
/// Requests go to the engine at once and move the order to the matching
/// `awaiting_*` state; the outcome arrives later through `apply`.
pub struct OrderPool {
    engine: Box<dyn OrderEngine>,
    orders: BTreeMap<String, Entry>,
    notices: VecDeque<OrderNotice>,
}

impl OrderPool {
    pub fn new(engine: Box<dyn OrderEngine>) -> Self {
        Self {
            engine,
            orders: BTreeMap::new(),
            notices: VecDeque::new(),
        }
    }

    /// Creates an order in state `initial`.
    ///
    /// # Returns
    ///
    /// * `Err(Error::AlreadyExists)` if the pool holds an order of that name.
    /// * `Err(Error::NotFound)` if the alias does not resolve.
    /// * `Err(Error::CreationFailed)` if the engine rejects the fields.
    pub fn create_order(&mut self, instruments: &InstrumentDB, request: NewOrder) -> Result<&Order> {
        if self.orders.contains_key(&request.name) {
            return Err(Error::AlreadyExists(format!("order '{}'", request.name)));
        }
        let instrument = instruments
            .get_by_alias(&request.alias)
            .ok_or_else(|| Error::NotFound(format!("instrument '{}'", request.alias)))?
            .clone();

        let order = Order::new(request, instrument);
        let handle = self
            .engine
            .create(&order.ticket())
            .map_err(|errno| Error::CreationFailed {
                what: format!("order '{}'", order.get_name()),
                errno,
            })?;
        debug!("order created: {}", order);

        let name = order.get_name().to_string();
        let entry = self.orders.entry(name).or_insert(Entry {
            order,
            handle: Some(handle),
        });
        Ok(&entry.order)
    }

    pub fn get_order(&self, name: &str) -> Option<&Order> {
        self.orders.get(name).map(|entry| &entry.order)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders in name order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().map(|entry| &entry.order)
    }

    /// Forwards a retry-policy option. Only accepted before the first `send`.
    pub fn set_option(&mut self, name: &str, option: OrderOption) -> Result<()> {
        let entry = lookup(&mut self.orders, name)?;
        expect_state(&entry.order, OrderState::Initial)?;
        let handle = live_handle(entry)?;
        self.engine
            .set_option(handle, option)
            .map_err(|errno| Error::CreationFailed {
                what: format!("option {:?} of order '{}'", option, name),
                errno,
            })
    }

    /// Submits an `initial` order; it moves to `awaiting_active`.
    ///
    /// # Returns
    ///
    /// * `Err(Error::WrongState)` if the order was already sent.
    /// * `Err(Error::SendFailed)` if the engine refuses; the order stays `initial`.
    pub fn send(&mut self, name: &str) -> Result<()> {
        let entry = lookup(&mut self.orders, name)?;
        expect_state(&entry.order, OrderState::Initial)?;
        let handle = live_handle(entry)?;
        self.engine
            .send(handle)
            .map_err(|errno| Error::SendFailed {
                name: name.to_string(),
                errno,
            })?;
        entry.order.transition(OrderState::AwaitingActive);
        info!("order sent: {}", entry.order);
        Ok(())
    }

    /// Requests a cancel of a live order; it moves to `awaiting_cancel`.
    ///
    /// Orders that are not live, or already being canceled or destroyed, are
    /// left alone and no request is made.
    pub fn cancel(&mut self, name: &str) -> Result<()> {
        let entry = lookup(&mut self.orders, name)?;
        let state = entry.order.get_state();
        if !state.is_active()
            || matches!(state, OrderState::AwaitingCancel | OrderState::AwaitingDestroy)
        {
            debug!("order '{}' is {}, cancel skipped", name, state);
            return Ok(());
        }
        let handle = live_handle(entry)?;
        self.engine
            .cancel(handle)
            .map_err(|errno| Error::CancelFailed {
                name: name.to_string(),
                errno,
            })?;
        entry.order.transition(OrderState::AwaitingCancel);
        info!("order cancel requested: {}", entry.order);
        Ok(())
    }

    /// Requests a replace of the fields set in `request`; the order moves to
    /// `awaiting_replace` and takes the new values on `Replaced`.
    ///
    /// A request without fields does nothing.
    pub fn replace(&mut self, name: &str, request: ReplaceRequest) -> Result<()> {
        let entry = lookup(&mut self.orders, name)?;
        if request.mask().is_empty() {
            debug!("order '{}' replace without fields skipped", name);
            return Ok(());
        }
        let failed = |errno: Errno| Error::ReplaceFailed {
            name: name.to_string(),
            errno,
        };
        if entry.order.get_state() != OrderState::Active {
            return Err(failed(Errno::WrongState));
        }
        let handle = live_handle(entry)?;
        self.engine.replace(handle, &request).map_err(failed)?;
        entry.order.set_pending_replace(request);
        info!("order replace requested: {}", entry.order);
        Ok(())
    }

    /// Releases the engine handle of an order.
    ///
    /// Without `force` the order moves to `awaiting_destroy` and is forgotten
    /// when the engine confirms with `Destroyed`; asking again meanwhile does
    /// nothing. With `force` the order is forgotten at once and a synthesized
    /// `Destroyed` notice is queued for `take_notices`.
    ///
    /// # Returns
    ///
    /// * `Err(Error::NotFound)` if the pool does not hold the order.
    /// * `Err(Error::DestroyFailed)` if the engine refuses. The handle is
    ///   consumed either way, so the order is forgotten without a notice.
    pub fn destroy(&mut self, name: &str, force: bool) -> Result<()> {
        let entry = lookup(&mut self.orders, name)?;
        if !force && entry.order.get_state() == OrderState::AwaitingDestroy {
            debug!("order '{}' destroy already requested", name);
            return Ok(());
        }

        let outcome = match entry.handle.take() {
            Some(handle) => self.engine.destroy(handle, force),
            None => Ok(()),
        };
        if let Err(errno) = outcome {
            self.orders.remove(name);
            return Err(Error::DestroyFailed {
                name: name.to_string(),
                errno,
            });
        }

        if force {
            if let Some(mut entry) = self.orders.remove(name) {
                entry.order.transition(OrderState::Destroyed);
                info!("order force destroyed: {}", entry.order);
                self.notices.push_back(OrderNotice {
                    order: entry.order,
                    kind: OrderEventKind::Destroyed,
                });
            }
        } else {
            entry.order.transition(OrderState::AwaitingDestroy);
            info!("order destroy requested: {}", entry.order);
        }
        Ok(())
    }

    /// Sends every `initial` order, stopping at the first failure.
    pub fn send_all(&mut self) -> Result<usize> {
        let names = self.names_where(|order| order.get_state() == OrderState::Initial);
        for name in &names {
            self.send(name)?;
        }
        Ok(names.len())
    }

    /// Cancels every live order, stopping at the first failure.
    pub fn cancel_all(&mut self) -> Result<usize> {
        let names = self.names_where(|order| {
            order.is_active()
                && !matches!(
                    order.get_state(),
                    OrderState::AwaitingCancel | OrderState::AwaitingDestroy
                )
        });
        for name in &names {
            self.cancel(name)?;
        }
        Ok(names.len())
    }

    /// Destroys every order. Failures are logged and skipped.
    ///
    /// # Returns
    ///
    /// The number of orders whose destroy was accepted.
    pub fn destroy_all(&mut self, force: bool) -> usize {
        let names = self.names_where(|_| true);
        let mut destroyed = 0;
        for name in names {
            match self.destroy(&name, force) {
                Ok(()) => destroyed += 1,
                Err(e) => warn!("destroy of order '{}' failed: {}", name, e),
            }
        }
        destroyed
    }

    /// Hands an unsolicited object from a peer node to the engine.
    pub fn process_node_object(&mut self, object: &Object, from: NodeId) {
        self.engine.on_node_object(object, from);
    }

    /// Applies an engine confirmation to the addressed order.
    ///
    /// Returns `None` for orders the pool does not hold (for instance after a
    /// forced destroy). A `Destroyed` confirmation removes the order.
    pub fn apply(&mut self, event: OrderEvent) -> Option<OrderNotice> {
        let Some(entry) = self.orders.get_mut(&event.name) else {
            debug!("confirmation {:?} for unknown order '{}'", event.kind, event.name);
            return None;
        };
        entry.order.apply(&event.kind);
        debug!("order {:?}: {}", event.kind, entry.order);

        let notice = OrderNotice {
            order: entry.order.clone(),
            kind: event.kind,
        };
        if notice.kind == OrderEventKind::Destroyed {
            self.orders.remove(&event.name);
            info!("order destroyed: {}", notice.order);
        }
        Some(notice)
    }

    /// Drains the notices synthesized by forced destroys.
    pub fn take_notices(&mut self) -> Vec<OrderNotice> {
        self.notices.drain(..).collect()
    }

    fn names_where(&self, predicate: impl Fn(&Order) -> bool) -> Vec<String> {
        self.orders
            .iter()
            .filter(|(_, entry)| predicate(&entry.order))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn lookup<'a>(orders: &'a mut BTreeMap<String, Entry>, name: &str) -> Result<&'a mut Entry> {
    orders
        .get_mut(name)
        .ok_or_else(|| Error::NotFound(format!("order '{}'", name)))
}

fn expect_state(order: &Order, state: OrderState) -> Result<()> {
    if order.get_state() == state {
        Ok(())
    } else {
        Err(Error::WrongState {
            what: format!("order '{}'", order.get_name()),
            state: order.get_state().to_string(),
        })
    }
}

fn live_handle(entry: &Entry) -> Result<&OrderHandle> {
    entry.handle.as_ref().ok_or_else(|| Error::WrongState {
        what: format!("order '{}'", entry.order.get_name()),
        state: entry.order.get_state().to_string(),
    })
}
