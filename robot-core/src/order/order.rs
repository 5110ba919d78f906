use robot::{
    Instrument, OrderEventKind, OrderState, OrderTicket, Price, Qty, ReplaceRequest, Side,
};
use std::fmt;

/// Parameters of a new order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub name: String,
    pub alias: String,
    pub account: String,
    pub side: Side,
    pub qty: Qty,
    pub price: Price,
    pub client_code: String,
    pub ext_ref: String,
}

impl NewOrder {
    pub fn new(
        name: impl Into<String>,
        alias: impl Into<String>,
        account: impl Into<String>,
        side: Side,
        qty: Qty,
        price: Price,
    ) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            account: account.into(),
            side,
            qty,
            price,
            client_code: String::new(),
            ext_ref: String::new(),
        }
    }

    pub fn client_code(mut self, client_code: impl Into<String>) -> Self {
        self.client_code = client_code.into();
        self
    }

    pub fn ext_ref(mut self, ext_ref: impl Into<String>) -> Self {
        self.ext_ref = ext_ref.into();
        self
    }
}

/// Pool-side state of one order.
///
/// The engine handle is held by the pool next to the order, so an `Order`
/// can be cloned freely into notices.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    name: String,
    instrument: Instrument,
    account: String,
    client_code: String,
    ext_ref: String,
    side: Side,
    qty: Qty,
    price: Price,
    state: OrderState,
    prev_state: OrderState,
    total_qty: Qty,
    avg_price: Price,
    canceled_by_exchange: bool,
    pending_replace: Option<ReplaceRequest>,
}

impl Order {
    pub(crate) fn new(request: NewOrder, instrument: Instrument) -> Self {
        Self {
            name: request.name,
            instrument,
            account: request.account,
            client_code: request.client_code,
            ext_ref: request.ext_ref,
            side: request.side,
            qty: request.qty,
            price: request.price,
            state: OrderState::Initial,
            prev_state: OrderState::Initial,
            total_qty: 0,
            avg_price: 0.0,
            canceled_by_exchange: false,
            pending_replace: None,
        }
    }

    pub(crate) fn ticket(&self) -> OrderTicket {
        OrderTicket {
            name: self.name.clone(),
            instr_id: self.instrument.get_id(),
            account: self.account.clone(),
            client_code: self.client_code.clone(),
            side: self.side,
            qty: self.qty,
            price: self.price,
            ext_ref: self.ext_ref.clone(),
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn get_account(&self) -> &str {
        &self.account
    }

    pub fn get_client_code(&self) -> &str {
        &self.client_code
    }

    pub fn get_ext_ref(&self) -> &str {
        &self.ext_ref
    }

    pub fn get_side(&self) -> Side {
        self.side
    }

    pub fn get_qty(&self) -> Qty {
        self.qty
    }

    pub fn get_price(&self) -> Price {
        self.price
    }

    pub fn get_state(&self) -> OrderState {
        self.state
    }

    /// Filled quantity so far.
    pub fn get_total_qty(&self) -> Qty {
        self.total_qty
    }

    /// Volume-weighted price of the fills so far.
    pub fn get_avg_price(&self) -> Price {
        self.avg_price
    }

    pub fn leaves_qty(&self) -> Qty {
        self.qty - self.total_qty
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// True if the exchange canceled the order on its own.
    pub fn is_canceled_by_exchange(&self) -> bool {
        self.canceled_by_exchange
    }

    pub(crate) fn transition(&mut self, state: OrderState) {
        self.prev_state = self.state;
        self.state = state;
    }

    pub(crate) fn set_pending_replace(&mut self, request: ReplaceRequest) {
        self.pending_replace = Some(request);
        self.transition(OrderState::AwaitingReplace);
    }

    /// Applies an engine confirmation.
    pub(crate) fn apply(&mut self, kind: &OrderEventKind) {
        match kind {
            OrderEventKind::BeforeSend => {}
            OrderEventKind::Activated => match self.state {
                OrderState::Initial | OrderState::AwaitingActive => {
                    self.transition(OrderState::Active)
                }
                // cancel or destroy requested before the activation arrived
                _ if self.prev_state == OrderState::AwaitingActive => {
                    self.prev_state = OrderState::Active
                }
                _ => {}
            },
            OrderEventKind::Trade { qty, price } => self.fill(*qty, *price),
            OrderEventKind::Canceled => self.transition(OrderState::Canceled),
            OrderEventKind::UnexpectedCanceled => {
                self.canceled_by_exchange = true;
                self.transition(OrderState::Canceled);
            }
            OrderEventKind::Expired => self.transition(OrderState::Expired),
            OrderEventKind::Destroyed => self.transition(OrderState::Destroyed),
            OrderEventKind::Replaced => {
                if let Some(request) = self.pending_replace.take() {
                    if let Some(qty) = request.qty {
                        self.qty = qty;
                    }
                    if let Some(price) = request.price {
                        self.price = price;
                    }
                    if let Some(ext_ref) = request.ext_ref {
                        self.ext_ref = ext_ref;
                    }
                }
                self.settle_replace();
            }
            OrderEventKind::Rejected { .. } => self.transition(OrderState::Rejected),
            OrderEventKind::CancelRejected { .. } => {
                if self.state == OrderState::AwaitingCancel {
                    self.state = self.prev_state;
                }
            }
            OrderEventKind::ReplaceRejected { .. } => {
                self.pending_replace = None;
                self.settle_replace();
            }
        }
    }

    /// Leaves `awaiting_replace`, also when a cancel or destroy request
    /// stacked on top of it and will restore the previous state later.
    fn settle_replace(&mut self) {
        if self.state == OrderState::AwaitingReplace {
            self.transition(OrderState::Active);
        } else if self.prev_state == OrderState::AwaitingReplace {
            self.prev_state = OrderState::Active;
        }
    }

    fn fill(&mut self, qty: Qty, price: Price) {
        let total = self.total_qty + qty;
        if total > 0 {
            self.avg_price =
                (self.avg_price * self.total_qty as Price + price * qty as Price) / total as Price;
        }
        self.total_qty = total;
        if self.leaves_qty() <= 0 && !self.is_terminal() {
            self.transition(OrderState::Filled);
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}@{} [{}] filled {}@{}",
            self.name,
            self.side,
            self.instrument.get_alias(),
            self.qty,
            self.price,
            self.state,
            self.total_qty,
            self.avg_price
        )
    }
}
