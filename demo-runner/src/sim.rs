//! In-process stand-ins for an exchange and a market-data feed.

use log::{debug, info};
use parking_lot::Mutex;
use rand::Rng;
use robot::{
    BookSnapshot, Errno, EventSink, InstrumentId, MarketDataTransport, MdataEvent, MdataMessage,
    OrderEngine, OrderEvent, OrderHandle, OrderOption, OrderTicket, ReplaceRequest,
    SubscriptionMask,
};
use robot_core::EventSender;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const START_PRICE: f64 = 250.0;
const TICK: f64 = 0.01;

/// Order engine that confirms everything and fills each order in two halves.
pub struct SimExchange {
    sink: EventSender,
    tickets: HashMap<u64, OrderTicket>,
    next_handle: u64,
}

impl SimExchange {
    pub fn new(sink: EventSender) -> Self {
        Self {
            sink,
            tickets: HashMap::new(),
            next_handle: 0,
        }
    }

    fn ticket(&self, handle: &OrderHandle) -> Result<&OrderTicket, Errno> {
        self.tickets.get(&handle.raw()).ok_or(Errno::NotFound)
    }
}

impl OrderEngine for SimExchange {
    fn create(&mut self, ticket: &OrderTicket) -> Result<OrderHandle, Errno> {
        self.next_handle += 1;
        self.tickets.insert(self.next_handle, ticket.clone());
        Ok(OrderHandle::new(self.next_handle))
    }

    fn set_option(&mut self, _handle: &OrderHandle, option: OrderOption) -> Result<(), Errno> {
        debug!("option {:?} ignored", option);
        Ok(())
    }

    fn send(&mut self, handle: &OrderHandle) -> Result<(), Errno> {
        let ticket = self.ticket(handle)?;
        let first = ticket.qty / 2;
        self.sink.post_order(OrderEvent::activated(ticket.name.as_str()));
        if first > 0 {
            self.sink
                .post_order(OrderEvent::trade(ticket.name.as_str(), first, ticket.price));
        }
        self.sink.post_order(OrderEvent::trade(
            ticket.name.as_str(),
            ticket.qty - first,
            ticket.price + TICK,
        ));
        Ok(())
    }

    fn cancel(&mut self, handle: &OrderHandle) -> Result<(), Errno> {
        let name = self.ticket(handle)?.name.clone();
        self.sink.post_order(OrderEvent::canceled(name));
        Ok(())
    }

    fn replace(&mut self, handle: &OrderHandle, request: &ReplaceRequest) -> Result<(), Errno> {
        let ticket = self
            .tickets
            .get_mut(&handle.raw())
            .ok_or(Errno::NotFound)?;
        if let Some(qty) = request.qty {
            ticket.qty = qty;
        }
        if let Some(price) = request.price {
            ticket.price = price;
        }
        self.sink.post_order(OrderEvent::replaced(ticket.name.as_str()));
        Ok(())
    }

    fn destroy(&mut self, handle: OrderHandle, force: bool) -> Result<(), Errno> {
        let ticket = self.tickets.remove(&handle.raw()).ok_or(Errno::NotFound)?;
        if !force {
            self.sink.post_order(OrderEvent::destroyed(ticket.name));
        }
        Ok(())
    }
}

/// Feed that posts a random-walk book for every subscribed instrument.
pub struct SimFeed {
    sink: EventSender,
    period: Duration,
    books: Arc<Mutex<HashMap<InstrumentId, f64>>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SimFeed {
    pub fn new(sink: EventSender, period: Duration) -> Self {
        Self {
            sink,
            period,
            books: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl MarketDataTransport for SimFeed {
    fn connect(&mut self) -> Result<(), Errno> {
        if self.worker.is_some() {
            return Err(Errno::AlreadyConnected);
        }
        self.running.store(true, Ordering::SeqCst);
        let sink = self.sink.clone();
        let books = Arc::clone(&self.books);
        let running = Arc::clone(&self.running);
        let period = self.period;
        let worker = thread::Builder::new()
            .name("sim-feed".into())
            .spawn(move || {
                sink.post_mdata(MdataEvent::Connected);
                let mut rng = rand::thread_rng();
                while running.load(Ordering::SeqCst) {
                    thread::sleep(period);
                    for (instr_id, mid) in books.lock().iter_mut() {
                        *mid *= 1.0 + rng.gen_range(-0.001..0.001);
                        sink.post_mdata(MdataEvent::Book(book(*instr_id, *mid)));
                    }
                }
            })
            .map_err(|_| Errno::NoMoreResources)?;
        self.worker = Some(worker);
        info!("sim feed connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!("sim feed worker panicked");
            }
            self.sink.post_mdata(MdataEvent::Disconnected);
        }
    }

    fn subscribe(
        &mut self,
        instr_id: Option<InstrumentId>,
        mask: SubscriptionMask,
    ) -> Result<(), Errno> {
        if let Some(id) = instr_id {
            self.books.lock().entry(id).or_insert(START_PRICE);
        }
        self.sink.post_mdata(MdataEvent::SubscribeResult {
            instr_id: instr_id.unwrap_or(0),
            mask,
            error: Errno::Ok.code(),
        });
        Ok(())
    }

    fn unsubscribe(
        &mut self,
        instr_id: Option<InstrumentId>,
        _mask: SubscriptionMask,
    ) -> Result<(), Errno> {
        if let Some(id) = instr_id {
            self.books.lock().remove(&id);
        }
        Ok(())
    }

    fn publish(&mut self, message: &MdataMessage) -> Result<(), Errno> {
        debug!("publish of {:?} ignored", message.proto_type());
        Ok(())
    }
}

impl Drop for SimFeed {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn book(instr_id: InstrumentId, mid: f64) -> BookSnapshot {
    let mut book = BookSnapshot::new(instr_id);
    for level in 0..5 {
        let step = TICK * (level + 1) as f64;
        // levels are always inside the book depth
        let _ = book.set_bid(level, mid - step, 10 * (level as i64 + 1));
        let _ = book.set_ask(level, mid + step, 10 * (level as i64 + 1));
    }
    book
}
