//! A toy robot: joins the best bid with one order at a time.

use log::{info, warn};
use robot::{
    BookSnapshot, Errno, Instrument, NodeStatus, Price, Qty, RejReason, Side, SubscriptionId,
    SubscriptionMask,
};
use robot_core::{
    HookResult, MarketDataEvents, NewOrder, Order, OrderEvents, RobotContext, RobotEvents,
};

const ALIAS: &str = "SBER";
const ACCOUNT: &str = "DEMO";
const ORDER_QTY: Qty = 10;

#[derive(Debug, Default)]
pub struct MarketMaker {
    sequence: u32,
    filled_qty: Qty,
    books: u64,
}

impl MarketMaker {
    fn has_live_order(ctx: &RobotContext<'_>) -> bool {
        ctx.orders.orders().any(|order| !order.is_terminal())
    }
}

impl RobotEvents for MarketMaker {
    fn on_prepare(&mut self, ctx: &mut RobotContext<'_>) -> HookResult {
        if ctx.instruments.get_by_alias(ALIAS).is_none() {
            ctx.add_instrument(ALIAS, ALIAS, "Sberbank", "EQ")?;
        }
        ctx.subscribe(Some(ALIAS), SubscriptionMask::BOOK | SubscriptionMask::UPDATES)?;
        Ok(())
    }

    fn on_shutdown(&mut self, ctx: &mut RobotContext<'_>) -> HookResult {
        info!("shutting down with {} live orders", ctx.orders.len());
        Ok(())
    }

    fn on_finish(&mut self, ctx: &mut RobotContext<'_>) -> HookResult {
        let destroyed = ctx.orders.destroy_all(true);
        info!(
            "{} books seen, {} filled, {} orders dropped",
            self.books, self.filled_qty, destroyed
        );
        Ok(())
    }
}

impl OrderEvents for MarketMaker {
    fn on_order_trade(
        &mut self,
        ctx: &mut RobotContext<'_>,
        order: &Order,
        qty: Qty,
        price: Price,
    ) -> HookResult {
        self.filled_qty += qty;
        info!("fill {}@{} on {}", qty, price, order);
        if order.leaves_qty() == 0 {
            ctx.destroy_order(order.get_name(), false)?;
        }
        Ok(())
    }

    fn on_order_destroyed(&mut self, _ctx: &mut RobotContext<'_>, order: &Order) -> HookResult {
        info!("done with {}", order.get_name());
        Ok(())
    }

    fn on_order_rejected(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        order: &Order,
        reason: RejReason,
        text: &str,
    ) -> HookResult {
        warn!("{} rejected ({:?}): {}", order.get_name(), reason, text);
        Ok(())
    }
}

impl MarketDataEvents for MarketMaker {
    fn on_mdata_book(
        &mut self,
        ctx: &mut RobotContext<'_>,
        instrument: &Instrument,
        book: &BookSnapshot,
    ) -> HookResult {
        self.books += 1;
        if ctx.node.status()? != NodeStatus::Active || Self::has_live_order(ctx) {
            return Ok(());
        }
        let Some(best) = book.best_bid() else {
            return Ok(());
        };
        self.sequence += 1;
        let name = format!("mm{}", self.sequence);
        ctx.create_order(NewOrder::new(
            &name,
            instrument.get_alias(),
            ACCOUNT,
            Side::Buy,
            ORDER_QTY,
            best.price,
        ))?;
        ctx.send_order(&name)?;
        Ok(())
    }

    fn on_mdata_subscribe_result(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        subscription: Option<SubscriptionId>,
        instrument: Option<&Instrument>,
        _mask: SubscriptionMask,
        error: Errno,
    ) -> HookResult {
        let target = instrument.map_or("market", |instrument| instrument.get_alias());
        info!("subscription {:?} to {}: {}", subscription, target, error);
        Ok(())
    }
}
