//! Handler capability traits.
//!
//! A robot implements only the hooks it cares about; every hook defaults to a
//! no-op.

use super::context::RobotContext;
use crate::mdata::MdataNotice;
use crate::order::{Order, OrderNotice};
use crate::process::HookResult;
use robot::{
    BookSnapshot, CommonInfoSnapshot, Errno, FeedState, FieldValue, Instrument, InstrumentId,
    OrderEventKind, Price, QuoteSnapshot, Qty, RejReason, ResetHint, SubscriptionId,
    SubscriptionMask, TimerId, TradeSnapshot,
};

/// Process life-cycle hooks.
pub trait RobotEvents {
    /// Market data is started; the node is not active yet.
    fn on_prepare(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }

    /// Called before market data is stopped at the end of the run.
    fn on_finish(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_start(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_stop(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_shutdown(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_activate(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_deactivate(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_reset(&mut self, _ctx: &mut RobotContext<'_>, _hint: ResetHint) -> HookResult {
        Ok(())
    }

    fn on_reconfig(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_field(&mut self, _ctx: &mut RobotContext<'_>, _name: &str, _value: &FieldValue) -> HookResult {
        Ok(())
    }

    fn on_timer(&mut self, _ctx: &mut RobotContext<'_>, _id: TimerId) -> HookResult {
        Ok(())
    }

    fn on_idle(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }
}

/// Order confirmation hooks. `order` is the state after the confirmation.
pub trait OrderEvents {
    fn on_order_activated(&mut self, _ctx: &mut RobotContext<'_>, _order: &Order) -> HookResult {
        Ok(())
    }

    fn on_order_before_send(&mut self, _ctx: &mut RobotContext<'_>, _order: &Order) -> HookResult {
        Ok(())
    }

    fn on_order_trade(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _order: &Order,
        _qty: Qty,
        _price: Price,
    ) -> HookResult {
        Ok(())
    }

    fn on_order_canceled(&mut self, _ctx: &mut RobotContext<'_>, _order: &Order) -> HookResult {
        Ok(())
    }

    /// The exchange canceled the order on its own.
    fn on_order_unexpected_canceled(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _order: &Order,
    ) -> HookResult {
        Ok(())
    }

    fn on_order_expired(&mut self, _ctx: &mut RobotContext<'_>, _order: &Order) -> HookResult {
        Ok(())
    }

    /// The pool has already forgotten the order.
    fn on_order_destroyed(&mut self, _ctx: &mut RobotContext<'_>, _order: &Order) -> HookResult {
        Ok(())
    }

    fn on_order_replaced(&mut self, _ctx: &mut RobotContext<'_>, _order: &Order) -> HookResult {
        Ok(())
    }

    fn on_order_rejected(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _order: &Order,
        _reason: RejReason,
        _text: &str,
    ) -> HookResult {
        Ok(())
    }

    fn on_order_cancel_rejected(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _order: &Order,
        _reason: RejReason,
        _text: &str,
    ) -> HookResult {
        Ok(())
    }

    fn on_order_replace_rejected(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _order: &Order,
        _reason: RejReason,
        _text: &str,
    ) -> HookResult {
        Ok(())
    }
}

/// Market-data hooks. `instrument` is `None` for the market-wide channel.
pub trait MarketDataEvents {
    fn on_mdata_heartbeat(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_mdata_book(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _instrument: &Instrument,
        _book: &BookSnapshot,
    ) -> HookResult {
        Ok(())
    }

    fn on_mdata_trade(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _instrument: &Instrument,
        _trade: &TradeSnapshot,
    ) -> HookResult {
        Ok(())
    }

    fn on_mdata_quote(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _instrument: &Instrument,
        _quote: &QuoteSnapshot,
    ) -> HookResult {
        Ok(())
    }

    fn on_mdata_common_info(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _instrument: &Instrument,
        _info: &CommonInfoSnapshot,
    ) -> HookResult {
        Ok(())
    }

    fn on_mdata_symbol(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _instr_id: InstrumentId,
        _alias: &str,
    ) -> HookResult {
        Ok(())
    }

    fn on_mdata_subscribe_result(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _subscription: Option<SubscriptionId>,
        _instrument: Option<&Instrument>,
        _mask: SubscriptionMask,
        _error: Errno,
    ) -> HookResult {
        Ok(())
    }

    fn on_mdata_feed_state(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _instrument: Option<&Instrument>,
        _mask: SubscriptionMask,
        _state: FeedState,
    ) -> HookResult {
        Ok(())
    }

    fn on_mdata_connected(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }

    fn on_mdata_disconnected(&mut self, _ctx: &mut RobotContext<'_>) -> HookResult {
        Ok(())
    }

    /// A peer asks this node to resolve an alias.
    fn on_mdata_resolve(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _alias: &str,
        _instrument: Option<&Instrument>,
    ) -> HookResult {
        Ok(())
    }

    /// A peer subscribes to data this node publishes.
    fn on_mdata_subscribe(
        &mut self,
        _ctx: &mut RobotContext<'_>,
        _instrument: Option<&Instrument>,
        _mask: SubscriptionMask,
    ) -> HookResult {
        Ok(())
    }
}

/// Everything a `Robot` dispatches to.
pub trait RobotHandler: RobotEvents + OrderEvents + MarketDataEvents {}

impl<T: RobotEvents + OrderEvents + MarketDataEvents> RobotHandler for T {}

pub(crate) fn deliver_order<H: OrderEvents + ?Sized>(
    handler: &mut H,
    ctx: &mut RobotContext<'_>,
    notice: &OrderNotice,
) -> HookResult {
    let order = &notice.order;
    match &notice.kind {
        OrderEventKind::Activated => handler.on_order_activated(ctx, order),
        OrderEventKind::BeforeSend => handler.on_order_before_send(ctx, order),
        OrderEventKind::Trade { qty, price } => handler.on_order_trade(ctx, order, *qty, *price),
        OrderEventKind::Canceled => handler.on_order_canceled(ctx, order),
        OrderEventKind::UnexpectedCanceled => handler.on_order_unexpected_canceled(ctx, order),
        OrderEventKind::Expired => handler.on_order_expired(ctx, order),
        OrderEventKind::Destroyed => handler.on_order_destroyed(ctx, order),
        OrderEventKind::Replaced => handler.on_order_replaced(ctx, order),
        OrderEventKind::Rejected { reason, text } => {
            handler.on_order_rejected(ctx, order, *reason, text)
        }
        OrderEventKind::CancelRejected { reason, text } => {
            handler.on_order_cancel_rejected(ctx, order, *reason, text)
        }
        OrderEventKind::ReplaceRejected { reason, text } => {
            handler.on_order_replace_rejected(ctx, order, *reason, text)
        }
    }
}

pub(crate) fn deliver_mdata<H: MarketDataEvents + ?Sized>(
    handler: &mut H,
    ctx: &mut RobotContext<'_>,
    notice: &MdataNotice,
) -> HookResult {
    match notice {
        MdataNotice::Heartbeat => handler.on_mdata_heartbeat(ctx),
        MdataNotice::Book { instrument, book } => handler.on_mdata_book(ctx, instrument, book),
        MdataNotice::Trade { instrument, trade } => handler.on_mdata_trade(ctx, instrument, trade),
        MdataNotice::Quote { instrument, quote } => handler.on_mdata_quote(ctx, instrument, quote),
        MdataNotice::CommonInfo { instrument, info } => {
            handler.on_mdata_common_info(ctx, instrument, info)
        }
        MdataNotice::Symbol { instr_id, alias } => handler.on_mdata_symbol(ctx, *instr_id, alias),
        MdataNotice::SubscribeResult {
            subscription,
            instrument,
            mask,
            error,
        } => handler.on_mdata_subscribe_result(
            ctx,
            *subscription,
            instrument.as_ref(),
            *mask,
            *error,
        ),
        MdataNotice::FeedState {
            instrument,
            mask,
            state,
        } => handler.on_mdata_feed_state(ctx, instrument.as_ref(), *mask, *state),
        MdataNotice::Connected => handler.on_mdata_connected(ctx),
        MdataNotice::Disconnected => handler.on_mdata_disconnected(ctx),
        MdataNotice::Resolve { alias, instrument } => {
            handler.on_mdata_resolve(ctx, alias, instrument.as_ref())
        }
        MdataNotice::Subscribe { instrument, mask } => {
            handler.on_mdata_subscribe(ctx, instrument.as_ref(), *mask)
        }
    }
}
