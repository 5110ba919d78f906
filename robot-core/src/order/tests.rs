use super::*;
use crate::testing::{EngineCall, SpyOrderEngine};
use robot::{
    Errno, Error, InstrumentDB, Object, OrderEvent, OrderEventKind, OrderOption, OrderState,
    Payload, RejReason, ReplaceRequest, Side,
};

fn instruments() -> InstrumentDB {
    let mut db = InstrumentDB::new();
    db.add("SBER", "SBER", "Sberbank", "EQ").unwrap();
    db.add("GAZP", "GAZP", "Gazprom", "EQ").unwrap();
    db
}

fn create_test_pool() -> (OrderPool, SpyOrderEngine) {
    let spy = SpyOrderEngine::new();
    (OrderPool::new(Box::new(spy.clone())), spy)
}

fn buy(name: &str, qty: i64) -> NewOrder {
    NewOrder::new(name, "SBER", "ACC1", Side::Buy, qty, 250.5)
}

fn active_order(pool: &mut OrderPool, name: &str, qty: i64) {
    let db = instruments();
    pool.create_order(&db, buy(name, qty)).unwrap();
    pool.send(name).unwrap();
    pool.apply(OrderEvent::activated(name)).unwrap();
}

fn state(pool: &OrderPool, name: &str) -> OrderState {
    pool.get_order(name).unwrap().get_state()
}

#[test]
fn test_created_order_is_initial() {
    let (mut pool, spy) = create_test_pool();
    let db = instruments();

    let order = pool
        .create_order(&db, buy("ord1", 100).client_code("C1").ext_ref("r1"))
        .unwrap();
    assert_eq!(order.get_state(), OrderState::Initial);
    assert_eq!(order.get_instrument().get_alias(), "SBER");
    assert_eq!(order.leaves_qty(), 100);

    let calls = spy.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        EngineCall::Create(ticket) => {
            assert_eq!(ticket.name, "ord1");
            assert_eq!(ticket.client_code, "C1");
            assert_eq!(ticket.instr_id, db.get_by_alias("SBER").unwrap().get_id());
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[test]
fn test_unknown_alias_and_duplicate_name() {
    let (mut pool, _spy) = create_test_pool();
    let db = instruments();

    let unknown = NewOrder::new("x", "LKOH", "ACC1", Side::Sell, 1, 1.0);
    assert!(matches!(pool.create_order(&db, unknown), Err(Error::NotFound(_))));

    pool.create_order(&db, buy("ord1", 10)).unwrap();
    assert!(matches!(
        pool.create_order(&db, buy("ord1", 20)),
        Err(Error::AlreadyExists(_))
    ));
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.get_order("ord1").unwrap().get_qty(), 10);
}

#[test]
fn test_fill_scenario() {
    let (mut pool, _spy) = create_test_pool();
    let db = instruments();

    pool.create_order(&db, buy("ord1", 100)).unwrap();
    pool.send("ord1").unwrap();
    assert_eq!(pool.len(), 1);
    assert_eq!(state(&pool, "ord1"), OrderState::AwaitingActive);

    pool.apply(OrderEvent::activated("ord1")).unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::Active);

    pool.apply(OrderEvent::trade("ord1", 40, 250.5)).unwrap();
    let order = pool.get_order("ord1").unwrap();
    assert_eq!(order.get_total_qty(), 40);
    assert_eq!(order.get_state(), OrderState::Active);

    let notice = pool.apply(OrderEvent::trade("ord1", 60, 250.6)).unwrap();
    assert_eq!(notice.order.get_total_qty(), 100);
    assert_eq!(notice.order.get_state(), OrderState::Filled);
    assert!((notice.order.get_avg_price() - 250.56).abs() < 1e-9);
    assert_eq!(notice.order.leaves_qty(), 0);
}

#[test]
fn test_send_twice_is_rejected() {
    let (mut pool, spy) = create_test_pool();
    active_order(&mut pool, "ord1", 10);

    assert!(matches!(pool.send("ord1"), Err(Error::WrongState { .. })));
    assert_eq!(spy.count(|call| matches!(call, EngineCall::Send(_))), 1);
    assert_eq!(pool.len(), 1);
}

#[test]
fn test_send_failure_keeps_initial() {
    let (mut pool, spy) = create_test_pool();
    let db = instruments();
    pool.create_order(&db, buy("ord1", 10)).unwrap();

    spy.fail_next(Errno::WrongFormat);
    let err = pool.send("ord1").unwrap_err();
    assert!(matches!(
        err,
        Error::SendFailed {
            errno: Errno::WrongFormat,
            ..
        }
    ));
    assert_eq!(state(&pool, "ord1"), OrderState::Initial);
}

#[test]
fn test_cancel_of_terminal_or_initial_order_makes_no_request() {
    let (mut pool, spy) = create_test_pool();
    let db = instruments();
    pool.create_order(&db, buy("fresh", 10)).unwrap();
    pool.cancel("fresh").unwrap();

    active_order(&mut pool, "ord1", 10);
    pool.apply(OrderEvent::trade("ord1", 10, 250.5)).unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::Filled);

    pool.cancel("ord1").unwrap();
    assert_eq!(spy.count(|call| matches!(call, EngineCall::Cancel(_))), 0);
}

#[test]
fn test_cancel_round_trip_and_reject() {
    let (mut pool, spy) = create_test_pool();
    active_order(&mut pool, "ord1", 10);

    pool.cancel("ord1").unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::AwaitingCancel);
    pool.cancel("ord1").unwrap();
    assert_eq!(spy.count(|call| matches!(call, EngineCall::Cancel(_))), 1);

    pool.apply(OrderEvent::new(
        "ord1",
        OrderEventKind::CancelRejected {
            reason: RejReason::TooLate,
            text: "too late".into(),
        },
    ))
    .unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::Active);

    pool.cancel("ord1").unwrap();
    pool.apply(OrderEvent::canceled("ord1")).unwrap();
    let order = pool.get_order("ord1").unwrap();
    assert_eq!(order.get_state(), OrderState::Canceled);
    assert!(!order.is_canceled_by_exchange());
}

#[test]
fn test_exchange_cancel_is_flagged() {
    let (mut pool, _spy) = create_test_pool();
    active_order(&mut pool, "ord1", 10);

    let notice = pool
        .apply(OrderEvent::new("ord1", OrderEventKind::UnexpectedCanceled))
        .unwrap();
    assert_eq!(notice.order.get_state(), OrderState::Canceled);
    assert!(notice.order.is_canceled_by_exchange());
}

#[test]
fn test_activation_after_cancel_request() {
    let (mut pool, _spy) = create_test_pool();
    let db = instruments();
    pool.create_order(&db, buy("ord1", 10)).unwrap();
    pool.send("ord1").unwrap();
    pool.cancel("ord1").unwrap();

    pool.apply(OrderEvent::activated("ord1")).unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::AwaitingCancel);

    pool.apply(OrderEvent::new(
        "ord1",
        OrderEventKind::CancelRejected {
            reason: RejReason::Other,
            text: String::new(),
        },
    ))
    .unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::Active);
}

#[test]
fn test_replace_round_trip() {
    let (mut pool, spy) = create_test_pool();
    active_order(&mut pool, "ord1", 100);

    pool.replace("ord1", ReplaceRequest::qty(150)).unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::AwaitingReplace);
    assert_eq!(pool.get_order("ord1").unwrap().get_qty(), 100);

    pool.apply(OrderEvent::replaced("ord1")).unwrap();
    let order = pool.get_order("ord1").unwrap();
    assert_eq!(order.get_qty(), 150);
    assert_eq!(order.get_state(), OrderState::Active);
    assert_eq!(spy.count(|call| matches!(call, EngineCall::Replace(..))), 1);
}

#[test]
fn test_replace_without_fields_makes_no_request() {
    let (mut pool, spy) = create_test_pool();
    active_order(&mut pool, "ord1", 100);

    pool.replace("ord1", ReplaceRequest::default()).unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::Active);
    assert_eq!(spy.count(|call| matches!(call, EngineCall::Replace(..))), 0);
}

#[test]
fn test_replace_reject_and_wrong_state() {
    let (mut pool, spy) = create_test_pool();
    let db = instruments();
    pool.create_order(&db, buy("fresh", 10)).unwrap();
    assert!(matches!(
        pool.replace("fresh", ReplaceRequest::price(1.0)),
        Err(Error::ReplaceFailed {
            errno: Errno::WrongState,
            ..
        })
    ));

    active_order(&mut pool, "ord1", 100);
    pool.replace("ord1", ReplaceRequest::price(251.0)).unwrap();
    pool.apply(OrderEvent::new(
        "ord1",
        OrderEventKind::ReplaceRejected {
            reason: RejReason::ExceedLimit,
            text: "limit".into(),
        },
    ))
    .unwrap();
    let order = pool.get_order("ord1").unwrap();
    assert_eq!(order.get_state(), OrderState::Active);
    assert_eq!(order.get_price(), 250.5);

    // a late Replaced after a reject changes nothing
    pool.apply(OrderEvent::replaced("ord1")).unwrap();
    assert_eq!(pool.get_order("ord1").unwrap().get_price(), 250.5);
    assert_eq!(spy.count(|call| matches!(call, EngineCall::Replace(..))), 1);
}

#[test]
fn test_replace_confirmed_while_cancel_pending() {
    let (mut pool, spy) = create_test_pool();
    active_order(&mut pool, "ord1", 100);

    pool.replace("ord1", ReplaceRequest::qty(150)).unwrap();
    pool.cancel("ord1").unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::AwaitingCancel);

    pool.apply(OrderEvent::replaced("ord1")).unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::AwaitingCancel);
    assert_eq!(pool.get_order("ord1").unwrap().get_qty(), 150);

    pool.apply(OrderEvent::new(
        "ord1",
        OrderEventKind::CancelRejected {
            reason: RejReason::TooLate,
            text: String::new(),
        },
    ))
    .unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::Active);

    pool.replace("ord1", ReplaceRequest::qty(200)).unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::AwaitingReplace);
    assert_eq!(spy.count(|call| matches!(call, EngineCall::Replace(..))), 2);
}

#[test]
fn test_replace_rejected_while_cancel_pending() {
    let (mut pool, _spy) = create_test_pool();
    active_order(&mut pool, "ord1", 100);

    pool.replace("ord1", ReplaceRequest::price(251.0)).unwrap();
    pool.cancel("ord1").unwrap();
    pool.apply(OrderEvent::new(
        "ord1",
        OrderEventKind::ReplaceRejected {
            reason: RejReason::AlreadyInPending,
            text: String::new(),
        },
    ))
    .unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::AwaitingCancel);

    pool.apply(OrderEvent::new(
        "ord1",
        OrderEventKind::CancelRejected {
            reason: RejReason::Other,
            text: String::new(),
        },
    ))
    .unwrap();
    let order = pool.get_order("ord1").unwrap();
    assert_eq!(order.get_state(), OrderState::Active);
    assert_eq!(order.get_price(), 250.5);
}

#[test]
fn test_reject_of_send() {
    let (mut pool, _spy) = create_test_pool();
    let db = instruments();
    pool.create_order(&db, buy("ord1", 10)).unwrap();
    pool.send("ord1").unwrap();

    let notice = pool
        .apply(OrderEvent::rejected("ord1", RejReason::WrongAccount, "no such account"))
        .unwrap();
    assert_eq!(notice.order.get_state(), OrderState::Rejected);
    assert_eq!(
        notice.kind,
        OrderEventKind::Rejected {
            reason: RejReason::WrongAccount,
            text: "no such account".into()
        }
    );
}

#[test]
fn test_destroyed_confirmation_forgets_order() {
    let (mut pool, spy) = create_test_pool();
    active_order(&mut pool, "ord1", 10);
    active_order(&mut pool, "ord2", 10);

    pool.destroy("ord1", false).unwrap();
    assert_eq!(state(&pool, "ord1"), OrderState::AwaitingDestroy);
    pool.destroy("ord1", false).unwrap();
    assert_eq!(
        spy.count(|call| matches!(call, EngineCall::Destroy { force: false, .. })),
        1
    );

    let notice = pool.apply(OrderEvent::destroyed("ord1")).unwrap();
    assert_eq!(notice.order.get_state(), OrderState::Destroyed);
    assert!(pool.get_order("ord1").is_none());
    assert_eq!(pool.len(), 1);

    assert!(pool.apply(OrderEvent::destroyed("ord1")).is_none());
    assert!(matches!(pool.destroy("ord1", false), Err(Error::NotFound(_))));
}

#[test]
fn test_forced_destroy_is_immediate() {
    let (mut pool, spy) = create_test_pool();
    active_order(&mut pool, "ord1", 10);

    pool.destroy("ord1", true).unwrap();
    assert!(pool.get_order("ord1").is_none());

    let notices = pool.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].name(), "ord1");
    assert_eq!(notices[0].kind, OrderEventKind::Destroyed);
    assert!(pool.take_notices().is_empty());

    assert!(pool.apply(OrderEvent::canceled("ord1")).is_none());
    assert_eq!(
        spy.count(|call| matches!(call, EngineCall::Destroy { force: true, .. })),
        1
    );
}

#[test]
fn test_destroy_failure_releases_handle_once() {
    let (mut pool, spy) = create_test_pool();
    active_order(&mut pool, "ord1", 10);

    spy.fail_next(Errno::Busy);
    assert!(matches!(
        pool.destroy("ord1", false),
        Err(Error::DestroyFailed {
            errno: Errno::Busy,
            ..
        })
    ));
    assert!(pool.get_order("ord1").is_none());
    assert!(pool.take_notices().is_empty());
}

#[test]
fn test_set_option_only_before_send() {
    let (mut pool, spy) = create_test_pool();
    let db = instruments();
    pool.create_order(&db, buy("ord1", 10)).unwrap();

    pool.set_option("ord1", OrderOption::MaxCancelAttempts(3)).unwrap();
    pool.send("ord1").unwrap();
    assert!(matches!(
        pool.set_option("ord1", OrderOption::CancelTimeoutMs(500)),
        Err(Error::WrongState { .. })
    ));

    let calls = spy.calls();
    assert!(matches!(calls[1], EngineCall::SetOption(_, OrderOption::MaxCancelAttempts(3))));
    assert!(matches!(calls[2], EngineCall::Send(_)));
}

#[test]
fn test_bulk_operations() {
    let (mut pool, spy) = create_test_pool();
    let db = instruments();
    for name in ["a", "b", "c"] {
        pool.create_order(&db, buy(name, 10)).unwrap();
    }

    assert_eq!(pool.send_all().unwrap(), 3);
    assert_eq!(pool.send_all().unwrap(), 0);
    for name in ["a", "b"] {
        pool.apply(OrderEvent::activated(name)).unwrap();
    }
    pool.apply(OrderEvent::rejected("c", RejReason::Other, "")).unwrap();

    assert_eq!(pool.cancel_all().unwrap(), 2);
    assert_eq!(spy.count(|call| matches!(call, EngineCall::Cancel(_))), 2);

    assert_eq!(pool.destroy_all(false), 3);
    for name in ["a", "b", "c"] {
        pool.apply(OrderEvent::destroyed(name)).unwrap();
    }
    assert!(pool.is_empty());
}

#[test]
fn test_destroy_all_forced_empties_pool() {
    let (mut pool, _spy) = create_test_pool();
    active_order(&mut pool, "a", 10);
    active_order(&mut pool, "b", 10);
    pool.destroy("a", false).unwrap();

    assert_eq!(pool.destroy_all(true), 2);
    assert!(pool.is_empty());
    assert_eq!(pool.take_notices().len(), 2);
}

#[test]
fn test_peer_objects_reach_engine() {
    let (mut pool, spy) = create_test_pool();
    let object = Object::new(
        4,
        Payload::Signal {
            name: "sync".into(),
            value: 1.0,
        },
    );
    pool.process_node_object(&object, 7);
    assert_eq!(
        spy.calls(),
        vec![EngineCall::NodeObject { object, from: 7 }]
    );
}
