//! Full-lifecycle tests across every service, driven through the public
//! API against the mock custodian.

use std::sync::Arc;

use rust_decimal::Decimal;

use openescrow_custodian::{CustodianGateway, Fault, MockCustodian};
use openescrow_lifecycle::{
    DisputeResolver, EscrowService, Monitor, OrderIntake, OrderRequest, ReconciliationEngine,
    TradeFlow,
};
use openescrow_store::{lock, Ledger};
use openescrow_types::{
    AccountRef, DisputeOutcome, EscrowStatus, MonitorThresholds, OrderSide, OrderStatus,
    PlatformConfig, Role, TradeStatus, TradeSubStatus, UserId,
};

struct Platform {
    ledger: Arc<Ledger>,
    custodian: Arc<MockCustodian>,
    intake: OrderIntake,
    escrow: EscrowService,
    flow: TradeFlow,
    disputes: DisputeResolver,
    recon: ReconciliationEngine,
    monitor: Monitor,
    seller: UserId,
    buyer: UserId,
    admin: UserId,
}

fn platform() -> Platform {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let ledger = Arc::new(Ledger::new());
    let custodian = Arc::new(MockCustodian::new());
    let gateway: Arc<dyn CustodianGateway> = Arc::clone(&custodian) as Arc<dyn CustodianGateway>;
    let config = PlatformConfig::default();

    let seller = UserId::new();
    let buyer = UserId::new();
    let admin = UserId::new();
    lock(&ledger.profiles).register(seller, AccountRef::new("sub_seller"));
    lock(&ledger.profiles).register(buyer, AccountRef::new("sub_buyer"));
    lock(&ledger.roles).assign(admin, Role::admin());
    custodian.deposit(&AccountRef::new("sub_seller"), "USDT", Decimal::new(100, 0));
    custodian.set_rate("USDT", "NGN", Decimal::new(1500, 0));

    Platform {
        intake: OrderIntake::new(Arc::clone(&ledger), Arc::clone(&gateway)),
        escrow: EscrowService::new(Arc::clone(&ledger), Arc::clone(&gateway), config.clone()),
        flow: TradeFlow::new(Arc::clone(&ledger), Arc::clone(&gateway), config.clone()),
        disputes: DisputeResolver::new(Arc::clone(&ledger), Arc::clone(&gateway)),
        recon: ReconciliationEngine::new(Arc::clone(&ledger), Arc::clone(&gateway), config),
        monitor: Monitor::new(Arc::clone(&ledger), MonitorThresholds::default()),
        ledger,
        custodian,
        seller,
        buyer,
        admin,
    }
}

fn sell_request() -> OrderRequest {
    OrderRequest {
        side: OrderSide::Sell,
        currency: "USDT".to_string(),
        price: Decimal::new(1500, 0),
        amount: Decimal::new(100, 0),
        min_order: Decimal::new(10_000, 0),
        max_order: Decimal::new(150_000, 0),
        payment_methods: vec!["bank_transfer".to_string()],
        terms: "pay within the window, quote the code".to_string(),
    }
}

#[tokio::test]
async fn sell_order_happy_path() {
    let p = platform();
    let order = p.intake.create_order(p.seller, sell_request()).await.unwrap();

    // 45,000 NGN at 1,500 NGN/USDT buys 30 USDT.
    let (trade, escrow) = p
        .escrow
        .create_trade(order.id, p.buyer, Decimal::new(45_000, 0))
        .await
        .unwrap();
    assert_eq!(trade.crypto_amount, Decimal::new(30, 0));
    assert_eq!(escrow.confirmation_code.len(), 8);
    assert_eq!(
        lock(&p.ledger.orders).get(order.id).unwrap().amount,
        Decimal::new(70, 0)
    );

    p.flow
        .submit_payment_proof(trade.id, p.buyer, "bank ref 998877")
        .await
        .unwrap();
    let done = p.flow.confirm_release(trade.id, p.seller).await.unwrap();
    assert_eq!(done.status, TradeStatus::Completed);
    assert_eq!(
        lock(&p.ledger.trades).get(trade.id).unwrap().execution_price,
        Some(Decimal::new(1500, 0))
    );

    // Custodian balances: seller down 30, buyer up 30, escrow empty.
    assert_eq!(
        p.custodian
            .get_balance(&AccountRef::new("sub_seller"), "USDT")
            .await
            .unwrap(),
        Decimal::new(70, 0)
    );
    assert_eq!(
        p.custodian
            .get_balance(&AccountRef::new("sub_buyer"), "USDT")
            .await
            .unwrap(),
        Decimal::new(30, 0)
    );
    assert_eq!(
        p.custodian
            .get_balance(&escrow.escrow_wallet, "USDT")
            .await
            .unwrap(),
        Decimal::ZERO
    );
    assert_eq!(lock(&p.ledger.profiles).completed_trades(p.buyer), 1);
    assert_eq!(lock(&p.ledger.profiles).completed_trades(p.seller), 1);
}

#[tokio::test]
async fn order_completes_when_liquidity_exhausts() {
    let p = platform();
    let order = p.intake.create_order(p.seller, sell_request()).await.unwrap();

    // 150,000 NGN buys the full 100 USDT.
    p.escrow
        .create_trade(order.id, p.buyer, Decimal::new(150_000, 0))
        .await
        .unwrap();
    assert_eq!(
        lock(&p.ledger.orders).get(order.id).unwrap().status,
        OrderStatus::Completed
    );

    // No liquidity left for anyone else.
    let other = UserId::new();
    lock(&p.ledger.profiles).register(other, AccountRef::new("sub_other"));
    let err = p
        .escrow
        .create_trade(order.id, other, Decimal::new(15_000, 0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        openescrow_types::OpenescrowError::OrderNotActive(_)
    ));
}

#[tokio::test]
async fn disputed_trade_refunds_buyer() {
    let p = platform();
    let order = p.intake.create_order(p.seller, sell_request()).await.unwrap();
    let (trade, _) = p
        .escrow
        .create_trade(order.id, p.buyer, Decimal::new(45_000, 0))
        .await
        .unwrap();
    p.flow
        .submit_payment_proof(trade.id, p.buyer, "paid but no crypto")
        .await
        .unwrap();

    let dispute = p
        .disputes
        .open_dispute(trade.id, p.buyer, "seller never confirmed")
        .unwrap();
    // A frozen trade can no longer be released.
    let err = p.flow.confirm_release(trade.id, p.seller).await.unwrap_err();
    assert!(matches!(
        err,
        openescrow_types::OpenescrowError::StateConflict { .. }
    ));

    p.disputes
        .resolve_dispute(dispute.id, p.admin, DisputeOutcome::UpholdComplaint, "proof checks out")
        .await
        .unwrap();
    assert_eq!(
        lock(&p.ledger.trades).get(trade.id).unwrap().status,
        TradeStatus::Cancelled
    );
    assert_eq!(
        p.custodian
            .get_balance(&AccountRef::new("sub_buyer"), "USDT")
            .await
            .unwrap(),
        Decimal::new(30, 0)
    );
    // Dispute-path completions do not bump the counters.
    assert_eq!(lock(&p.ledger.profiles).completed_trades(p.buyer), 0);
}

#[tokio::test]
async fn lock_timeout_heals_through_reconciliation() {
    let p = platform();
    let order = p.intake.create_order(p.seller, sell_request()).await.unwrap();

    // The lock executes custodian-side but the receipt is lost.
    p.custodian.inject_transfer_fault(Fault::TimeoutDelivered);
    let (trade, _) = p
        .escrow
        .create_trade(order.id, p.buyer, Decimal::new(45_000, 0))
        .await
        .unwrap();
    assert_eq!(trade.sub_status, TradeSubStatus::AwaitingLockConfirmation);

    // Reconciliation backfills the custodian feed and finds the lock.
    let report = p.recon.run().await.unwrap();
    assert!(report.transactions_inserted >= 1);
    assert_eq!(report.awaiting_confirmed, 1);

    // The healed trade completes normally.
    let healed = lock(&p.ledger.trades).get(trade.id).unwrap();
    assert_eq!(healed.status, TradeStatus::Pending);
    assert_eq!(healed.sub_status, TradeSubStatus::None);
    p.flow
        .submit_payment_proof(trade.id, p.buyer, "ref")
        .await
        .unwrap();
    let done = p.flow.confirm_release(trade.id, p.seller).await.unwrap();
    assert_eq!(done.status, TradeStatus::Completed);
}

#[tokio::test]
async fn release_timeout_heals_through_reconciliation() {
    let p = platform();
    let order = p.intake.create_order(p.seller, sell_request()).await.unwrap();
    let (trade, _) = p
        .escrow
        .create_trade(order.id, p.buyer, Decimal::new(45_000, 0))
        .await
        .unwrap();
    p.flow
        .submit_payment_proof(trade.id, p.buyer, "ref")
        .await
        .unwrap();

    p.custodian.inject_transfer_fault(Fault::TimeoutDelivered);
    let deferred = p.flow.confirm_release(trade.id, p.seller).await.unwrap();
    assert_eq!(deferred.sub_status, TradeSubStatus::AwaitingReleaseConfirmation);

    let report = p.recon.run().await.unwrap();
    assert_eq!(report.awaiting_confirmed, 1);
    assert_eq!(
        lock(&p.ledger.trades).get(trade.id).unwrap().status,
        TradeStatus::Completed
    );
    // The crypto reached the buyer exactly once.
    assert_eq!(
        p.custodian
            .get_balance(&AccountRef::new("sub_buyer"), "USDT")
            .await
            .unwrap(),
        Decimal::new(30, 0)
    );
    assert_eq!(
        lock(&p.ledger.escrows).get(trade.escrow_id).unwrap().status,
        EscrowStatus::Completed
    );
}

#[tokio::test]
async fn monitoring_flags_large_backfilled_transactions() {
    let p = platform();
    // Seed a whale-sized movement into the escrow wallet's feed.
    p.custodian
        .deposit(&AccountRef::new("sub_whale"), "USDT", Decimal::new(50_000, 0));
    p.custodian
        .transfer_internal(
            &AccountRef::new("sub_whale"),
            &PlatformConfig::default().escrow_wallet,
            "USDT",
            Decimal::new(50_000, 0),
            "escrow:whale:lock",
        )
        .await
        .unwrap();

    p.recon.run().await.unwrap();
    let report = p.monitor.scan();
    assert_eq!(report.large_transactions, 1);

    // Alerts resolve once, by an admin only.
    let alert = p.monitor.active_alerts().into_iter().next().unwrap();
    assert!(p.monitor.resolve_alert(alert.id, p.buyer).is_err());
    p.monitor.resolve_alert(alert.id, p.admin).unwrap();
    assert!(p.monitor.active_alerts().is_empty());
}
