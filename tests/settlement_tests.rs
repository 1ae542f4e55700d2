use custody_ledger::domain::ledger::RecordFilter;
use custody_ledger::domain::money::Balance;
use custody_ledger::domain::status::{BuyRequestStatus, TransactionStatus};
use custody_ledger::domain::transaction::TransactionKind;
use custody_ledger::error::LedgerError;
use rust_decimal_macros::dec;

mod common;
use common::{account, engine, fund, reviewer};

#[tokio::test]
async fn test_approved_buy_debits_balance() {
    let engine = engine();
    let alice = account("alice");
    fund(&engine, &alice, dec!(50)).await;
    let request = engine.settlement().request(&alice, "BTC", dec!(30)).await.unwrap();

    engine.settlement().approve(&reviewer(), &request.id).await.unwrap();

    assert_eq!(
        engine.ledger().available_balance(&alice).await.unwrap(),
        Balance::new(dec!(20))
    );
    let buys = engine
        .ledger()
        .transactions(&RecordFilter::account(alice.clone()).with_status("complete"))
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TransactionKind::Buy)
        .collect::<Vec<_>>();
    assert_eq!(buys.len(), 1);
    assert_eq!(buys[0].amount.value(), dec!(30));
    assert_eq!(buys[0].status, TransactionStatus::Complete);
    assert_eq!(buys[0].asset.as_deref(), Some("BTC"));
}

#[tokio::test]
async fn test_failed_settlement_has_no_effect() {
    let engine = engine();
    let alice = account("alice");
    fund(&engine, &alice, dec!(10)).await;
    let request = engine.settlement().request(&alice, "ETH", dec!(30)).await.unwrap();

    let result = engine.settlement().approve(&reviewer(), &request.id).await;
    assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));

    let statement = engine.ledger().statement(&alice).await.unwrap();
    assert!(statement
        .transactions
        .iter()
        .all(|t| t.origin.as_ref() != Some(&request.id)));
    assert_eq!(statement.buy_requests[0].status, BuyRequestStatus::Pending);
    assert_eq!(statement.balance.available, Balance::new(dec!(10)));

    // Once funded, the same request settles normally
    fund(&engine, &alice, dec!(20)).await;
    engine.settlement().approve(&reviewer(), &request.id).await.unwrap();
    assert_eq!(engine.ledger().available_balance(&alice).await.unwrap(), Balance::ZERO);
}

#[tokio::test]
async fn test_buy_settlement_respects_withdrawal_reservation() {
    let engine = engine();
    let alice = account("alice");
    fund(&engine, &alice, dec!(100)).await;
    engine
        .withdrawals()
        .submit(
            &alice,
            dec!(80),
            custody_ledger::domain::withdrawal::WithdrawalMethod::Bank,
            &custody_ledger::domain::payment::PaymentDetails::new(),
        )
        .await
        .unwrap();
    let request = engine.settlement().request(&alice, "BTC", dec!(30)).await.unwrap();

    let result = engine.settlement().approve(&reviewer(), &request.id).await;
    assert!(matches!(
        result,
        Err(LedgerError::InsufficientBalance { requested, available })
            if requested == dec!(30) && available == dec!(20)
    ));
}

#[tokio::test]
async fn test_purged_request_is_stale() {
    let engine = engine();
    let alice = account("alice");
    fund(&engine, &alice, dec!(100)).await;
    let request = engine.settlement().request(&alice, "BTC", dec!(30)).await.unwrap();

    engine.directory().purge(&reviewer(), &alice).await.unwrap();

    let result = engine.settlement().approve(&reviewer(), &request.id).await;
    assert!(matches!(result, Err(LedgerError::StaleRequest(_))));
    assert_eq!(engine.ledger().available_balance(&alice).await.unwrap(), Balance::ZERO);
}
