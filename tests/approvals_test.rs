mod common;

use anyhow::Result;
use common::{customer_with_wallet, fund_wallet, test_service, test_service_with_threshold};
use custodia::application::AppError;
use custodia::domain::TransactionStatus;
use uuid::Uuid;

#[tokio::test]
async fn test_approving_pending_deposit_releases_usable_funds() -> Result<()> {
    // Threshold 400.00 so that 500.00 deposits go pending
    let (service, _temp) = test_service_with_threshold(400_00).await?;
    let (customer, wallet) = customer_with_wallet(&service).await?;

    // balance 2000.00, usable 1000.00, two pending deposits of 500.00 each
    fund_wallet(&service, wallet.id, 1000_00).await?;
    service.deposit(wallet.id, 500_00, "PAY111111").await?;
    let target = service.deposit(wallet.id, 500_00, "PAY222222").await?;
    assert_eq!(target.status, TransactionStatus::Pending);

    let before = service.get_wallet(wallet.id, customer.id).await?;
    assert_eq!(before.balance_cents, 2000_00);
    assert_eq!(before.usable_balance_cents, 1000_00);

    service
        .settle_transaction(target.id, TransactionStatus::Approved)
        .await?;

    // Approval releases the amount into the usable balance only
    let after = service.get_wallet(wallet.id, customer.id).await?;
    assert_eq!(after.balance_cents, 2000_00);
    assert_eq!(after.usable_balance_cents, 1500_00);

    let settled = service.get_transaction(target.id).await?;
    assert_eq!(settled.status, TransactionStatus::Approved);

    Ok(())
}

#[tokio::test]
async fn test_approving_pending_withdrawal_debits_total_balance() -> Result<()> {
    let (service, _temp) = test_service_with_threshold(400_00).await?;
    let (customer, wallet) = customer_with_wallet(&service).await?;

    // balance 2000.00, usable 1000.00, two pending withdrawals of 500.00 each
    fund_wallet(&service, wallet.id, 2000_00).await?;
    service.withdraw(wallet.id, 500_00, "PAY111111").await?;
    let target = service.withdraw(wallet.id, 500_00, "PAY222222").await?;
    assert_eq!(target.status, TransactionStatus::Pending);

    let before = service.get_wallet(wallet.id, customer.id).await?;
    assert_eq!(before.balance_cents, 2000_00);
    assert_eq!(before.usable_balance_cents, 1000_00);

    service
        .settle_transaction(target.id, TransactionStatus::Approved)
        .await?;

    // Approval debits the total; the reservation already happened
    let after = service.get_wallet(wallet.id, customer.id).await?;
    assert_eq!(after.balance_cents, 1500_00);
    assert_eq!(after.usable_balance_cents, 1000_00);

    Ok(())
}

#[tokio::test]
async fn test_denying_pending_deposit_reverts_total_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (customer, wallet) = customer_with_wallet(&service).await?;
    fund_wallet(&service, wallet.id, 300_00).await?;

    let pending = service.deposit(wallet.id, 1500_00, "PAY123456").await?;
    assert_eq!(pending.status, TransactionStatus::Pending);

    let during = service.get_wallet(wallet.id, customer.id).await?;
    assert_eq!(during.balance_cents, 1800_00);
    assert_eq!(during.usable_balance_cents, 300_00);

    service
        .settle_transaction(pending.id, TransactionStatus::Denied)
        .await?;

    // Denial backs the provisional credit out; usable was never touched
    let after = service.get_wallet(wallet.id, customer.id).await?;
    assert_eq!(after.balance_cents, 300_00);
    assert_eq!(after.usable_balance_cents, 300_00);

    Ok(())
}

#[tokio::test]
async fn test_denying_pending_withdrawal_releases_reservation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (customer, wallet) = customer_with_wallet(&service).await?;
    fund_wallet(&service, wallet.id, 2000_00).await?;

    let pending = service
        .withdraw(wallet.id, 1500_00, "TR123456789012345678901234")
        .await?;
    assert_eq!(pending.status, TransactionStatus::Pending);

    service
        .settle_transaction(pending.id, TransactionStatus::Denied)
        .await?;

    // Denial releases the reserved funds; the total never moved
    let after = service.get_wallet(wallet.id, customer.id).await?;
    assert_eq!(after.balance_cents, 2000_00);
    assert_eq!(after.usable_balance_cents, 2000_00);

    Ok(())
}

#[tokio::test]
async fn test_approving_pending_deposit_roundtrip_with_default_threshold() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (customer, wallet) = customer_with_wallet(&service).await?;
    fund_wallet(&service, wallet.id, 500_00).await?;

    let pending = service.deposit(wallet.id, 1200_00, "PAY123456").await?;
    service
        .settle_transaction(pending.id, TransactionStatus::Approved)
        .await?;

    let after = service.get_wallet(wallet.id, customer.id).await?;
    assert_eq!(after.balance_cents, 1700_00);
    assert_eq!(after.usable_balance_cents, 1700_00);

    Ok(())
}

#[tokio::test]
async fn test_settling_terminal_transaction_fails_without_balance_change() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (customer, wallet) = customer_with_wallet(&service).await?;
    fund_wallet(&service, wallet.id, 2000_00).await?;

    let pending = service.withdraw(wallet.id, 1500_00, "PAY123456").await?;
    service
        .settle_transaction(pending.id, TransactionStatus::Denied)
        .await?;

    let before = service.get_wallet(wallet.id, customer.id).await?;

    // Denying or approving again must fail: terminal states are final
    let err = service
        .settle_transaction(pending.id, TransactionStatus::Denied)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState));

    let err = service
        .settle_transaction(pending.id, TransactionStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState));

    let after = service.get_wallet(wallet.id, customer.id).await?;
    assert_eq!(after.balance_cents, before.balance_cents);
    assert_eq!(after.usable_balance_cents, before.usable_balance_cents);

    Ok(())
}

#[tokio::test]
async fn test_settling_auto_approved_transaction_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, wallet) = customer_with_wallet(&service).await?;

    let approved = service.deposit(wallet.id, 200_00, "PAY123456").await?;
    assert_eq!(approved.status, TransactionStatus::Approved);

    let err = service
        .settle_transaction(approved.id, TransactionStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState));

    Ok(())
}

#[tokio::test]
async fn test_settling_missing_transaction_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service
        .settle_transaction(Uuid::new_v4(), TransactionStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TransactionNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_pending_is_not_a_valid_decision() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, wallet) = customer_with_wallet(&service).await?;

    let pending = service.deposit(wallet.id, 1500_00, "PAY123456").await?;

    let err = service
        .settle_transaction(pending.id, TransactionStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidDecision(_)));

    // The transaction is untouched
    let unchanged = service.get_transaction(pending.id).await?;
    assert_eq!(unchanged.status, TransactionStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn test_settlement_bumps_updated_at() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, wallet) = customer_with_wallet(&service).await?;

    let pending = service.deposit(wallet.id, 1500_00, "PAY123456").await?;
    let settled = service
        .settle_transaction(pending.id, TransactionStatus::Approved)
        .await?;

    assert!(settled.updated_at >= pending.updated_at);
    assert_eq!(settled.created_at, pending.created_at);
    assert_eq!(settled.amount_cents, pending.amount_cents);
    assert_eq!(settled.kind, pending.kind);

    Ok(())
}

#[tokio::test]
async fn test_pending_queue_shrinks_as_settlements_land() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, wallet) = customer_with_wallet(&service).await?;

    let first = service.deposit(wallet.id, 1500_00, "PAY111111").await?;
    service.deposit(wallet.id, 2000_00, "PAY222222").await?;
    service.deposit(wallet.id, 100_00, "PAY333333").await?; // auto-approved

    let queue = service.list_pending_transactions(wallet.id).await?;
    assert_eq!(queue.len(), 2);
    // Oldest first: employees settle in arrival order
    assert_eq!(queue[0].id, first.id);

    service
        .settle_transaction(first.id, TransactionStatus::Approved)
        .await?;

    let queue = service.list_pending_transactions(wallet.id).await?;
    assert_eq!(queue.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_transactions_listed_newest_first() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (_, wallet) = customer_with_wallet(&service).await?;

    service.deposit(wallet.id, 100_00, "PAY1").await?;
    service.deposit(wallet.id, 200_00, "PAY2").await?;
    service.withdraw(wallet.id, 50_00, "PAY3").await?;

    let transactions = service.list_transactions(wallet.id).await?;
    assert_eq!(transactions.len(), 3);
    for pair in transactions.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }

    Ok(())
}
