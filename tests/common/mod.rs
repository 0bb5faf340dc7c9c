// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use custodia::application::{CounterMetrics, MetricsSink, ServiceConfig, WalletService};
use custodia::domain::{Cents, Currency, Customer, Wallet, WalletId};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(WalletService, TempDir)> {
    test_service_with_threshold(1000_00).await
}

/// Helper to create a test service with a custom pending threshold
pub async fn test_service_with_threshold(
    pending_threshold: Cents,
) -> Result<(WalletService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service =
        WalletService::init(db_path.to_str().unwrap(), ServiceConfig { pending_threshold }).await?;
    Ok((service, temp_dir))
}

/// Helper to create a test service with counter metrics attached
pub async fn test_service_with_metrics() -> Result<(WalletService, Arc<CounterMetrics>, TempDir)> {
    let (service, temp_dir) = test_service().await?;
    let metrics = Arc::new(CounterMetrics::new());
    Ok((
        service.with_metrics(Arc::clone(&metrics) as Arc<dyn MetricsSink>),
        metrics,
        temp_dir,
    ))
}

/// Test fixture: one customer with one TRY wallet, both capabilities on.
pub async fn customer_with_wallet(service: &WalletService) -> Result<(Customer, Wallet)> {
    let customer = service
        .create_customer("Ahmet".into(), "Yilmaz".into(), "12345678901".into())
        .await?;
    let wallet = service
        .create_wallet(
            customer.id,
            "Main Wallet".into(),
            Currency::Try,
            true,
            true,
        )
        .await?;
    Ok((customer, wallet))
}

/// Test fixture: a wallet with selectable capability flags.
pub async fn wallet_with_capabilities(
    service: &WalletService,
    shopping: bool,
    withdraw: bool,
) -> Result<(Customer, Wallet)> {
    let customer = service
        .create_customer("Fatma".into(), "Demir".into(), "12345678902".into())
        .await?;
    let wallet = service
        .create_wallet(
            customer.id,
            "Gated Wallet".into(),
            Currency::Try,
            shopping,
            withdraw,
        )
        .await?;
    Ok((customer, wallet))
}

/// Fund a wallet with settled (auto-approved) deposits. Chunks stay small
/// enough to auto-approve under any threshold the tests use.
pub async fn fund_wallet(service: &WalletService, wallet_id: WalletId, amount: Cents) -> Result<()> {
    let mut remaining = amount;
    while remaining > 0 {
        let chunk = remaining.min(100_00);
        service.deposit(wallet_id, chunk, "PAY-FUNDING").await?;
        remaining -= chunk;
    }
    Ok(())
}
