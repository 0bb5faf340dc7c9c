mod common;

use anyhow::Result;
use common::test_service;
use custodia::domain::Currency;

#[tokio::test]
async fn test_seed_loads_sample_data_once() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(service.seed_demo_data().await?);
    // A second run finds existing customers and loads nothing
    assert!(!service.seed_demo_data().await?);

    let customers = service.list_customers().await?;
    assert_eq!(customers.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_seeded_wallets_have_settled_opening_balances() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.seed_demo_data().await?;

    let customers = service.list_customers().await?;
    let ahmet = customers
        .iter()
        .find(|c| c.national_id == "12345678901")
        .expect("seeded customer");

    let wallets = service.list_wallets(ahmet.id, None).await?;
    assert_eq!(wallets.len(), 2);

    let try_wallets = service.list_wallets(ahmet.id, Some(Currency::Try)).await?;
    assert_eq!(try_wallets.len(), 1);
    let main_wallet = &try_wallets[0];
    assert_eq!(main_wallet.balance_cents, 5000_00);
    assert_eq!(main_wallet.usable_balance_cents, 5000_00);

    // History rows came along
    let transactions = service.list_transactions(main_wallet.id).await?;
    assert_eq!(transactions.len(), 3);

    Ok(())
}
