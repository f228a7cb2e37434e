//! The end-to-end payment flow.
//!
//! 1. Establish a connection to the cluster
//! 2. Simulate a customer checkout
//! 3. Create a payment request link
//! 4. Simulate the wallet paying it
//! 5. Find the transaction by its reference
//! 6. Validate the transaction against the request

use std::sync::Arc;

use solpay::ledger::ValidateTransferFields;
use solpay::{Address, PaymentStatus, PaymentWatcher, Signature, WatchError};
use tokio_util::sync::CancellationToken;

use crate::checkout::simulate_checkout;
use crate::cluster::SimulatedCluster;
use crate::config::DemoConfig;
use crate::error::DemoError;
use crate::keypair::Keypair;
use crate::wallet::simulate_wallet_interaction;

/// Outcome of a completed flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Signature of the validated payment.
    pub signature: Signature,
    /// Every status the payment went through, in order.
    pub progress: Vec<PaymentStatus>,
}

/// Runs the whole flow: `payer` buys the configured checkout from `recipient`.
///
/// When the checkout is priced in an SPL token, the payer is minted
/// `config.airdrop` of that token alongside the SOL airdrop.
///
/// # Errors
///
/// Returns [`DemoError`] for the first step that fails. A payment that is
/// found but does not validate is an error.
pub async fn run(
    config: &DemoConfig,
    recipient: Address,
    payer: &Keypair,
    cancel: CancellationToken,
) -> Result<Receipt, DemoError> {
    tracing::info!(%recipient, payer = %payer.pubkey(), "Simulating a Solana Pay flow");

    tracing::info!("1. Establish connection to the cluster");
    let cluster = Arc::new(SimulatedCluster::connect(config));
    cluster.airdrop(payer.pubkey(), config.airdrop.clone()).await;
    if let Some(mint) = config.checkout.spl_token {
        cluster
            .mint_to(payer.pubkey(), mint, config.airdrop.clone())
            .await;
    }

    tracing::info!("2. Simulate a customer checkout");
    let checkout = simulate_checkout(recipient, &config.checkout);

    tracing::info!("3. Create a payment request link");
    tracing::info!(url = %checkout.url, "Payment request link");

    tracing::info!("4. Simulate wallet interaction");
    simulate_wallet_interaction(&*cluster, checkout.url.as_str(), payer).await?;

    let watcher = PaymentWatcher::new(
        Arc::clone(&cluster),
        Arc::clone(&cluster),
        config.watch_config(),
    )
    .with_cancellation(cancel);
    let mut progress = Vec::with_capacity(3);
    let mut record = |status: PaymentStatus| {
        tracing::info!(status = ?status, "Payment status");
        progress.push(status);
    };
    record(watcher.status());

    tracing::info!("5. Find the transaction");
    let reference = checkout.request.reference().ok_or(WatchError::MissingReference)?;
    let found = watcher.wait_for_signature(reference).await;
    record(watcher.status());
    let signature = found.inspect_err(|e| tracing::error!(error = %e, "Payment failed"))?;

    tracing::info!("6. Validate transaction");
    let validated = watcher
        .validate(&signature, &ValidateTransferFields::from(&checkout.request))
        .await;
    record(watcher.status());
    validated.inspect_err(|e| tracing::error!(error = %e, "Payment failed"))?;

    tracing::info!(%signature, "Payment validated");
    tracing::info!("Ship order to customer");
    Ok(Receipt {
        signature,
        progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use solpay::Amount;

    fn config() -> DemoConfig {
        DemoConfig {
            cluster: "localnet".to_owned(),
            confirmation_polls: 3,
            ..DemoConfig::default()
        }
    }

    fn payer() -> Keypair {
        Keypair::from_bytes(&[5; 64]).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_flow_validates_payment() {
        let receipt = run(
            &config(),
            Address::new([2; 32]),
            &payer(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(
            receipt.progress,
            vec![
                PaymentStatus::Pending,
                PaymentStatus::Confirmed(receipt.signature),
                PaymentStatus::Validated(receipt.signature),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_flow_pays_in_spl_token() {
        let mut config = config();
        config.checkout.spl_token = Some(Address::new([7; 32]));

        let receipt = run(
            &config,
            Address::new([2; 32]),
            &payer(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(
            receipt.progress.last(),
            Some(&PaymentStatus::Validated(receipt.signature))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_flow_fails_when_payer_cannot_afford_checkout() {
        let mut config = config();
        config.airdrop = Amount::from_units(1, 2);

        let err = run(
            &config,
            Address::new([2; 32]),
            &payer(),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DemoError::CreateTransfer(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flow_honours_cancellation() {
        let token = CancellationToken::new();
        token.cancel();

        let err = run(&config(), Address::new([2; 32]), &payer(), token)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DemoError::Watch(WatchError::Cancelled { polls: 0 })
        ));
    }
}
