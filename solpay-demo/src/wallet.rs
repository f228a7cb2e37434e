//! The customer side: a wallet paying a `solana:` link.

use solpay::ledger::{CreateTransferFields, TransactionSender, TransferBuilder};
use solpay::{Amount, Signature};

use crate::error::DemoError;
use crate::keypair::Keypair;

/// Amount paid when the link leaves it to the wallet: 0.05 SOL.
#[must_use]
pub fn default_wallet_amount() -> Amount {
    Amount::from_units(5, 2)
}

/// Parses `url`, builds the transfer it asks for, signs it with `payer` and
/// sends it.
///
/// # Errors
///
/// Returns [`DemoError`] if the link is invalid or the cluster refuses the
/// transfer.
pub async fn simulate_wallet_interaction<C>(
    cluster: &C,
    url: &str,
    payer: &Keypair,
) -> Result<Signature, DemoError>
where
    C: TransferBuilder + TransactionSender,
{
    let request = solpay::uri::parse_url(url)?;
    tracing::info!(
        label = request.label().unwrap_or_default(),
        message = request.message().unwrap_or_default(),
        "Wallet received payment request"
    );

    let sender = payer.pubkey();
    let transfer = cluster
        .create_transfer(
            &sender,
            CreateTransferFields {
                recipient: request.recipient(),
                amount: request.amount().cloned().unwrap_or_else(default_wallet_amount),
                spl_token: request.spl_token(),
                reference: request.reference().map(<[_]>::to_vec),
                memo: request.memo().map(str::to_owned),
            },
        )
        .await?;

    let signature = cluster.send_and_confirm(transfer.sign(sender)?).await?;
    tracing::info!(%signature, "Wallet sent transfer");
    Ok(signature)
}
