//! Withdrawal workflow
//!
//! Two entry paths feed one state machine. A direct request starts in
//! `Pending` and is approved or rejected by an operator. An assisted
//! request starts in `PendingAssistance`; an operator moves it to
//! `AwaitingUserConfirmation` and only the requesting wallet may
//! confirm it from there.
//!
//! Funds are never debited at request time. The debit happens exactly
//! once, atomically with the transition into `Approved`, after the
//! balance has been re-validated against the requested amount.

use crate::{transfer::debit_platform_balance, AccountEngine, Error, Result};
use chrono::Utc;
use ledger_store::{WalletAddress, WithdrawalRequest, WithdrawalStatus};
use rust_decimal::Decimal;
use uuid::Uuid;

impl AccountEngine {
    /// Submit a direct withdrawal request
    pub async fn request_withdrawal(
        &self,
        wallet: &str,
        amount: Decimal,
    ) -> Result<WithdrawalRequest> {
        self.submit_request(wallet, amount, WithdrawalStatus::Pending, None)
            .await
    }

    /// Submit an assisted withdrawal request with a message for the
    /// operator
    pub async fn request_assisted_withdrawal(
        &self,
        wallet: &str,
        amount: Decimal,
        message: &str,
    ) -> Result<WithdrawalRequest> {
        self.submit_request(
            wallet,
            amount,
            WithdrawalStatus::PendingAssistance,
            Some(message.to_string()),
        )
        .await
    }

    async fn submit_request(
        &self,
        wallet: &str,
        amount: Decimal,
        status: WithdrawalStatus,
        user_message: Option<String>,
    ) -> Result<WithdrawalRequest> {
        let wallet = WalletAddress::new(wallet);
        let user = self.store().get_user(&wallet)?;

        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "withdrawal amount must be positive: {}",
                amount
            )));
        }
        if amount > user.eth_balance {
            return Err(Error::InsufficientBalance {
                requested: amount,
                available: user.eth_balance,
            });
        }

        let request = WithdrawalRequest {
            id: Uuid::now_v7(),
            user_wallet: wallet.clone(),
            amount,
            status,
            user_message,
            timestamp: Utc::now(),
            version: 0,
        };

        let request = self.store().insert_withdrawal(request).await?;
        tracing::info!(wallet = %wallet, %amount, status = %request.status, "Withdrawal requested");
        Ok(request)
    }

    /// Operator transition of a withdrawal request.
    ///
    /// Approval is only accepted from `Pending`; requests sitting in
    /// `AwaitingUserConfirmation` belong to the owning wallet and must
    /// go through [`confirm_assisted_withdrawal`].
    ///
    /// [`confirm_assisted_withdrawal`]: AccountEngine::confirm_assisted_withdrawal
    pub async fn set_withdrawal_status(
        &self,
        request_id: Uuid,
        status: WithdrawalStatus,
    ) -> Result<WithdrawalRequest> {
        let mut request = self.store().get_withdrawal(request_id)?;
        let from = request.status;

        let operator_legal = from.can_transition_to(status)
            && !(status == WithdrawalStatus::Approved
                && from == WithdrawalStatus::AwaitingUserConfirmation);
        if !operator_legal {
            return Err(Error::IllegalTransition { from, to: status });
        }

        if status == WithdrawalStatus::Approved {
            return self.approve(request).await;
        }

        request.status = status;
        let request = self.store().put_withdrawal(request).await?;
        tracing::info!(id = %request.id, %from, to = %status, "Withdrawal transitioned");
        Ok(request)
    }

    /// Confirm an assisted withdrawal, by the requesting wallet only
    pub async fn confirm_assisted_withdrawal(
        &self,
        request_id: Uuid,
        wallet: &str,
    ) -> Result<WithdrawalRequest> {
        let request = self.store().get_withdrawal(request_id)?;
        let wallet = WalletAddress::new(wallet);

        if request.user_wallet != wallet {
            return Err(Error::NotRequestOwner {
                request: request_id,
                wallet: wallet.to_string(),
            });
        }
        if request.status != WithdrawalStatus::AwaitingUserConfirmation {
            return Err(Error::IllegalTransition {
                from: request.status,
                to: WithdrawalStatus::Approved,
            });
        }

        self.approve(request).await
    }

    /// Re-validate the balance and debit it atomically with the move
    /// into `Approved`
    async fn approve(&self, mut request: WithdrawalRequest) -> Result<WithdrawalRequest> {
        let mut user = self.store().get_user(&request.user_wallet)?;

        debit_platform_balance(&mut user, request.amount)?;
        user.last_active = Utc::now();
        request.status = WithdrawalStatus::Approved;

        let (_, request) = self.store().finalize_withdrawal(user, request).await?;
        tracing::info!(id = %request.id, amount = %request.amount, "Withdrawal approved");
        Ok(request)
    }

    /// Withdrawal requests for one wallet
    pub fn list_withdrawals_for_user(&self, wallet: &str) -> Result<Vec<WithdrawalRequest>> {
        Ok(self
            .store()
            .withdrawals_for_user(&WalletAddress::new(wallet))?)
    }
}
