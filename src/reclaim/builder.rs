use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::Transaction;
use spl_token::instruction::close_account;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to build close instruction: {0}")]
    Instruction(String),

    #[error("Failed to sign transaction: {0}")]
    Signing(String),
}

/// Builds close-and-transfer transactions. The output carries no blockhash;
/// the executor anchors and signs it right before submission.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    priority_fee_micro_lamports: u64,
}

impl TransactionBuilder {
    pub fn new(priority_fee_micro_lamports: u64) -> Self {
        Self {
            priority_fee_micro_lamports,
        }
    }

    /// Priority fee first, then the SPL token close instruction.
    pub fn build_instructions(
        &self,
        account_to_close: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
    ) -> Result<Vec<Instruction>, BuildError> {
        let priority_fee =
            ComputeBudgetInstruction::set_compute_unit_price(self.priority_fee_micro_lamports);

        let close = close_account(
            &spl_token::id(),
            account_to_close,
            destination,
            authority,
            &[],
        )
        .map_err(|e| BuildError::Instruction(e.to_string()))?;

        Ok(vec![priority_fee, close])
    }

    /// Unsigned transaction paid for by `authority`.
    pub fn build(
        &self,
        account_to_close: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
    ) -> Result<Transaction, BuildError> {
        let instructions = self.build_instructions(account_to_close, destination, authority)?;
        Ok(Transaction::new_with_payer(&instructions, Some(authority)))
    }

    /// Anchor the transaction to `recent_blockhash` and attach signatures.
    pub fn sign(
        &self,
        transaction: &mut Transaction,
        signers: &[&Keypair],
        recent_blockhash: Hash,
    ) -> Result<(), BuildError> {
        transaction
            .try_sign(signers, recent_blockhash)
            .map_err(|e| BuildError::Signing(e.to_string()))
    }

    pub fn priority_fee_micro_lamports(&self) -> u64 {
        self.priority_fee_micro_lamports
    }
}
