//! Trade composition
//!
//! [`Composer`] drives one trade from request to packaged transactions:
//! wallet check, appraisal gate, account derivation, amount adjustment,
//! instruction assembly, then v0 compilation against the two lookup tables.

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    hash::Hash,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use tracing::{debug, info, warn, Instrument};

use super::amounts::FeeSchedule;
use super::appraisal::{ensure_appraisal, AppraisalClient, AppraisalOutcome, AppraisalTarget};
use super::context::{PoolContext, TradeAccounts, TradeAction, TradeRequest};
use super::errors::ComposeError;
use super::instructions::{
    init_fee_instruction, layout_metas, plan_trade_instructions, sanity_check_ix_order,
    trade_instruction, InstructionPlan, TradeArgs,
};
use super::lookup_table::programs_table;
use super::output::{unsigned_versioned, ComposeFailure, ComposedTransaction, TransactionResult};
use super::remaining;
use super::venue::{TradeSide, Venue, VenueKind, VenueStrategy};
use crate::chain::{AccountLookup, ChainClient};
use crate::config::{AppraisalConfig, ComposerConfig, ComputeConfig, Deployment};
use crate::observability::TraceContext;
use crate::types::{NftMetadata, PriorityFee};
use crate::wallet::WalletSigner;

/// Fractions are counted in hundredths on chain
pub const FRACTION_UNITS: u64 = 100;

/// Builds trade transactions for one deployment
pub struct Composer {
    deployment: Deployment,
    compute: ComputeConfig,
    fees: FeeSchedule,
    appraisal_config: AppraisalConfig,
    chain: Arc<dyn ChainClient>,
    appraisal: AppraisalClient,
}

impl Composer {
    pub fn new(
        deployment: Deployment,
        compute: ComputeConfig,
        fees: FeeSchedule,
        appraisal_config: AppraisalConfig,
        chain: Arc<dyn ChainClient>,
        appraisal: AppraisalClient,
    ) -> Self {
        Self {
            deployment,
            compute,
            fees,
            appraisal_config,
            chain,
            appraisal,
        }
    }

    pub fn from_config(config: &ComposerConfig, chain: Arc<dyn ChainClient>) -> Result<Self, ComposeError> {
        let appraisal = AppraisalClient::new(
            &config.service.api_url,
            Duration::from_secs(config.service.timeout_secs),
        )?;
        Ok(Self::new(
            config.deployment.clone(),
            config.compute.clone(),
            config.fees.clone(),
            config.appraisal.clone(),
            chain,
            appraisal,
        ))
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// Buy `num_fractions` of an asset
    #[allow(clippy::too_many_arguments)]
    pub async fn buy(
        &self,
        wallet: Option<&dyn WalletSigner>,
        venue: Venue,
        ctx: &PoolContext,
        metadata: &NftMetadata,
        num_fractions: u64,
        max_sol_to_spend: Option<f64>,
        do_swap: bool,
        priority_fee: Option<PriorityFee>,
    ) -> Result<TransactionResult, ComposeError> {
        let request = TradeRequest {
            venue,
            action: TradeAction::Buy {
                num_fractions,
                max_sol_to_spend,
            },
            do_swap,
            priority_fee,
        };
        self.compose(wallet, &request, ctx, metadata).await
    }

    /// Sell an asset's fractions
    #[allow(clippy::too_many_arguments)]
    pub async fn sell(
        &self,
        wallet: Option<&dyn WalletSigner>,
        venue: Venue,
        ctx: &PoolContext,
        metadata: &NftMetadata,
        min_sol_received: Option<f64>,
        do_swap: bool,
        priority_fee: Option<PriorityFee>,
    ) -> Result<TransactionResult, ComposeError> {
        let request = TradeRequest {
            venue,
            action: TradeAction::Sell { min_sol_received },
            do_swap,
            priority_fee,
        };
        self.compose(wallet, &request, ctx, metadata).await
    }

    /// Compose the transactions for a trade
    ///
    /// A missing wallet is reported in the result, not as an error. Errors
    /// are reserved for bad inputs and chain reads that failed.
    pub async fn compose(
        &self,
        wallet: Option<&dyn WalletSigner>,
        request: &TradeRequest,
        ctx: &PoolContext,
        metadata: &NftMetadata,
    ) -> Result<TransactionResult, ComposeError> {
        let trace = TraceContext::new("compose");
        let span = trace.span();
        async move {
            let Some(wallet) = wallet else {
                info!("no wallet connected");
                return Ok(TransactionResult::failed(ComposeFailure::NoWallet, None));
            };
            let result = self.compose_with_wallet(&trace, wallet, request, ctx, metadata).await;
            match &result {
                Ok(r) => info!(
                    transactions = r.transactions.len(),
                    status = r.status,
                    elapsed_ms = trace.elapsed_ms() as u64,
                    "composition finished"
                ),
                Err(e) => warn!(error = %e, category = e.category(), "composition failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn compose_with_wallet(
        &self,
        trace: &TraceContext,
        wallet: &dyn WalletSigner,
        request: &TradeRequest,
        ctx: &PoolContext,
        metadata: &NftMetadata,
    ) -> Result<TransactionResult, ComposeError> {
        let strategy = request.venue.strategy();
        let side = request.action.side();
        let payer = wallet.pubkey();

        // Sells mint a single-use fraction mint seeded by a fresh nonce
        let nonce = match side {
            TradeSide::Buy => None,
            TradeSide::Sell => Some(Keypair::new().pubkey().to_bytes()),
        };
        let accounts = strategy.derive_accounts(&self.deployment, ctx, metadata, &payer, side, nonce)?;
        debug!(
            venue = %strategy.kind(),
            ?side,
            pool_mint = %accounts.pool_mint,
            fractions_mint = %accounts.fractions_mint,
            "accounts derived"
        );

        let outcome = ensure_appraisal(
            self.chain.as_ref(),
            &self.appraisal,
            wallet,
            &self.deployment,
            &AppraisalTarget::from(&accounts),
            false,
        )
        .instrument(trace.child_span("appraisal").span())
        .await?;
        if let AppraisalOutcome::Failed { reason } = &outcome {
            if self.appraisal_config.block_on_failure {
                return Ok(TransactionResult::failed(
                    ComposeFailure::AppraisalBlocked(reason.clone()),
                    Some(outcome),
                ));
            }
        }

        let trade_ix = self.trade_instruction(strategy.as_ref(), request, &accounts, ctx, metadata)?;
        let prerequisite = self.fee_prerequisite(strategy.as_ref(), side, &accounts).await?;

        let cu_limit = match strategy.kind() {
            VenueKind::Direct => self.compute.direct_unit_limit,
            VenueKind::Orca | VenueKind::Raydium => self.compute.venue_unit_limit,
        };
        let priority = request.priority_fee.unwrap_or(match strategy.kind() {
            VenueKind::Direct => PriorityFee::None,
            VenueKind::Orca | VenueKind::Raydium => self.compute.default_priority_fee,
        });
        let plan = plan_trade_instructions(cu_limit, priority.micro_lamports(), prerequisite, trade_ix)?;

        let blockhash = self.chain.latest_blockhash().await?;
        let tables = [programs_table(&self.deployment), ctx.lookup_table.to_account()];
        let transactions = {
            let _package = trace.child_span("package").span().entered();
            package(
                outcome.prepended().cloned(),
                &payer,
                plan,
                &self.deployment.compose_program,
                &tables,
                blockhash,
            )?
        };
        let steps = step_labels(&transactions, side, &metadata.asset_name());

        Ok(TransactionResult {
            transactions,
            steps,
            status: true,
            failure: None,
            appraisal: Some(outcome),
        })
    }

    fn trade_instruction(
        &self,
        strategy: &dyn VenueStrategy,
        request: &TradeRequest,
        accounts: &TradeAccounts,
        ctx: &PoolContext,
        metadata: &NftMetadata,
    ) -> Result<solana_sdk::instruction::Instruction, ComposeError> {
        let side = request.action.side();
        let bound = strategy.adjust_amount(&self.fees, side, request.action.user_bound());
        let limit = strategy.sqrt_price_limit(side);

        let args = match &request.action {
            TradeAction::Buy { num_fractions, .. } => {
                TradeArgs::buy(fraction_amount(*num_fractions)?, bound, limit, request.do_swap)
            }
            TradeAction::Sell { .. } => {
                let nonce = accounts.nonce.ok_or_else(|| {
                    ComposeError::instruction_failed(
                        self.deployment.compose_program.to_string(),
                        "sell accounts carry no nonce",
                    )
                })?;
                TradeArgs::sell(nonce, bound, limit, request.do_swap)
            }
        };

        let named = layout_metas(strategy.layout(side), |slot| accounts.resolve(slot, &self.deployment));
        let tail = remaining::assemble(strategy, side, accounts, &ctx.lookup_table, metadata, &self.deployment)?;
        debug!(
            entry_point = strategy.entry_point(side),
            bound,
            named = named.len(),
            remaining = tail.len(),
            "trade instruction assembled"
        );
        trade_instruction(&self.deployment, strategy.entry_point(side), &args, named, tail)
    }

    async fn fee_prerequisite(
        &self,
        strategy: &dyn VenueStrategy,
        side: TradeSide,
        accounts: &TradeAccounts,
    ) -> Result<Option<solana_sdk::instruction::Instruction>, ComposeError> {
        if !strategy.requires_fee_record(side) {
            return Ok(None);
        }
        match self.chain.lookup_account(&accounts.fee_record).await? {
            AccountLookup::Found(_) => Ok(None),
            AccountLookup::Missing => {
                info!(fee_record = %accounts.fee_record, "fee record missing, adding init_fee");
                init_fee_instruction(
                    &self.deployment,
                    &accounts.initializer,
                    &accounts.fee_record,
                    &accounts.pool_mint,
                    &accounts.fee_collector,
                )
                .map(Some)
            }
        }
    }
}

/// Whole fractions to on-chain units
pub fn fraction_amount(num_fractions: u64) -> Result<u64, ComposeError> {
    num_fractions.checked_mul(FRACTION_UNITS).ok_or_else(|| {
        ComposeError::InvalidAmount(format!("{} fractions overflow u64 units", num_fractions))
    })
}

/// Sequence the bundle: appraisal first when present, trade last
///
/// The trade is compiled into a v0 message against exactly the given lookup
/// tables and left unsigned.
pub fn package(
    appraisal: Option<Transaction>,
    payer: &Pubkey,
    plan: InstructionPlan,
    trade_program: &Pubkey,
    tables: &[AddressLookupTableAccount],
    blockhash: Hash,
) -> Result<Vec<ComposedTransaction>, ComposeError> {
    sanity_check_ix_order(&plan.instructions, trade_program)?;

    let message = v0::Message::try_compile(payer, &plan.instructions, tables, blockhash)
        .map_err(|e| ComposeError::MessageCompile(e.to_string()))?;
    let trade = unsigned_versioned(VersionedMessage::V0(message));

    let mut transactions = Vec::with_capacity(2);
    if let Some(tx) = appraisal {
        transactions.push(ComposedTransaction::Appraisal(tx));
    }
    transactions.push(ComposedTransaction::Trade(trade));
    Ok(transactions)
}

/// One progress label per transaction
pub fn step_labels(transactions: &[ComposedTransaction], side: TradeSide, asset_name: &str) -> Vec<String> {
    transactions
        .iter()
        .map(|tx| match (tx, side) {
            (ComposedTransaction::Appraisal(_), _) => format!("Appraising {}", asset_name),
            (ComposedTransaction::Trade(_), TradeSide::Buy) => format!("Buying {}", asset_name),
            (ComposedTransaction::Trade(_), TradeSide::Sell) => format!("Selling {}", asset_name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        compute_budget::ComputeBudgetInstruction,
        instruction::{AccountMeta, Instruction},
        message::Message,
    };

    fn trade(program: Pubkey, payer: Pubkey) -> Instruction {
        Instruction::new_with_bytes(program, &[1], vec![AccountMeta::new(payer, true)])
    }

    #[test]
    fn test_fraction_amount() {
        assert_eq!(fraction_amount(3).unwrap(), 300);
        assert!(matches!(
            fraction_amount(u64::MAX),
            Err(ComposeError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_package_orders_appraisal_first() {
        let payer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let plan = plan_trade_instructions(800_000, 1, None, trade(program, payer)).unwrap();
        let appraisal = Transaction::new_unsigned(Message::new(&[trade(Pubkey::new_unique(), payer)], Some(&payer)));

        let txs = package(Some(appraisal), &payer, plan, &program, &[], Hash::new_unique()).unwrap();

        assert_eq!(txs.len(), 2);
        assert!(matches!(txs[0], ComposedTransaction::Appraisal(_)));
        assert!(txs[1].is_trade());
        assert_eq!(
            step_labels(&txs, TradeSide::Sell, "Bear #1"),
            vec!["Appraising Bear #1".to_string(), "Selling Bear #1".to_string()]
        );
    }

    #[test]
    fn test_package_rejects_bad_order() {
        let payer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let plan = InstructionPlan::new(
            vec![
                trade(program, payer),
                ComputeBudgetInstruction::set_compute_unit_limit(1),
                ComputeBudgetInstruction::set_compute_unit_price(1),
            ],
            false,
        );
        let result = package(None, &payer, plan, &program, &[], Hash::new_unique());
        if cfg!(debug_assertions) {
            assert!(matches!(result, Err(ComposeError::InvalidInstructionOrder(_))));
        }
    }

    #[test]
    fn test_trade_only_labels() {
        let payer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let plan = plan_trade_instructions(800_000, 1, None, trade(program, payer)).unwrap();
        let txs = package(None, &payer, plan, &program, &[], Hash::new_unique()).unwrap();
        assert_eq!(step_labels(&txs, TradeSide::Buy, "X"), vec!["Buying X".to_string()]);
    }
}
