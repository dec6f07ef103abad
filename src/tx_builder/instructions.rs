//! Instruction encoding, planning and ordering validation
//!
//! Trade transactions always carry instructions in this order:
//! 1. Compute budget instructions (CU limit, CU price)
//! 2. Prerequisites (`init_fee` when the pool's fee record is missing)
//! 3. The compose-program trade instruction
//!
//! Instruction data follows the Anchor convention: an 8-byte discriminator
//! (`sha256("global:<name>")[..8]`) followed by the borsh-encoded arguments.

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use crate::config::Deployment;
use crate::tx_builder::errors::ComposeError;

/// Named account of a compose-program entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Initializer,
    NftMint,
    NftMetadata,
    NftEdition,
    FractionsMint,
    PoolMint,
    VaultAccount,
    PoolAccount,
    InitializerSolTa,
    InitializerNftTa,
    InitializerFractionsTa,
    InitializerPoolTa,
    VaultProgramNftTa,
    VaultProgramFractionsTa,
    Treasury,
    TreasuryPoolFeeTa,
    TreasurySolFeeTa,
    ComposeFeeMint,
    ComposeFeeAccount,
    ComposeFeeSolTa,
    FeeProgram,
    VaultProgram,
    AmmProgram,
    MplTokenMetadata,
    AssociatedTokenProgram,
    TokenProgram,
    SystemProgram,
    Rent,
    Clock,
    InstructionsSysvar,
}

impl Slot {
    /// Writability fixed by the program's account constraints
    ///
    /// Programs, sysvars, the asset mint, the treasury wallet and the fee
    /// mint are only read.
    pub fn is_writable(&self) -> bool {
        !matches!(
            self,
            Slot::NftMint
                | Slot::Treasury
                | Slot::ComposeFeeMint
                | Slot::FeeProgram
                | Slot::VaultProgram
                | Slot::AmmProgram
                | Slot::MplTokenMetadata
                | Slot::AssociatedTokenProgram
                | Slot::TokenProgram
                | Slot::SystemProgram
                | Slot::Rent
                | Slot::Clock
                | Slot::InstructionsSysvar
        )
    }

    pub fn is_signer(&self) -> bool {
        matches!(self, Slot::Initializer)
    }
}

/// Named account order of one entry point
pub type Layout = [Slot];

/// Account layouts of every compose-program entry point
pub mod layout {
    use super::Slot::{self, *};

    pub static DIRECT_BUY: [Slot; 27] = [
        Initializer,
        NftMint,
        FractionsMint,
        PoolMint,
        VaultAccount,
        PoolAccount,
        InitializerSolTa,
        InitializerNftTa,
        InitializerFractionsTa,
        InitializerPoolTa,
        VaultProgramNftTa,
        VaultProgramFractionsTa,
        Treasury,
        TreasuryPoolFeeTa,
        ComposeFeeMint,
        ComposeFeeAccount,
        ComposeFeeSolTa,
        TreasurySolFeeTa,
        FeeProgram,
        VaultProgram,
        AmmProgram,
        MplTokenMetadata,
        AssociatedTokenProgram,
        TokenProgram,
        SystemProgram,
        Rent,
        Clock,
    ];

    pub static DIRECT_SELL: [Slot; 27] = [
        Initializer,
        NftMint,
        FractionsMint,
        PoolMint,
        VaultAccount,
        PoolAccount,
        InitializerSolTa,
        InitializerNftTa,
        InitializerFractionsTa,
        InitializerPoolTa,
        VaultProgramNftTa,
        VaultProgramFractionsTa,
        ComposeFeeMint,
        Treasury,
        ComposeFeeAccount,
        ComposeFeeSolTa,
        TreasurySolFeeTa,
        TreasuryPoolFeeTa,
        FeeProgram,
        VaultProgram,
        AmmProgram,
        MplTokenMetadata,
        AssociatedTokenProgram,
        TokenProgram,
        SystemProgram,
        Rent,
        Clock,
    ];

    pub static RAYDIUM_BUY: [Slot; 23] = [
        Initializer,
        NftMint,
        NftMetadata,
        FractionsMint,
        PoolMint,
        VaultAccount,
        PoolAccount,
        InitializerSolTa,
        InitializerNftTa,
        InitializerFractionsTa,
        InitializerPoolTa,
        VaultProgramNftTa,
        VaultProgramFractionsTa,
        Treasury,
        ComposeFeeMint,
        TreasurySolFeeTa,
        VaultProgram,
        AmmProgram,
        MplTokenMetadata,
        AssociatedTokenProgram,
        TokenProgram,
        SystemProgram,
        Rent,
    ];

    pub static RAYDIUM_SELL: [Slot; 22] = [
        Initializer,
        NftMint,
        FractionsMint,
        PoolMint,
        VaultAccount,
        PoolAccount,
        InitializerSolTa,
        InitializerNftTa,
        InitializerFractionsTa,
        InitializerPoolTa,
        VaultProgramNftTa,
        VaultProgramFractionsTa,
        ComposeFeeMint,
        Treasury,
        TreasurySolFeeTa,
        VaultProgram,
        AmmProgram,
        MplTokenMetadata,
        AssociatedTokenProgram,
        TokenProgram,
        SystemProgram,
        Rent,
    ];

    /// Shared by `orca_buy` and `orca_sell`
    pub static ORCA: [Slot; 26] = [
        Initializer,
        NftMint,
        FractionsMint,
        PoolMint,
        VaultAccount,
        PoolAccount,
        InitializerSolTa,
        InitializerNftTa,
        InitializerFractionsTa,
        InitializerPoolTa,
        VaultProgramNftTa,
        VaultProgramFractionsTa,
        Treasury,
        NftEdition,
        NftMetadata,
        TreasuryPoolFeeTa,
        ComposeFeeMint,
        TreasurySolFeeTa,
        VaultProgram,
        MplTokenMetadata,
        AssociatedTokenProgram,
        TokenProgram,
        SystemProgram,
        Rent,
        Clock,
        InstructionsSysvar,
    ];
}

/// Anchor instruction discriminator for `name`
pub fn discriminator(name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("global:{}", name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct BuyArgs {
    pub amount: u64,
    pub max_sol: u64,
    pub do_swap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct OrcaBuyArgs {
    pub amount: u64,
    pub max_sol: u64,
    pub sqrt_price_limit: u128,
    pub do_swap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct SellArgs {
    pub nonce: [u8; 32],
    pub min_sol: u64,
    pub do_swap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct OrcaSellArgs {
    pub nonce: [u8; 32],
    pub min_sol: u64,
    pub sqrt_price_limit: u128,
    pub do_swap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct InitFeeArgs {
    pub pool_mint: [u8; 32],
    pub fee_collector: [u8; 32],
}

/// Arguments of a trade entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeArgs {
    Buy(BuyArgs),
    OrcaBuy(OrcaBuyArgs),
    Sell(SellArgs),
    OrcaSell(OrcaSellArgs),
}

impl TradeArgs {
    pub fn buy(amount: u64, max_sol: u64, sqrt_price_limit: Option<u128>, do_swap: bool) -> Self {
        match sqrt_price_limit {
            Some(sqrt_price_limit) => TradeArgs::OrcaBuy(OrcaBuyArgs {
                amount,
                max_sol,
                sqrt_price_limit,
                do_swap,
            }),
            None => TradeArgs::Buy(BuyArgs {
                amount,
                max_sol,
                do_swap,
            }),
        }
    }

    pub fn sell(nonce: [u8; 32], min_sol: u64, sqrt_price_limit: Option<u128>, do_swap: bool) -> Self {
        match sqrt_price_limit {
            Some(sqrt_price_limit) => TradeArgs::OrcaSell(OrcaSellArgs {
                nonce,
                min_sol,
                sqrt_price_limit,
                do_swap,
            }),
            None => TradeArgs::Sell(SellArgs {
                nonce,
                min_sol,
                do_swap,
            }),
        }
    }

    /// Discriminator for `entry_point` followed by the encoded arguments
    pub fn encode(&self, entry_point: &str) -> Result<Vec<u8>, ComposeError> {
        let args = match self {
            TradeArgs::Buy(args) => borsh::to_vec(args),
            TradeArgs::OrcaBuy(args) => borsh::to_vec(args),
            TradeArgs::Sell(args) => borsh::to_vec(args),
            TradeArgs::OrcaSell(args) => borsh::to_vec(args),
        }?;
        let mut data = Vec::with_capacity(8 + args.len());
        data.extend_from_slice(&discriminator(entry_point));
        data.extend_from_slice(&args);
        Ok(data)
    }
}

/// Resolve a layout into account metas
pub fn layout_metas<F>(layout: &Layout, mut resolve: F) -> Vec<AccountMeta>
where
    F: FnMut(Slot) -> Pubkey,
{
    layout
        .iter()
        .map(|slot| AccountMeta {
            pubkey: resolve(*slot),
            is_signer: slot.is_signer(),
            is_writable: slot.is_writable() || slot.is_signer(),
        })
        .collect()
}

/// Compose-program trade instruction
pub fn trade_instruction(
    deployment: &Deployment,
    entry_point: &str,
    args: &TradeArgs,
    named: Vec<AccountMeta>,
    remaining: Vec<AccountMeta>,
) -> Result<Instruction, ComposeError> {
    let data = args.encode(entry_point).map_err(|e| {
        ComposeError::instruction_failed(deployment.compose_program.to_string(), e.to_string())
    })?;
    let mut accounts = named;
    accounts.extend(remaining);

    Ok(Instruction {
        program_id: deployment.compose_program,
        accounts,
        data,
    })
}

/// `init_fee(pool_mint, fee_collector)` on the fee program
pub fn init_fee_instruction(
    deployment: &Deployment,
    initializer: &Pubkey,
    fee_record: &Pubkey,
    pool_mint: &Pubkey,
    fee_collector: &Pubkey,
) -> Result<Instruction, ComposeError> {
    let args = InitFeeArgs {
        pool_mint: pool_mint.to_bytes(),
        fee_collector: fee_collector.to_bytes(),
    };
    let encoded = borsh::to_vec(&args).map_err(|e| {
        ComposeError::instruction_failed(deployment.fee_program.to_string(), e.to_string())
    })?;
    let mut data = discriminator("init_fee").to_vec();
    data.extend_from_slice(&encoded);

    Ok(Instruction {
        program_id: deployment.fee_program,
        accounts: vec![
            AccountMeta::new(*initializer, true),
            AccountMeta::new(*fee_record, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    })
}

/// Ordered instructions of a trade transaction
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    pub instructions: Vec<Instruction>,

    /// Whether an `init_fee` prerequisite sits before the trade
    pub has_prerequisite: bool,
}

impl InstructionPlan {
    pub fn new(instructions: Vec<Instruction>, has_prerequisite: bool) -> Self {
        Self {
            instructions,
            has_prerequisite,
        }
    }
}

/// Plan the instructions of a trade transaction
///
/// Emits `set_compute_unit_limit`, `set_compute_unit_price` (raised to at
/// least 1 micro-lamport), the optional prerequisite, then the trade.
///
/// # Errors
///
/// Returns `ComposeError::Configuration` if the trade instruction has no
/// accounts or the compute limit is zero.
pub fn plan_trade_instructions(
    cu_limit: u32,
    prio_fee: u64,
    prerequisite: Option<Instruction>,
    trade_ix: Instruction,
) -> Result<InstructionPlan, ComposeError> {
    if trade_ix.accounts.is_empty() {
        return Err(ComposeError::Configuration(
            "Trade instruction has no accounts".to_string(),
        ));
    }
    if cu_limit == 0 {
        return Err(ComposeError::Configuration(
            "Compute unit limit must be positive".to_string(),
        ));
    }

    // compute budget (2) + init_fee (1) + trade (1)
    let mut instructions = Vec::with_capacity(4);
    instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(cu_limit));
    instructions.push(ComputeBudgetInstruction::set_compute_unit_price(prio_fee.max(1)));

    let has_prerequisite = prerequisite.is_some();
    if let Some(ix) = prerequisite {
        instructions.push(ix);
    }
    instructions.push(trade_ix);

    Ok(InstructionPlan::new(instructions, has_prerequisite))
}

/// Validate the ordering of a trade transaction's instructions
///
/// Expected: exactly two leading compute-budget instructions, at most one
/// prerequisite, and the trade on `trade_program` last.
#[cfg(debug_assertions)]
pub fn sanity_check_ix_order(
    instructions: &[Instruction],
    trade_program: &Pubkey,
) -> Result<(), ComposeError> {
    if instructions.is_empty() {
        return Err(ComposeError::invalid_order("Instruction list is empty"));
    }

    let is_budget = |ix: &Instruction| ix.program_id == solana_sdk::compute_budget::id();

    if instructions.len() < 3 || !is_budget(&instructions[0]) || !is_budget(&instructions[1]) {
        return Err(ComposeError::invalid_order(
            "Trade transaction must start with CU limit and CU price",
        ));
    }

    if let Some((idx, _)) = instructions.iter().enumerate().skip(2).find(|(_, ix)| is_budget(ix)) {
        return Err(ComposeError::invalid_order(format!(
            "Compute budget instruction found after prerequisites (at position {})",
            idx
        )));
    }

    if instructions.len() > 4 {
        return Err(ComposeError::invalid_order(format!(
            "At most one prerequisite allowed, found {}",
            instructions.len() - 3
        )));
    }

    let last = &instructions[instructions.len() - 1];
    if last.program_id != *trade_program {
        return Err(ComposeError::invalid_order(format!(
            "Last instruction must be the trade, got program_id: {}",
            last.program_id
        )));
    }

    Ok(())
}

/// No-op version of sanity_check_ix_order for release builds
#[cfg(not(debug_assertions))]
#[inline]
pub fn sanity_check_ix_order(
    _instructions: &[Instruction],
    _trade_program: &Pubkey,
) -> Result<(), ComposeError> {
    Ok(())
}
