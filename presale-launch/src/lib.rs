//! Presale contract: contributions in a funding asset (native value or a
//! CIS2 token) are converted into sale-token entitlements at a fixed rate,
//! bounded by per-user and aggregate caps, and settled once into either a
//! distribution or a refund path.
#[cfg(any(feature = "wasm-test", test))]
mod sctest;
mod state;
mod view;

use concordium_cis2::{
    AdditionalData, OnReceivingCis2Params, Receiver, TokenIdUnit, Transfer, TransferParams,
};
use concordium_std::*;
use launch_utils::{ContributionEvent, FinalizedEvent, LaunchEvent, RefundEvent, SaleFailedEvent};
use state::{State, *};

/// The parameter schema for the `init` function. The factory validates and
/// forwards these when a sale is created.
#[derive(Debug, Serialize, SchemaType)]
pub struct InitParams {
    /// Account that set up the sale; receives the proceeds.
    pub creator: AccountAddress,
    /// Account credited with the protocol fee share at finalize time.
    pub protocol_addr: AccountAddress,
    /// Collaborator receiving the paired liquidity deposit.
    pub liquidity_addr: Address,
    /// Where burned inventory goes under `RefundPolicy::Burn`.
    pub burn_addr: Address,
    /// Who may drive the terminal transitions.
    pub finalize_auth: FinalizeAuth,
    /// Immutable sale parameters.
    pub config: SaleConfig,
}

/// # Init Function
/// Fixes the configuration and zeroes the ledger.
///
/// Reject if:
/// - Fails to parse parameter
/// - The configuration violates an ordering invariant
#[init(contract = "presale_launch", parameter = "InitParams")]
fn contract_init<S: HasStateApi>(
    ctx: &impl HasInitContext,
    state_builder: &mut StateBuilder<S>,
) -> InitResult<State<S>> {
    let params: InitParams = ctx.parameter_cursor().get()?;

    params.config.ensure_valid()?;

    Ok(State::new(
        state_builder,
        params.creator,
        params.protocol_addr,
        params.liquidity_addr,
        params.burn_addr,
        params.finalize_auth,
        params.config,
    ))
}

// ==============================================
// For the contract owner
// ==========================================

/// State-mutating user functions (buy, finalize, refund, claim) stop
/// working while the contract is paused.
///
/// Caller: contract instance owner only
/// Reject if:
/// - The sender is not the contract owner.
#[receive(
    contract = "presale_launch",
    name = "setPaused",
    error = "ContractError",
    mutable
)]
fn contract_set_paused<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    host.state_mut().paused = true;
    Ok(())
}

/// The contract is unpaused.
///
/// Caller: contract instance owner only
/// Reject if:
/// - The sender is not the contract owner.
#[receive(
    contract = "presale_launch",
    name = "setUnpaused",
    error = "ContractError",
    mutable
)]
fn contract_set_unpaused<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );
    host.state_mut().paused = false;
    Ok(())
}

// ==============================================
// For the sale creator
// ==========================================

/// The creator escrows the sale-token inventory by transferring it from
/// the sale-token contract to this contract. The amount must cover the
/// hard-cap entitlement plus the hard-cap listing liquidity.
///
/// Caller: sale-token contract only
/// Invoker: sale creator only
/// Reject if:
/// - Contract is paused
/// - The sale already settled
/// - Fails to parse parameter
/// - The sender is not the sale-token contract
/// - The invoker is not the creator
/// - Inventory was already deposited
/// - The amount differs from the required inventory
#[receive(
    contract = "presale_launch",
    name = "depositTokens",
    parameter = "OnReceivingCis2Params<ContractTokenId, ContractTokenAmount>",
    error = "ContractError",
    mutable
)]
fn contract_deposit_tokens<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    let sender = if let Address::Contract(contract) = ctx.sender() {
        contract
    } else {
        bail!(CustomContractError::ContractOnly.into())
    };

    let params: OnReceivingCis2Params<ContractTokenId, ContractTokenAmount> =
        ctx.parameter_cursor().get()?;

    let state = host.state_mut();
    ensure!(!state.paused, CustomContractError::ContractPaused.into());
    ensure!(
        !state.ledger.finalized && !state.ledger.failed,
        CustomContractError::AlreadyFinalized.into()
    );
    ensure!(
        sender == state.config.sale_token && ctx.invoker() == state.creator,
        ContractError::Unauthorized
    );
    ensure!(
        state.ledger.sale_token_deposited.is_none(),
        CustomContractError::AlreadyDeposited.into()
    );

    let required = state.required_sale_tokens()?;
    ensure!(
        params.amount == required,
        CustomContractError::NotMatchAmount.into()
    );

    state.ledger.sale_token_deposited = Some(params.amount);
    Ok(())
}

// ==============================================
// For contributors
// ==========================================

/// Contribute native value. Only valid when the sale's funding asset is
/// the native one; token-funded sales use `buyWithToken`.
///
/// Caller: any account
/// Reject if:
/// - Contract is paused
/// - The sale is funded by a token, not native value
/// - The sender is a contract
/// - The sale is not active, or a buy bound is violated
#[receive(
    contract = "presale_launch",
    name = "buy",
    error = "ContractError",
    enable_logger,
    mutable,
    payable
)]
fn contract_buy<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    amount: Amount,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let state = host.state_mut();
    ensure!(!state.paused, CustomContractError::ContractPaused.into());
    ensure!(
        state.config.fund_asset == FundAsset::Native,
        CustomContractError::FundAssetMismatch.into()
    );

    let contributor = if let Address::Account(addr) = ctx.sender() {
        addr
    } else {
        bail!(CustomContractError::AccountOnly.into())
    };

    let fund_amount = amount.micro_ccd;
    state.contribute(ctx.metadata().slot_time(), &contributor, fund_amount)?;

    logger.log(&LaunchEvent::Contribution(ContributionEvent {
        contributor,
        amount: fund_amount,
        total_fund_received: state.ledger.total_fund_received,
    }))?;

    Ok(())
}

/// Contribute via the CIS2 receive hook: the fund-token contract pushes
/// the pre-approved amount and reports the originating contributor. Both
/// entry points funnel into the same contribution routine, so equal
/// amounts produce identical ledger results.
///
/// Caller: fund-token contract only
/// Reject if:
/// - Contract is paused
/// - Fails to parse parameter
/// - The sale is funded by native value
/// - The sender is not the fund-token contract
/// - The originating contributor is a contract
/// - The sale is not active, or a buy bound is violated
#[receive(
    contract = "presale_launch",
    name = "buyWithToken",
    parameter = "OnReceivingCis2Params<ContractTokenId, ContractTokenAmount>",
    error = "ContractError",
    enable_logger,
    mutable
)]
fn contract_buy_with_token<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let sender = if let Address::Contract(contract) = ctx.sender() {
        contract
    } else {
        bail!(CustomContractError::ContractOnly.into())
    };

    let params: OnReceivingCis2Params<ContractTokenId, ContractTokenAmount> =
        ctx.parameter_cursor().get()?;

    let state = host.state_mut();
    ensure!(!state.paused, CustomContractError::ContractPaused.into());
    let fund_token = match state.config.fund_asset {
        FundAsset::Token(addr) => addr,
        FundAsset::Native => bail!(CustomContractError::FundAssetMismatch.into()),
    };
    ensure!(sender == fund_token, ContractError::Unauthorized);

    let contributor = if let Address::Account(addr) = params.from {
        addr
    } else {
        bail!(CustomContractError::AccountOnly.into())
    };

    let fund_amount = params.amount.0;
    state.contribute(ctx.metadata().slot_time(), &contributor, fund_amount)?;

    logger.log(&LaunchEvent::Contribution(ContributionEvent {
        contributor,
        amount: fund_amount,
        total_fund_received: state.ledger.total_fund_received,
    }))?;

    Ok(())
}

/// Settle a successful sale, exactly once: the protocol fee share of the
/// funds goes to the protocol address, the liquidity share (funds plus
/// matching tokens at the listing rate) to the liquidity collaborator,
/// the remainder to the creator, and unsold inventory follows the refund
/// policy. A fully subscribed sale may settle before its scheduled end.
///
/// Caller: per `finalize_auth`
/// Reject if:
/// - Contract is paused
/// - The sender is not authorized
/// - Already settled
/// - The sale has not ended and the hard cap was not reached
/// - The soft cap was not reached
/// - The inventory was never escrowed
#[receive(
    contract = "presale_launch",
    name = "finalize",
    error = "ContractError",
    enable_logger,
    mutable
)]
fn contract_finalize<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let now = ctx.metadata().slot_time();
    let self_addr = ctx.self_address();

    let state = host.state_mut();
    ensure!(!state.paused, CustomContractError::ContractPaused.into());
    if state.finalize_auth == FinalizeAuth::CreatorOnly {
        ensure!(
            ctx.sender().matches_account(&state.creator),
            ContractError::Unauthorized
        );
    }

    ensure!(
        !state.ledger.finalized && !state.ledger.failed,
        CustomContractError::AlreadyFinalized.into()
    );
    ensure!(
        now >= state.config.sale_end || state.reached_hard_cap(),
        CustomContractError::SaleNotEnded.into()
    );
    ensure!(
        state.reached_soft_cap(),
        CustomContractError::SoftCapNotReached.into()
    );

    let dist = state.distribution()?;
    let fund_asset = state.config.fund_asset;
    let sale_token = state.config.sale_token;
    let refund_policy = state.config.refund_policy;
    let creator = state.creator;
    let protocol_addr = state.ledger.protocol_addr;
    let liquidity_addr = state.liquidity_addr;
    let burn_addr = state.burn_addr;
    let total_fund_received = state.ledger.total_fund_received;
    let total_sale_token_sold = state.ledger.total_sale_token_sold;

    state.ledger.finalized = true;

    transfer_fund(
        host,
        self_addr,
        fund_asset,
        &Address::Account(protocol_addr),
        dist.protocol_fee,
    )?;
    transfer_fund(host, self_addr, fund_asset, &liquidity_addr, dist.liquidity_fund)?;
    transfer_sale_tokens(host, sale_token, self_addr, &liquidity_addr, dist.liquidity_tokens)?;
    transfer_fund(
        host,
        self_addr,
        fund_asset,
        &Address::Account(creator),
        dist.creator_proceeds,
    )?;

    let leftover_to = match refund_policy {
        RefundPolicy::ReturnToCreator => Address::Account(creator),
        RefundPolicy::Burn => burn_addr,
    };
    transfer_sale_tokens(host, sale_token, self_addr, &leftover_to, dist.leftover_tokens)?;

    logger.log(&LaunchEvent::Finalized(FinalizedEvent {
        total_fund_received,
        total_sale_token_sold: total_sale_token_sold.0,
    }))?;

    Ok(())
}

/// Close a sale that ended below its soft cap: flips the terminal failed
/// flag, disposes the escrowed inventory per the refund policy and opens
/// the refund path for contributors.
///
/// Caller: per `finalize_auth`
/// Reject if:
/// - Contract is paused
/// - The sender is not authorized
/// - Already settled
/// - The sale has not ended
/// - The soft cap was in fact reached
#[receive(
    contract = "presale_launch",
    name = "markFailed",
    error = "ContractError",
    enable_logger,
    mutable
)]
fn contract_mark_failed<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let now = ctx.metadata().slot_time();
    let self_addr = ctx.self_address();

    let state = host.state_mut();
    ensure!(!state.paused, CustomContractError::ContractPaused.into());
    if state.finalize_auth == FinalizeAuth::CreatorOnly {
        ensure!(
            ctx.sender().matches_account(&state.creator),
            ContractError::Unauthorized
        );
    }

    ensure!(
        !state.ledger.finalized && !state.ledger.failed,
        CustomContractError::AlreadyFinalized.into()
    );
    ensure!(
        now >= state.config.sale_end,
        CustomContractError::SaleNotEnded.into()
    );
    ensure!(
        !state.reached_soft_cap(),
        CustomContractError::SoftCapReached.into()
    );

    let sale_token = state.config.sale_token;
    let refund_policy = state.config.refund_policy;
    let creator = state.creator;
    let burn_addr = state.burn_addr;
    let deposited = state.ledger.sale_token_deposited;
    let total_fund_received = state.ledger.total_fund_received;

    state.ledger.failed = true;

    // Nothing was sold for keeps; the whole inventory goes back.
    if let Some(deposited) = deposited {
        let inventory_to = match refund_policy {
            RefundPolicy::ReturnToCreator => Address::Account(creator),
            RefundPolicy::Burn => burn_addr,
        };
        transfer_sale_tokens(host, sale_token, self_addr, &inventory_to, deposited)?;
    }

    logger.log(&LaunchEvent::SaleFailed(SaleFailedEvent {
        total_fund_received,
    }))?;

    Ok(())
}

/// A contributor reclaims their cumulative contribution from a failed
/// sale. The position is removed, so a second call rejects.
///
/// Caller: any contributing account
/// Reject if:
/// - Contract is paused
/// - The sale has not been marked failed
/// - The sender is a contract
/// - The sender never contributed (or already reclaimed)
#[receive(
    contract = "presale_launch",
    name = "userRefund",
    error = "ContractError",
    enable_logger,
    mutable
)]
fn contract_user_refund<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let self_addr = ctx.self_address();

    let state = host.state_mut();
    ensure!(!state.paused, CustomContractError::ContractPaused.into());
    ensure!(
        state.ledger.failed,
        CustomContractError::SaleNotFailed.into()
    );

    let contributor = if let Address::Account(addr) = ctx.sender() {
        addr
    } else {
        bail!(CustomContractError::AccountOnly.into())
    };

    let amount = state.take_refund(&contributor)?;
    let fund_asset = state.config.fund_asset;

    transfer_fund(
        host,
        self_addr,
        fund_asset,
        &Address::Account(contributor),
        amount,
    )?;

    logger.log(&LaunchEvent::Refund(RefundEvent {
        contributor,
        amount,
    }))?;

    Ok(())
}

/// A contributor collects their sale-token entitlement from a finalized
/// sale, priced at the sale rate over their cumulative contribution.
///
/// Caller: any contributing account
/// Reject if:
/// - Contract is paused
/// - The sale has not finalized
/// - The sender is a contract
/// - The sender never contributed, or already claimed
#[receive(
    contract = "presale_launch",
    name = "userClaim",
    error = "ContractError",
    mutable
)]
fn contract_user_claim<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    let self_addr = ctx.self_address();

    let state = host.state_mut();
    ensure!(!state.paused, CustomContractError::ContractPaused.into());
    ensure!(
        state.ledger.finalized,
        CustomContractError::SaleNotFinalized.into()
    );

    let contributor = if let Address::Account(addr) = ctx.sender() {
        addr
    } else {
        bail!(CustomContractError::AccountOnly.into())
    };

    let entitlement = state.claim_entitlement(&contributor)?;
    let sale_token = state.config.sale_token;

    transfer_sale_tokens(
        host,
        sale_token,
        self_addr,
        &Address::Account(contributor),
        entitlement,
    )?;

    Ok(())
}

/// Callback function to call when CIS2 is called
/// but no callback is needed.
/// Caller: Anyone
#[receive(
    contract = "presale_launch",
    name = "callback",
    parameter = "OnReceivingCis2Params<ContractTokenId, ContractTokenAmount>",
    mutable
)]
fn callback<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    _host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<()> {
    Ok(())
}

// ==============================================
// Transfer plumbing
// ==========================================

/// Move funding-asset value out of the sale's custody. Native value can
/// only go to accounts; token value reaches contracts through their
/// `callback` entrypoint.
fn transfer_fund<S: HasStateApi>(
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    self_addr: ContractAddress,
    fund_asset: FundAsset,
    to: &Address,
    amount: FundAmount,
) -> ContractResult<()> {
    if amount == 0 {
        return Ok(());
    }
    match fund_asset {
        FundAsset::Native => {
            let to = if let Address::Account(addr) = to {
                addr
            } else {
                bail!(CustomContractError::AccountOnly.into())
            };
            let transfer_result = host.invoke_transfer(to, Amount::from_micro_ccd(amount));
            ensure!(
                transfer_result.is_ok(),
                CustomContractError::TransferError.into()
            );
        }
        FundAsset::Token(token) => {
            transfer_cis2(host, token, self_addr, to, ContractTokenAmount::from(amount))?;
        }
    }
    Ok(())
}

/// Move sale tokens out of the sale's custody.
fn transfer_sale_tokens<S: HasStateApi>(
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    sale_token: ContractAddress,
    self_addr: ContractAddress,
    to: &Address,
    amount: ContractTokenAmount,
) -> ContractResult<()> {
    transfer_cis2(host, sale_token, self_addr, to, amount)
}

fn transfer_cis2<S: HasStateApi>(
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    token: ContractAddress,
    self_addr: ContractAddress,
    to: &Address,
    amount: ContractTokenAmount,
) -> ContractResult<()> {
    if amount.0 == 0 {
        return Ok(());
    }
    let to = match to {
        Address::Account(account_addr) => Receiver::from_account(*account_addr),
        Address::Contract(contract_addr) => Receiver::from_contract(
            *contract_addr,
            OwnedEntrypointName::new_unchecked("callback".to_owned()),
        ),
    };
    let transfer = Transfer {
        from: Address::from(self_addr),
        to,
        token_id: TokenIdUnit(),
        amount,
        data: AdditionalData::empty(),
    };
    let _ = host.invoke_contract(
        &token,
        &TransferParams::from(vec![transfer]),
        EntrypointName::new_unchecked("transfer"),
        Amount::zero(),
    )?;
    Ok(())
}
