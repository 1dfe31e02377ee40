//! Factory registry for presale launches. Concordium contracts cannot
//! instantiate other contracts, so the factory validates a proposed
//! configuration, charges the creation fee, hands out a sequential
//! handle and records the creation; the sale instance itself is
//! deployed off-chain against the recorded parameters.
#[cfg(any(feature = "wasm-test", test))]
mod sctest;

use concordium_std::*;
pub use launch_utils::{
    error::{ContractError, ContractResult, CustomContractError},
    types::*,
    LaunchEvent, SaleCreatedEvent,
};

// -------------------------------------------------------------

/// A validated creation, frozen at registration time.
#[derive(Debug, Serialize, SchemaType, Clone)]
pub struct CreationRecord {
    /// Account that requested the sale.
    pub creator: AccountAddress,
    /// The validated sale parameters.
    pub config: SaleConfig,
    /// Registration time.
    pub created_at: Timestamp,
}

#[derive(Serial, DeserialWithState, StateClone, Debug)]
#[concordium(state_parameter = "S")]
struct State<S> {
    /// Fee charged per creation, accumulated on the instance balance.
    creation_fee: Amount,
    /// Default protocol fee receiver handed to new sales.
    protocol_addr: AccountAddress,
    /// Next handle to assign; handles are sequential from 1.
    next_handle: SaleHandle,
    /// All registered creations by handle.
    sales: StateMap<SaleHandle, CreationRecord, S>,
}

impl<S: HasStateApi> State<S> {
    pub(crate) fn new(
        state_builder: &mut StateBuilder<S>,
        creation_fee: Amount,
        protocol_addr: AccountAddress,
    ) -> Self {
        State {
            creation_fee,
            protocol_addr,
            next_handle: 1,
            sales: state_builder.new_map(),
        }
    }

    fn register(
        &mut self,
        creator: AccountAddress,
        config: SaleConfig,
        created_at: Timestamp,
    ) -> SaleHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        let _ = self.sales.insert(
            handle,
            CreationRecord {
                creator,
                config,
                created_at,
            },
        );
        handle
    }
}

// --------------------------------------------------------------

#[derive(Debug, Serialize, SchemaType)]
pub struct InitParams {
    /// Fee charged per creation.
    pub creation_fee: Amount,
    /// Default protocol fee receiver for new sales.
    pub protocol_addr: AccountAddress,
}

/// Init function that creates a new smart contract.
#[init(contract = "presale_launch_factory", parameter = "InitParams")]
fn contract_init<S: HasStateApi>(
    ctx: &impl HasInitContext,
    state_builder: &mut StateBuilder<S>,
) -> InitResult<State<S>> {
    let params: InitParams = ctx.parameter_cursor().get()?;
    Ok(State::new(
        state_builder,
        params.creation_fee,
        params.protocol_addr,
    ))
}

// ============================================================
// Entrypoints
// ============================================================

/// The parameter type for the contract function `createSale`.
#[derive(Debug, Serialize, SchemaType)]
pub struct CreateSaleParams {
    /// Sale parameters to validate and register.
    pub config: SaleConfig,
}

/// Validate a sale configuration, charge the creation fee and register
/// the creation under a fresh handle. The handle is returned and logged
/// so the creator can bind the deployed sale instance to it.
///
/// Caller: any account
/// Reject if:
/// - Fails to parse parameter
/// - The sender is a contract
/// - The attached amount does not cover the creation fee
/// - The configuration violates an ordering invariant
#[receive(
    contract = "presale_launch_factory",
    name = "createSale",
    parameter = "CreateSaleParams",
    error = "ContractError",
    return_value = "SaleHandle",
    enable_logger,
    mutable,
    payable
)]
fn contract_create_sale<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    amount: Amount,
    logger: &mut impl HasLogger,
) -> ContractResult<SaleHandle> {
    let creator = if let Address::Account(addr) = ctx.sender() {
        addr
    } else {
        bail!(CustomContractError::AccountOnly.into())
    };

    let params: CreateSaleParams = ctx.parameter_cursor().get()?;

    let state = host.state_mut();
    ensure!(
        amount >= state.creation_fee,
        CustomContractError::CreationFeeNotPaid.into()
    );
    params.config.ensure_valid()?;

    let handle = state.register(creator, params.config, ctx.metadata().slot_time());

    logger.log(&LaunchEvent::SaleCreated(SaleCreatedEvent {
        handle,
        creator,
    }))?;

    Ok(handle)
}

/// Drain the accumulated creation fees to the contract owner.
///
/// Caller: contract instance owner only
/// Reject if:
/// - The sender is not the contract owner.
/// - The transfer fails.
#[receive(
    contract = "presale_launch_factory",
    name = "withdrawFees",
    error = "ContractError",
    mutable
)]
fn contract_withdraw_fees<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    let owner = ctx.owner();
    ensure!(
        ctx.sender().matches_account(&owner),
        ContractError::Unauthorized
    );

    let balance = host.self_balance();
    if balance == Amount::zero() {
        return Ok(());
    }
    let transfer_result = host.invoke_transfer(&owner, balance);
    ensure!(
        transfer_result.is_ok(),
        CustomContractError::TransferError.into()
    );
    Ok(())
}

// --------------------------------------

#[derive(Debug, Serialize, SchemaType)]
struct ViewResponse {
    creation_fee: Amount,
    protocol_addr: AccountAddress,
    /// Number of registered sales.
    sale_count: u64,
}

#[receive(
    contract = "presale_launch_factory",
    name = "view",
    return_value = "ViewResponse"
)]
fn contract_view<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<ViewResponse> {
    let state = host.state();

    Ok(ViewResponse {
        creation_fee: state.creation_fee,
        protocol_addr: state.protocol_addr,
        sale_count: state.next_handle - 1,
    })
}

/// Look up a registered creation by handle.
#[receive(
    contract = "presale_launch_factory",
    name = "viewSale",
    parameter = "SaleHandle",
    return_value = "CreationRecord"
)]
fn contract_view_sale<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ReceiveResult<CreationRecord> {
    let handle: SaleHandle = ctx.parameter_cursor().get()?;
    let state = host.state();

    let record = state
        .sales
        .get(&handle)
        .ok_or(ContractError::from(CustomContractError::UnknownSale))?;

    Ok(record.clone())
}
