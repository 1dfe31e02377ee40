use concordium_std::{
    collections::BTreeMap, fmt::Debug, schema, AccountAddress, SchemaType, Serial, Write,
};

pub mod error;
pub mod math;
pub mod types;

use types::{FundAmount, SaleHandle};

/// Denominator for all fixed-point rates (`sale_rate`, `listing_rate`,
/// `liquidity_rate`, `protocol_fee_rate`). A rate of 0.2 tokens per
/// funding unit is `200_000_000_000_000_000`.
pub const RATE_DENOM: u64 = 1_000_000_000_000_000_000;

// ---------------------------------------

/// Tag for the SaleCreated event.
pub const SALE_CREATED_EVENT_TAG: u8 = 1u8;
pub const CONTRIBUTION_EVENT_TAG: u8 = 2u8;
pub const FINALIZED_EVENT_TAG: u8 = 3u8;
pub const SALE_FAILED_EVENT_TAG: u8 = 4u8;
pub const REFUND_EVENT_TAG: u8 = 5u8;

/// Logged by the factory when a new sale instance is registered.
#[derive(Serial, SchemaType, Debug)]
pub struct SaleCreatedEvent {
    pub handle: SaleHandle,
    pub creator: AccountAddress,
}

/// Logged by a sale on every accepted contribution.
#[derive(Debug, Serial, SchemaType)]
pub struct ContributionEvent {
    pub contributor: AccountAddress,
    pub amount: FundAmount,
    pub total_fund_received: FundAmount,
}

/// Logged once when a sale finalizes successfully.
#[derive(Debug, Serial, SchemaType)]
pub struct FinalizedEvent {
    pub total_fund_received: FundAmount,
    pub total_sale_token_sold: u64,
}

/// Logged once when a sale is marked as failed.
#[derive(Debug, Serial, SchemaType)]
pub struct SaleFailedEvent {
    pub total_fund_received: FundAmount,
}

/// Logged when a contributor reclaims funds from a failed sale.
#[derive(Debug, Serial, SchemaType)]
pub struct RefundEvent {
    pub contributor: AccountAddress,
    pub amount: FundAmount,
}

/// Tagged events to be serialized for the event log.
#[derive(Debug)]
pub enum LaunchEvent {
    SaleCreated(SaleCreatedEvent),
    Contribution(ContributionEvent),
    Finalized(FinalizedEvent),
    SaleFailed(SaleFailedEvent),
    Refund(RefundEvent),
}

impl Serial for LaunchEvent {
    fn serial<W: Write>(&self, out: &mut W) -> Result<(), W::Err> {
        match self {
            LaunchEvent::SaleCreated(event) => {
                out.write_u8(SALE_CREATED_EVENT_TAG)?;
                event.serial(out)
            }
            LaunchEvent::Contribution(event) => {
                out.write_u8(CONTRIBUTION_EVENT_TAG)?;
                event.serial(out)
            }
            LaunchEvent::Finalized(event) => {
                out.write_u8(FINALIZED_EVENT_TAG)?;
                event.serial(out)
            }
            LaunchEvent::SaleFailed(event) => {
                out.write_u8(SALE_FAILED_EVENT_TAG)?;
                event.serial(out)
            }
            LaunchEvent::Refund(event) => {
                out.write_u8(REFUND_EVENT_TAG)?;
                event.serial(out)
            }
        }
    }
}

impl schema::SchemaType for LaunchEvent {
    fn get_type() -> schema::Type {
        let mut event_map = BTreeMap::new();
        event_map.insert(
            SALE_CREATED_EVENT_TAG,
            (
                "SaleCreated".to_string(),
                schema::Fields::Named(vec![
                    (String::from("handle"), SaleHandle::get_type()),
                    (String::from("creator"), AccountAddress::get_type()),
                ]),
            ),
        );
        event_map.insert(
            CONTRIBUTION_EVENT_TAG,
            (
                "Contribution".to_string(),
                schema::Fields::Named(vec![
                    (String::from("contributor"), AccountAddress::get_type()),
                    (String::from("amount"), FundAmount::get_type()),
                    (String::from("total_fund_received"), FundAmount::get_type()),
                ]),
            ),
        );
        event_map.insert(
            FINALIZED_EVENT_TAG,
            (
                "Finalized".to_string(),
                schema::Fields::Named(vec![
                    (String::from("total_fund_received"), FundAmount::get_type()),
                    (String::from("total_sale_token_sold"), u64::get_type()),
                ]),
            ),
        );
        event_map.insert(
            SALE_FAILED_EVENT_TAG,
            (
                "SaleFailed".to_string(),
                schema::Fields::Named(vec![(
                    String::from("total_fund_received"),
                    FundAmount::get_type(),
                )]),
            ),
        );
        event_map.insert(
            REFUND_EVENT_TAG,
            (
                "Refund".to_string(),
                schema::Fields::Named(vec![
                    (String::from("contributor"), AccountAddress::get_type()),
                    (String::from("amount"), FundAmount::get_type()),
                ]),
            ),
        );
        schema::Type::TaggedEnum(event_map)
    }
}
