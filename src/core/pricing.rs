//! Pricing business logic - Derives a proposal's subtotal, taxes, total and deposit.
//!
//! The calculation itself is a pure function over [`PricingInput`] so it can be
//! exercised without a database. [`recalculate`] wraps it: it loads the
//! proposal's days, stops and inclusions, computes, and writes the derived
//! columns back inside one database transaction. If anything fails the stored
//! values stay as they were.
//!
//! Rules, in order:
//! 1. stop line = `flat_cost + per_person_cost × party_size`
//! 2. inclusion line = `total_price` when set, else `quantity × unit_price × multiplier`
//!    (1 for flat, party size for per-person, day count for per-day)
//! 3. planning fee: percentage mode takes a share of the service subtotal before
//!    discount, flat mode uses the entered amount; it is not taxed
//! 4. gratuity: a share of the service subtotal, not taxed
//! 5. discount is spread proportionally over every line; tax applies to the
//!    discounted share of taxable lines whose price does not already include tax
//! 6. `total = subtotal - discount + taxes`

use crate::{
    core::money::{
        MAX_TOTAL, checked_add, checked_mul, percent_of, round_money, to_f64, try_to_decimal,
    },
    entities::{
        ProposalDay, ProposalInclusion, ProposalStop, TripProposal,
        enums::{PlanningFeeMode, PricingType},
        proposal_day, proposal_inclusion, proposal_stop, trip_proposal,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Serialize;

/// Cost fields of one itinerary stop.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopCost {
    /// Cost per traveller
    pub per_person_cost: f64,
    /// Cost for the party
    pub flat_cost: f64,
}

/// Pricing fields of one inclusion.
#[derive(Debug, Clone, Copy)]
pub struct InclusionLine {
    /// How the unit price scales
    pub pricing_type: PricingType,
    /// Number of units
    pub quantity: f64,
    /// Price per unit
    pub unit_price: f64,
    /// Manual line total
    pub total_price: Option<f64>,
    /// Tax applies
    pub is_taxable: bool,
    /// Tax already contained in the line amount
    pub tax_included_in_price: bool,
}

/// Everything the calculation reads.
#[derive(Debug, Clone)]
pub struct PricingInput {
    /// Number of travellers
    pub party_size: i32,
    /// Days used by per-day inclusions
    pub day_count: i64,
    /// Itinerary stops
    pub stops: Vec<StopCost>,
    /// Line items
    pub inclusions: Vec<InclusionLine>,
    /// Dollar discount
    pub discount_amount: f64,
    /// Tax percent
    pub tax_rate: f64,
    /// Gratuity percent of the service subtotal
    pub gratuity_percentage: f64,
    /// Flat or percentage planning fee
    pub planning_fee_mode: PlanningFeeMode,
    /// Entered planning fee (flat mode)
    pub planning_fee_amount: f64,
    /// Planning fee percent (percentage mode)
    pub planning_fee_percentage: f64,
    /// Deposit percent of the total
    pub deposit_percentage: f64,
    /// No deposit is collected
    pub skip_deposit_on_accept: bool,
}

impl Default for PricingInput {
    fn default() -> Self {
        Self {
            party_size: 1,
            day_count: 1,
            stops: Vec::new(),
            inclusions: Vec::new(),
            discount_amount: 0.0,
            tax_rate: 0.0,
            gratuity_percentage: 0.0,
            planning_fee_mode: PlanningFeeMode::Flat,
            planning_fee_amount: 0.0,
            planning_fee_percentage: 0.0,
            deposit_percentage: 0.0,
            skip_deposit_on_accept: false,
        }
    }
}

/// Result of a pricing run, every amount rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricingBreakdown {
    /// Sum of stop lines
    pub stops_total: f64,
    /// Sum of inclusion lines
    pub inclusions_total: f64,
    /// Stops plus inclusions
    pub services_subtotal: f64,
    /// Planning fee line
    pub planning_fee: f64,
    /// Gratuity line
    pub gratuity: f64,
    /// Services plus planning fee plus gratuity
    pub subtotal: f64,
    /// Discount taken off the subtotal
    pub discount: f64,
    /// Discounted amount tax was charged on
    pub taxable_amount: f64,
    /// Tax added on top
    pub taxes: f64,
    /// Amount due
    pub total: f64,
    /// Deposit due on acceptance
    pub deposit_amount: f64,
}

fn stop_line(stop: &StopCost, party: Decimal) -> Result<Decimal> {
    let flat = try_to_decimal(stop.flat_cost, "flat_cost")?;
    let per_person = try_to_decimal(stop.per_person_cost, "per_person_cost")?;
    let line = checked_add(flat, checked_mul(per_person, party, "stop line")?, "stop line")?;
    Ok(round_money(line))
}

fn inclusion_line(line: &InclusionLine, party: Decimal, days: Decimal) -> Result<Decimal> {
    if let Some(total_price) = line.total_price {
        return Ok(round_money(try_to_decimal(total_price, "total_price")?));
    }

    let multiplier = match line.pricing_type {
        PricingType::Flat => Decimal::ONE,
        PricingType::PerPerson => party,
        PricingType::PerDay => days,
    };
    let quantity = try_to_decimal(line.quantity, "quantity")?;
    let unit_price = try_to_decimal(line.unit_price, "unit_price")?;
    let amount = checked_mul(
        checked_mul(quantity, unit_price, "inclusion line")?,
        multiplier,
        "inclusion line",
    )?;
    Ok(round_money(amount))
}

/// Prices a proposal. Missing rates are zero.
///
/// # Errors
/// Returns [`Error::DiscountExceedsSubtotal`] when the discount is larger than
/// the subtotal, [`Error::AmountTooLarge`] when a line or the subtotal leaves
/// the range the ledger stores, and a validation error for a negative or
/// non-finite discount.
pub fn calculate(input: &PricingInput) -> Result<PricingBreakdown> {
    if !input.discount_amount.is_finite() || input.discount_amount < 0.0 {
        return Err(Error::validation(format!(
            "discount_amount must be non-negative, got {}",
            input.discount_amount
        )));
    }

    let party = Decimal::from(input.party_size.max(0));
    let days = Decimal::from(input.day_count.max(0));

    let mut stops_total = Decimal::ZERO;
    for stop in &input.stops {
        stops_total = checked_add(stops_total, stop_line(stop, party)?, "stops_total")?;
    }

    let mut inclusions_total = Decimal::ZERO;
    let mut taxable_lines = Decimal::ZERO;
    for line in &input.inclusions {
        let amount = inclusion_line(line, party, days)?;
        inclusions_total = checked_add(inclusions_total, amount, "inclusions_total")?;
        if line.is_taxable && !line.tax_included_in_price {
            taxable_lines += amount;
        }
    }

    let services_subtotal = checked_add(stops_total, inclusions_total, "subtotal")?;

    let planning_fee = round_money(match input.planning_fee_mode {
        PlanningFeeMode::Flat => try_to_decimal(input.planning_fee_amount, "planning_fee_amount")?,
        PlanningFeeMode::Percentage => percent_of(
            services_subtotal,
            input.planning_fee_percentage,
            "planning_fee_percentage",
        )?,
    });
    let gratuity = round_money(percent_of(
        services_subtotal,
        input.gratuity_percentage,
        "gratuity_percentage",
    )?);

    let subtotal = checked_add(
        checked_add(services_subtotal, planning_fee, "subtotal")?,
        gratuity,
        "subtotal",
    )?;
    if to_f64(subtotal) > MAX_TOTAL {
        return Err(Error::AmountTooLarge {
            field: "subtotal".to_string(),
            limit: MAX_TOTAL,
        });
    }
    let discount = round_money(try_to_decimal(input.discount_amount, "discount_amount")?);
    if discount > subtotal {
        return Err(Error::DiscountExceedsSubtotal {
            discount: to_f64(discount),
            subtotal: to_f64(subtotal),
        });
    }

    // Everything below is bounded by the subtotal cap
    let taxable_amount = if subtotal.is_zero() {
        Decimal::ZERO
    } else {
        taxable_lines * (Decimal::ONE - discount / subtotal)
    };
    let taxes = round_money(percent_of(taxable_amount, input.tax_rate, "tax_rate")?);
    let total = subtotal - discount + taxes;

    let deposit_amount = if input.skip_deposit_on_accept {
        Decimal::ZERO
    } else {
        round_money(percent_of(total, input.deposit_percentage, "deposit_percentage")?)
    };

    Ok(PricingBreakdown {
        stops_total: to_f64(stops_total),
        inclusions_total: to_f64(inclusions_total),
        services_subtotal: to_f64(services_subtotal),
        planning_fee: to_f64(planning_fee),
        gratuity: to_f64(gratuity),
        subtotal: to_f64(subtotal),
        discount: to_f64(discount),
        taxable_amount: to_f64(taxable_amount),
        taxes: to_f64(taxes),
        total: to_f64(total),
        deposit_amount: to_f64(deposit_amount),
    })
}

/// Days that per-day inclusions are charged for.
///
/// Uses the number of itinerary days; without any, the inclusive length of the
/// proposal's date range; failing that, one day.
#[must_use]
pub fn day_count(itinerary_days: usize, start: Option<NaiveDate>, end: Option<NaiveDate>) -> i64 {
    if itinerary_days > 0 {
        return i64::try_from(itinerary_days).unwrap_or(i64::MAX);
    }
    match (start, end) {
        (Some(start), Some(end)) if end >= start => (end - start).num_days() + 1,
        _ => 1,
    }
}

/// Builds the calculation input from stored rows.
#[must_use]
pub fn input_from_models(
    proposal: &trip_proposal::Model,
    itinerary_days: usize,
    stops: &[proposal_stop::Model],
    inclusions: &[proposal_inclusion::Model],
) -> PricingInput {
    PricingInput {
        party_size: proposal.party_size,
        day_count: day_count(itinerary_days, proposal.start_date, proposal.end_date),
        stops: stops
            .iter()
            .map(|s| StopCost {
                per_person_cost: s.per_person_cost,
                flat_cost: s.flat_cost,
            })
            .collect(),
        inclusions: inclusions
            .iter()
            .map(|i| InclusionLine {
                pricing_type: i.pricing_type,
                quantity: i.quantity,
                unit_price: i.unit_price,
                total_price: i.total_price,
                is_taxable: i.is_taxable,
                tax_included_in_price: i.tax_included_in_price,
            })
            .collect(),
        discount_amount: proposal.discount_amount,
        tax_rate: proposal.tax_rate,
        gratuity_percentage: proposal.gratuity_percentage,
        planning_fee_mode: proposal.planning_fee_mode,
        planning_fee_amount: proposal.planning_fee_amount,
        planning_fee_percentage: proposal.planning_fee_percentage,
        deposit_percentage: proposal.deposit_percentage,
        skip_deposit_on_accept: proposal.skip_deposit_on_accept,
    }
}

async fn load_input<C>(db: &C, proposal: &trip_proposal::Model) -> Result<PricingInput>
where
    C: ConnectionTrait,
{
    let days = ProposalDay::find()
        .filter(proposal_day::Column::ProposalId.eq(proposal.id))
        .count(db)
        .await?;
    let stops = ProposalStop::find()
        .filter(proposal_stop::Column::ProposalId.eq(proposal.id))
        .all(db)
        .await?;
    let inclusions = ProposalInclusion::find()
        .filter(proposal_inclusion::Column::ProposalId.eq(proposal.id))
        .all(db)
        .await?;

    let days = usize::try_from(days).unwrap_or(usize::MAX);
    Ok(input_from_models(proposal, days, &stops, &inclusions))
}

async fn find_proposal<C>(db: &C, proposal_id: i64) -> Result<trip_proposal::Model>
where
    C: ConnectionTrait,
{
    TripProposal::find_by_id(proposal_id)
        .one(db)
        .await?
        .ok_or(Error::ProposalNotFound { id: proposal_id })
}

/// Proposal row after a recalculation, with the numbers behind it.
#[derive(Debug, Clone, Serialize)]
pub struct PricedProposal {
    /// Updated proposal
    pub proposal: trip_proposal::Model,
    /// Calculation that produced the stored totals
    pub breakdown: PricingBreakdown,
}

/// Computes the breakdown for a proposal without writing anything.
pub async fn preview(db: &DatabaseConnection, proposal_id: i64) -> Result<PricingBreakdown> {
    let proposal = find_proposal(db, proposal_id).await?;
    let input = load_input(db, &proposal).await?;
    calculate(&input)
}

/// Recalculates and stores the derived pricing columns on an open connection or
/// transaction. Callers that already hold a transaction use this so the
/// triggering edit and the new totals commit together.
pub async fn recalculate_in<C>(db: &C, proposal_id: i64) -> Result<PricedProposal>
where
    C: ConnectionTrait,
{
    let proposal = find_proposal(db, proposal_id).await?;
    let input = load_input(db, &proposal).await?;
    let breakdown = calculate(&input)?;

    let mut active: trip_proposal::ActiveModel = proposal.into();
    active.subtotal = Set(breakdown.subtotal);
    active.taxes = Set(breakdown.taxes);
    active.gratuity_amount = Set(breakdown.gratuity);
    active.planning_fee_amount = Set(breakdown.planning_fee);
    active.total = Set(breakdown.total);
    active.deposit_amount = Set(breakdown.deposit_amount);
    active.updated_at = Set(chrono::Utc::now());
    let proposal = active.update(db).await?;

    Ok(PricedProposal {
        proposal,
        breakdown,
    })
}

/// Recalculates a proposal's totals atomically.
///
/// On failure nothing is written and the previous totals remain.
pub async fn recalculate(db: &DatabaseConnection, proposal_id: i64) -> Result<PricedProposal> {
    let txn = db.begin().await?;
    let priced = recalculate_in(&txn, proposal_id).await?;
    txn.commit().await?;

    tracing::info!(
        proposal_id,
        subtotal = priced.breakdown.subtotal,
        taxes = priced.breakdown.taxes,
        total = priced.breakdown.total,
        "Recalculated proposal pricing"
    );
    Ok(priced)
}
