//! Inclusion business logic - Priced line items attached to a proposal.

use crate::{
    core::{money, pricing, proposal},
    entities::{ProposalInclusion, enums::PricingType, proposal_inclusion},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;

fn default_quantity() -> f64 {
    1.0
}

const fn default_taxable() -> bool {
    true
}

/// Fields accepted when adding an inclusion.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInclusion {
    /// What is included
    pub description: String,
    /// How the unit price scales
    pub pricing_type: PricingType,
    /// Number of units, 1 when absent
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    /// Price per unit
    pub unit_price: f64,
    /// Manual line total
    #[serde(default)]
    pub total_price: Option<f64>,
    /// Tax applies, true when absent
    #[serde(default = "default_taxable")]
    pub is_taxable: bool,
    /// Line amount already contains tax
    #[serde(default)]
    pub tax_included_in_price: bool,
    /// Display order
    #[serde(default)]
    pub sort_order: i32,
}

/// Fields accepted when updating an inclusion. `total_price: null` clears the
/// manual line total.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InclusionPatch {
    /// What is included
    pub description: Option<String>,
    /// How the unit price scales
    pub pricing_type: Option<PricingType>,
    /// Number of units
    pub quantity: Option<f64>,
    /// Price per unit
    pub unit_price: Option<f64>,
    /// Manual line total
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub total_price: Option<Option<f64>>,
    /// Tax applies
    pub is_taxable: Option<bool>,
    /// Line amount already contains tax
    pub tax_included_in_price: Option<bool>,
    /// Display order
    pub sort_order: Option<i32>,
}

async fn find_inclusion<C>(
    db: &C,
    proposal_id: i64,
    inclusion_id: i64,
) -> Result<proposal_inclusion::Model>
where
    C: ConnectionTrait,
{
    ProposalInclusion::find_by_id(inclusion_id)
        .one(db)
        .await?
        .filter(|line| line.proposal_id == proposal_id)
        .ok_or(Error::NotFound {
            entity: "inclusion",
            id: inclusion_id,
        })
}

/// Lists a proposal's inclusions in display order.
pub async fn list_inclusions(
    db: &DatabaseConnection,
    proposal_id: i64,
) -> Result<Vec<proposal_inclusion::Model>> {
    ProposalInclusion::find()
        .filter(proposal_inclusion::Column::ProposalId.eq(proposal_id))
        .order_by_asc(proposal_inclusion::Column::SortOrder)
        .order_by_asc(proposal_inclusion::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds an inclusion and reprices the proposal.
pub async fn add_inclusion(
    db: &DatabaseConnection,
    proposal_id: i64,
    new: NewInclusion,
) -> Result<proposal_inclusion::Model> {
    if new.description.trim().is_empty() {
        return Err(Error::validation("description cannot be empty"));
    }
    money::require_non_negative(new.quantity, "quantity")?;
    money::require_non_negative(new.unit_price, "unit_price")?;
    if let Some(total_price) = new.total_price {
        money::require_non_negative(total_price, "total_price")?;
    }

    let txn = db.begin().await?;
    proposal::get_proposal(&txn, proposal_id).await?;

    let line = proposal_inclusion::ActiveModel {
        proposal_id: Set(proposal_id),
        description: Set(new.description.trim().to_string()),
        pricing_type: Set(new.pricing_type),
        quantity: Set(new.quantity),
        unit_price: Set(new.unit_price),
        total_price: Set(new.total_price),
        is_taxable: Set(new.is_taxable),
        tax_included_in_price: Set(new.tax_included_in_price),
        sort_order: Set(new.sort_order),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    pricing::recalculate_in(&txn, proposal_id).await?;
    txn.commit().await?;
    Ok(line)
}

/// Updates an inclusion (including its tax flags) and reprices the proposal.
pub async fn update_inclusion(
    db: &DatabaseConnection,
    proposal_id: i64,
    inclusion_id: i64,
    patch: InclusionPatch,
) -> Result<proposal_inclusion::Model> {
    let txn = db.begin().await?;
    let line = find_inclusion(&txn, proposal_id, inclusion_id).await?;
    let mut active: proposal_inclusion::ActiveModel = line.into();

    if let Some(description) = patch.description {
        if description.trim().is_empty() {
            return Err(Error::validation("description cannot be empty"));
        }
        active.description = Set(description.trim().to_string());
    }
    if let Some(pricing_type) = patch.pricing_type {
        active.pricing_type = Set(pricing_type);
    }
    if let Some(quantity) = patch.quantity {
        money::require_non_negative(quantity, "quantity")?;
        active.quantity = Set(quantity);
    }
    if let Some(unit_price) = patch.unit_price {
        money::require_non_negative(unit_price, "unit_price")?;
        active.unit_price = Set(unit_price);
    }
    if let Some(total_price) = patch.total_price {
        if let Some(value) = total_price {
            money::require_non_negative(value, "total_price")?;
        }
        active.total_price = Set(total_price);
    }
    if let Some(is_taxable) = patch.is_taxable {
        active.is_taxable = Set(is_taxable);
    }
    if let Some(included) = patch.tax_included_in_price {
        active.tax_included_in_price = Set(included);
    }
    if let Some(sort_order) = patch.sort_order {
        active.sort_order = Set(sort_order);
    }

    let updated = active.update(&txn).await?;
    pricing::recalculate_in(&txn, proposal_id).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Removes an inclusion and reprices the proposal.
pub async fn delete_inclusion(
    db: &DatabaseConnection,
    proposal_id: i64,
    inclusion_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;
    let line = find_inclusion(&txn, proposal_id, inclusion_id).await?;
    line.delete(&txn).await?;
    pricing::recalculate_in(&txn, proposal_id).await?;
    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_toggle_tax_flags() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Tax Flags").await?;
        proposal::update_proposal(
            &db,
            created.id,
            proposal::ProposalPatch {
                tax_rate: Some(10.0),
                ..Default::default()
            },
        )
        .await?;
        let line = create_test_inclusion(&db, created.id, 200.0, true).await?;
        assert_eq!(proposal::get_proposal(&db, created.id).await?.total, 220.0);

        let patch: InclusionPatch =
            serde_json::from_str(r#"{"tax_included_in_price": true}"#).unwrap();
        update_inclusion(&db, created.id, line.id, patch).await?;
        let stored = proposal::get_proposal(&db, created.id).await?;
        assert_eq!(stored.taxes, 0.0);
        assert_eq!(stored.total, 200.0);

        let patch: InclusionPatch = serde_json::from_str(
            r#"{"tax_included_in_price": false, "is_taxable": false}"#,
        )
        .unwrap();
        update_inclusion(&db, created.id, line.id, patch).await?;
        assert_eq!(proposal::get_proposal(&db, created.id).await?.total, 200.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_total_price_override_and_clear() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Override").await?;
        let line = create_test_inclusion(&db, created.id, 100.0, false).await?;

        let patch: InclusionPatch = serde_json::from_str(r#"{"total_price": 80.0}"#).unwrap();
        update_inclusion(&db, created.id, line.id, patch).await?;
        assert_eq!(proposal::get_proposal(&db, created.id).await?.subtotal, 80.0);

        let patch: InclusionPatch = serde_json::from_str(r#"{"total_price": null}"#).unwrap();
        let updated = update_inclusion(&db, created.id, line.id, patch).await?;
        assert_eq!(updated.total_price, None);
        assert_eq!(proposal::get_proposal(&db, created.id).await?.subtotal, 100.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_amounts_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Oversized").await?;
        let line = create_test_inclusion(&db, created.id, 100.0, false).await?;

        let new: NewInclusion = serde_json::from_str(
            r#"{"description": "Charter", "pricing_type": "flat", "unit_price": 1e29}"#,
        )
        .unwrap();
        let result = add_inclusion(&db, created.id, new).await;
        assert!(matches!(result, Err(Error::AmountTooLarge { .. })));

        // each factor is accepted, the line they multiply to is not
        let new: NewInclusion = serde_json::from_str(
            r#"{"description": "Charter", "pricing_type": "flat", "quantity": 1e9, "unit_price": 1e9}"#,
        )
        .unwrap();
        let result = add_inclusion(&db, created.id, new).await;
        assert!(matches!(result, Err(Error::AmountTooLarge { .. })));

        let stored = proposal::get_proposal(&db, created.id).await?;
        assert_eq!(stored.subtotal, 100.0);
        assert_eq!(list_inclusions(&db, created.id).await?, vec![line]);
        Ok(())
    }

    #[test]
    fn test_new_inclusion_defaults() {
        let new: NewInclusion = serde_json::from_str(
            r#"{"description": "Tasting fees", "pricing_type": "per_person", "unit_price": 35}"#,
        )
        .unwrap();
        assert_eq!(new.quantity, 1.0);
        assert!(new.is_taxable);
        assert!(!new.tax_included_in_price);
    }

    #[tokio::test]
    async fn test_inclusion_on_other_proposal_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_proposal(&db, "First").await?;
        let second = create_test_proposal(&db, "Second").await?;
        let line = create_test_inclusion(&db, second.id, 10.0, true).await?;

        let result = delete_inclusion(&db, first.id, line.id).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "inclusion",
                ..
            })
        ));
        assert_eq!(list_inclusions(&db, second.id).await?.len(), 1);
        Ok(())
    }
}
