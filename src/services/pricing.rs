use crate::{
    config::AppConfig,
    entities::{
        diamond_component, metal_component, pricing_breakdown, product_variant, DiamondComponent,
        MetalComponent, PricingBreakdown, ProductVariant,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// New per-gram metal rates keyed by metal and purity. Any field left unset
/// leaves the corresponding components untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MetalRateUpdate {
    pub gold_22k: Option<Decimal>,
    pub gold_18k: Option<Decimal>,
    pub silver: Option<Decimal>,
    pub platinum: Option<Decimal>,
}

/// Outcome of a recalculation batch. One bad variant does not abort the
/// batch; its error is collected here instead.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecalculationSummary {
    pub success: bool,
    pub variants_updated: usize,
    pub errors: Vec<String>,
}

/// Recomputes variant costs from metal and stone component rows.
#[derive(Clone)]
pub struct PricingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl PricingService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Recalculates pricing for the given variants, or for all variants when
    /// `variant_ids` is `None`. If `new_rates` is provided, matching metal
    /// components get their per-gram rate updated first.
    ///
    /// Per-variant failures are collected; the batch reports success as long
    /// as no variant failed or at least one succeeded.
    #[instrument(skip(self))]
    pub async fn recalculate(
        &self,
        variant_ids: Option<Vec<Uuid>>,
        new_rates: Option<MetalRateUpdate>,
    ) -> Result<RecalculationSummary, ServiceError> {
        if let Some(rates) = &new_rates {
            self.update_metal_rates(variant_ids.as_deref(), rates)
                .await?;
            self.event_sender.send_or_log(Event::MetalRatesUpdated).await;
        }

        let targets: Vec<Uuid> = match &variant_ids {
            Some(ids) => {
                ProductVariant::find()
                    .filter(product_variant::Column::Id.is_in(ids.clone()))
                    .all(&*self.db)
                    .await?
                    .into_iter()
                    .map(|v| v.id)
                    .collect()
            }
            None => ProductVariant::find()
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|v| v.id)
                .collect(),
        };

        let mut success_count = 0usize;
        let mut errors = Vec::new();

        for variant_id in targets {
            match self.recalculate_variant(variant_id).await {
                Ok(()) => success_count += 1,
                Err(e) => {
                    warn!("Pricing recalculation failed for variant {}: {}", variant_id, e);
                    errors.push(format!("Variant {}: {}", variant_id, e));
                }
            }
        }

        if success_count > 0 {
            self.event_sender
                .send_or_log(Event::PricingRecalculated {
                    variants_updated: success_count,
                })
                .await;
        }

        info!(
            "Recalculated pricing for {} variants ({} errors)",
            success_count,
            errors.len()
        );

        Ok(RecalculationSummary {
            success: errors.is_empty() || success_count > 0,
            variants_updated: success_count,
            errors,
        })
    }

    /// Bulk-updates `metal_rate_per_g` on components matching each provided
    /// rate key, optionally restricted to the given variant set.
    async fn update_metal_rates(
        &self,
        variant_ids: Option<&[Uuid]>,
        rates: &MetalRateUpdate,
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let purity_22 = Decimal::new(2200, 2);
        let purity_18 = Decimal::new(1800, 2);

        if let Some(rate) = rates.gold_22k {
            self.apply_rate(
                &txn,
                metal_component::MetalType::Gold,
                Some(purity_22),
                rate,
                variant_ids,
            )
            .await?;
        }
        if let Some(rate) = rates.gold_18k {
            self.apply_rate(
                &txn,
                metal_component::MetalType::Gold,
                Some(purity_18),
                rate,
                variant_ids,
            )
            .await?;
        }
        if let Some(rate) = rates.silver {
            self.apply_rate(&txn, metal_component::MetalType::Silver, None, rate, variant_ids)
                .await?;
        }
        if let Some(rate) = rates.platinum {
            self.apply_rate(
                &txn,
                metal_component::MetalType::Platinum,
                None,
                rate,
                variant_ids,
            )
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn apply_rate(
        &self,
        txn: &DatabaseTransaction,
        metal_type: metal_component::MetalType,
        purity_k: Option<Decimal>,
        rate: Decimal,
        variant_ids: Option<&[Uuid]>,
    ) -> Result<(), ServiceError> {
        let mut update = MetalComponent::update_many()
            .col_expr(metal_component::Column::MetalRatePerG, Expr::value(rate))
            .col_expr(metal_component::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(metal_component::Column::MetalType.eq(metal_type));

        if let Some(purity) = purity_k {
            update = update.filter(metal_component::Column::PurityK.eq(purity));
        }
        if let Some(ids) = variant_ids {
            update = update.filter(metal_component::Column::VariantId.is_in(ids.to_vec()));
        }

        update.exec(txn).await?;
        Ok(())
    }

    /// Recomputes one variant's breakdown and writes it back together with
    /// the variant's `base_cost`, all in one transaction.
    async fn recalculate_variant(&self, variant_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let metals = MetalComponent::find()
            .filter(metal_component::Column::VariantId.eq(variant_id))
            .all(&txn)
            .await?;
        let stones = DiamondComponent::find()
            .filter(diamond_component::Column::VariantId.eq(variant_id))
            .all(&txn)
            .await?;

        let mut total_metal_value = Decimal::ZERO;
        let mut total_making_charges = Decimal::ZERO;
        let mut total_wastage_charges = Decimal::ZERO;

        for m in &metals {
            total_metal_value += m.net_weight_g * m.metal_rate_per_g;
            total_making_charges += m.net_weight_g * m.making_charge_per_g + m.making_charge_flat;
            total_wastage_charges += (m.gross_weight_g - m.net_weight_g) * m.metal_rate_per_g;
        }

        let total_stone_value: Decimal = stones
            .iter()
            .map(|s| s.carat * s.stone_price_per_carat)
            .sum();

        let final_cost =
            total_metal_value + total_stone_value + total_making_charges + total_wastage_charges;

        let margin = Decimal::from_f64(self.config.default_margin_percent)
            .ok_or_else(|| ServiceError::ConfigError("Invalid margin percent".to_string()))?;
        let suggested_retail = final_cost * (Decimal::ONE + margin / Decimal::ONE_HUNDRED);

        let now = Utc::now();

        let existing = PricingBreakdown::find_by_id(variant_id).one(&txn).await?;
        match existing {
            Some(row) => {
                let mut row: pricing_breakdown::ActiveModel = row.into();
                row.total_metal_value = Set(total_metal_value);
                row.total_stone_value = Set(total_stone_value);
                row.total_making_charges = Set(total_making_charges);
                row.total_wastage_charges = Set(total_wastage_charges);
                row.final_cost = Set(final_cost);
                row.suggested_retail_price = Set(suggested_retail);
                row.last_calculated_at = Set(now);
                row.update(&txn).await?;
            }
            None => {
                let row = pricing_breakdown::ActiveModel {
                    variant_id: Set(variant_id),
                    total_metal_value: Set(total_metal_value),
                    total_stone_value: Set(total_stone_value),
                    total_making_charges: Set(total_making_charges),
                    total_wastage_charges: Set(total_wastage_charges),
                    final_cost: Set(final_cost),
                    suggested_retail_price: Set(suggested_retail),
                    last_calculated_at: Set(now),
                };
                row.insert(&txn).await?;
            }
        }

        let variant = ProductVariant::find_by_id(variant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;
        let mut variant: product_variant::ActiveModel = variant.into();
        variant.base_cost = Set(final_cost);
        variant.updated_at = Set(now);
        variant.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Current average per-gram rate per (metal, purity), from component rows.
    #[instrument(skip(self))]
    pub async fn current_metal_rates(
        &self,
    ) -> Result<std::collections::HashMap<String, Decimal>, ServiceError> {
        let components = MetalComponent::find().all(&*self.db).await?;

        let mut sums: std::collections::HashMap<String, (Decimal, u32)> =
            std::collections::HashMap::new();
        for c in components {
            let key = format!(
                "{}_{}k",
                match c.metal_type {
                    metal_component::MetalType::Gold => "gold",
                    metal_component::MetalType::Silver => "silver",
                    metal_component::MetalType::Platinum => "platinum",
                },
                c.purity_k.trunc()
            );
            let entry = sums.entry(key).or_insert((Decimal::ZERO, 0));
            entry.0 += c.metal_rate_per_g;
            entry.1 += 1;
        }

        Ok(sums
            .into_iter()
            .map(|(k, (sum, n))| (k, sum / Decimal::from(n)))
            .collect())
    }
}
