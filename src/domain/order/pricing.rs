use serde::Serialize;
use std::collections::HashMap;

use super::errors::OrderError;
use super::value_objects::{CartLine, MenuItemId, Money, TaxRate};

// ============================================================================
// Order Pricing
// ============================================================================
//
// Unit prices come from the catalog only. Tax is computed once on the
// subtotal, never per line.
//
// ============================================================================

/// Price and availability of a menu item as the catalog reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogPrice {
    pub menu_item_id: MenuItemId,
    pub price: Money,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedLineItem {
    pub menu_item_id: MenuItemId,
    pub unit_price: Money,
    pub quantity: i32,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub lines: Vec<ResolvedLineItem>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    pub delivery_fee: Money,
    pub tax_rate: TaxRate,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            delivery_fee: Money::from_major(40),
            tax_rate: TaxRate::from_basis_points(500),
        }
    }
}

impl PricingPolicy {
    pub fn new(delivery_fee: Money, tax_rate: TaxRate) -> Self {
        Self { delivery_fee, tax_rate }
    }

    /// Price every cart line against one catalog snapshot.
    ///
    /// Fails on the first line (in cart order) whose item is missing from
    /// the snapshot or marked unavailable.
    pub fn price(
        &self,
        lines: &[CartLine],
        catalog: &HashMap<MenuItemId, CatalogPrice>,
    ) -> Result<PricedCart, OrderError> {
        let mut resolved = Vec::with_capacity(lines.len());

        for line in lines {
            let entry = catalog
                .get(&line.menu_item_id)
                .filter(|entry| entry.available)
                .ok_or(OrderError::ItemUnavailable(line.menu_item_id))?;

            let line_total = entry
                .price
                .checked_mul_quantity(line.quantity)
                .ok_or_else(|| overflow(line.menu_item_id))?;

            resolved.push(ResolvedLineItem {
                menu_item_id: line.menu_item_id,
                unit_price: entry.price,
                quantity: line.quantity,
                line_total,
            });
        }

        let subtotal = resolved
            .iter()
            .try_fold(Money::ZERO, |acc, line| acc.checked_add(line.line_total))
            .ok_or_else(|| OrderError::invalid("Order total is too large"))?;

        let tax_amount = self.tax_rate.apply(subtotal);
        let total_amount = subtotal
            .checked_add(self.delivery_fee)
            .and_then(|sum| sum.checked_add(tax_amount))
            .ok_or_else(|| OrderError::invalid("Order total is too large"))?;

        Ok(PricedCart {
            lines: resolved,
            subtotal,
            delivery_fee: self.delivery_fee,
            tax_amount,
            total_amount,
        })
    }
}

fn overflow(menu_item_id: MenuItemId) -> OrderError {
    OrderError::invalid(format!("Quantity too large for menu item {menu_item_id}"))
}
