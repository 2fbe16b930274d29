//! Cart aggregate.
//!
//! The single source of truth for cart lines. Quantities never drop below
//! one here; removing a line is a separate, explicit operation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use thiserror::Error;
use unibites_core::ProductId;

/// Errors raised by cart invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("product {0} is not in the cart")]
    UnknownLine(ProductId),
    #[error("product {0} is already in the cart")]
    DuplicateLine(ProductId),
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("unit price cannot be negative")]
    NegativePrice,
}

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    quantity: u32,
    pub unit_price: Decimal,
}

impl CartLine {
    /// Create a line.
    ///
    /// # Errors
    ///
    /// Returns an error if `quantity` is zero or `unit_price` is negative.
    pub fn new(product_id: ProductId, quantity: u32, unit_price: Decimal) -> Result<Self, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if unit_price.is_sign_negative() && !unit_price.is_zero() {
            return Err(CartError::NegativePrice);
        }
        Ok(Self {
            product_id,
            quantity,
            unit_price,
        })
    }

    /// Current quantity (always at least 1).
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Cart lines keyed by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    lines: BTreeMap<ProductId, CartLine>,
}

impl CartState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from lines, rejecting duplicate products.
    ///
    /// # Errors
    ///
    /// Returns `CartError::DuplicateLine` if two lines share a product id.
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Result<Self, CartError> {
        let mut state = Self::new();
        for line in lines {
            state.insert(line)?;
        }
        Ok(state)
    }

    /// Add a new line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::DuplicateLine` if the product already has a line.
    pub fn insert(&mut self, line: CartLine) -> Result<(), CartError> {
        if self.lines.contains_key(&line.product_id) {
            return Err(CartError::DuplicateLine(line.product_id));
        }
        self.lines.insert(line.product_id.clone(), line);
        Ok(())
    }

    /// Look up a line.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.get(product_id)
    }

    /// Quantity of a line.
    #[must_use]
    pub fn quantity(&self, product_id: &ProductId) -> Option<u32> {
        self.lines.get(product_id).map(CartLine::quantity)
    }

    /// Apply a signed change, clamping at 1.
    ///
    /// Returns `(previous, current)`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::UnknownLine` if the product has no line.
    pub fn apply_delta(
        &mut self,
        product_id: &ProductId,
        delta: i64,
    ) -> Result<(u32, u32), CartError> {
        let line = self
            .lines
            .get_mut(product_id)
            .ok_or_else(|| CartError::UnknownLine(product_id.clone()))?;
        let previous = line.quantity;
        let next = i64::from(previous).saturating_add(delta).max(1);
        line.quantity = u32::try_from(next).unwrap_or(u32::MAX);
        Ok((previous, line.quantity))
    }

    /// Overwrite a line's quantity.
    ///
    /// Returns the previous quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the product has no line or `quantity` is zero.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        let line = self
            .lines
            .get_mut(product_id)
            .ok_or_else(|| CartError::UnknownLine(product_id.clone()))?;
        Ok(std::mem::replace(&mut line.quantity, quantity))
    }

    /// Remove a line, returning it.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartLine> {
        self.lines.remove(product_id)
    }

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.values().map(CartLine::subtotal).sum()
    }

    /// Lines in product id order.
    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
