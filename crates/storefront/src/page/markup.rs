//! Hydration from server-rendered markup.
//!
//! Reads the DOM contract points listed in [`super::dom`] and builds the
//! page document plus the cart aggregate the rows describe.

use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use unibites_core::ProductId;

use super::{Document, Page, dom};
use crate::cart::{CartError, CartLine, CartState};
use crate::validation::{Constraint, Form, FormField};

/// Markup values the interaction layer cannot work with.
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("invalid selector {0}: {1}")]
    Selector(&'static str, String),
    #[error("cart row is missing a product id")]
    MissingProductId,
    #[error("cart row {product_id} has an invalid price: {value:?}")]
    InvalidPrice { product_id: String, value: String },
    #[error("cart rows are inconsistent: {0}")]
    Cart(#[from] CartError),
}

/// A hydrated page and the cart it renders.
pub struct Hydration {
    pub page: Page,
    pub cart: CartState,
}

pub(super) fn hydrate(html: &str) -> Result<Hydration, MarkupError> {
    let document = Html::parse_document(html);

    let csrf_token = document
        .select(&selector(dom::CSRF_META)?)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::to_string);

    let cart = CartState::from_lines(
        document
            .select(&selector(dom::CART_ITEM)?)
            .map(cart_line)
            .collect::<Result<Vec<_>, _>>()?,
    )?;

    let has_results = exists(&document, dom::SEARCH_RESULTS)?;
    let forms = document
        .select(&selector(dom::VALIDATED_FORM)?)
        .enumerate()
        .map(|(index, form)| validated_form(index, form))
        .collect::<Result<Vec<_>, _>>()?;

    let doc = Document {
        csrf_token,
        has_loader: exists(&document, dom::PAGE_LOADER)?,
        cart_total: element_text(&document, dom::CART_TOTAL)?,
        cart_count: element_text(&document, dom::CART_COUNT)?,
        cart_rows: cart
            .lines()
            .map(|line| (line.product_id.clone(), line.quantity().to_string()))
            .collect(),
        has_search_input: exists(&document, dom::SEARCH_INPUT)?,
        has_search_form: exists(&document, dom::SEARCH_FORM)?,
        search_results: has_results.then_some(None),
        forms: forms.into_iter().map(|f| (f.id.clone(), f)).collect(),
        ..Document::default()
    };

    tracing::debug!(
        lines = cart.len(),
        has_token = doc.csrf_token.is_some(),
        loader = doc.has_loader,
        "page hydrated"
    );

    Ok(Hydration {
        page: Page::new(doc),
        cart,
    })
}

fn selector(css: &'static str) -> Result<Selector, MarkupError> {
    Selector::parse(css).map_err(|e| MarkupError::Selector(css, e.to_string()))
}

fn exists(document: &Html, css: &'static str) -> Result<bool, MarkupError> {
    Ok(document.select(&selector(css)?).next().is_some())
}

fn element_text(document: &Html, css: &'static str) -> Result<Option<String>, MarkupError> {
    Ok(document
        .select(&selector(css)?)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string()))
}

fn cart_line(row: ElementRef<'_>) -> Result<CartLine, MarkupError> {
    let attrs = row.value();
    let product_id = attrs
        .id()
        .and_then(|id| id.strip_prefix(dom::CART_ITEM_ID_PREFIX))
        .or_else(|| attrs.attr("data-product-id"))
        .filter(|id| !id.is_empty())
        .ok_or(MarkupError::MissingProductId)?;

    let raw_price = attrs.attr("data-price").unwrap_or_default();
    let unit_price = raw_price
        .trim()
        .parse::<Decimal>()
        .map_err(|_| MarkupError::InvalidPrice {
            product_id: product_id.to_string(),
            value: raw_price.to_string(),
        })?;

    // Unparsable or zero quantities display as 1.
    let quantity = row
        .select(&selector(dom::QUANTITY_INPUT)?)
        .next()
        .and_then(|input| input.value().attr("value"))
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|q| *q >= 1)
        .unwrap_or(1);

    Ok(CartLine::new(
        ProductId::new(product_id),
        quantity,
        unit_price,
    )?)
}

fn validated_form(index: usize, form: ElementRef<'_>) -> Result<Form, MarkupError> {
    let id = form
        .value()
        .id()
        .map_or_else(|| format!("form-{index}"), str::to_string);

    let fields = form
        .select(&selector("input[name], textarea[name], select[name]")?)
        .filter_map(|input| {
            let attrs = input.value();
            let name = attrs.attr("name")?;
            let mut field = FormField::new(name);
            if attrs.attr("required").is_some() {
                field = field.with(Constraint::Required);
            }
            if let Some(n) = attrs.attr("minlength").and_then(|v| v.parse().ok()) {
                field = field.with(Constraint::MinLength(n));
            }
            if let Some(n) = attrs.attr("maxlength").and_then(|v| v.parse().ok()) {
                field = field.with(Constraint::MaxLength(n));
            }
            if let Some(n) = attrs.attr("min").and_then(|v| v.parse().ok()) {
                field = field.with(Constraint::Min(n));
            }
            if let Some(n) = attrs.attr("max").and_then(|v| v.parse().ok()) {
                field = field.with(Constraint::Max(n));
            }
            if attrs.attr("type") == Some("email") {
                field = field.with(Constraint::Email);
            }
            Some(field)
        })
        .collect();

    Ok(Form::new(id, fields))
}
