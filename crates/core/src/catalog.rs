//! Product catalog and authoritative price table.
//!
//! The catalog is a fixed, process-wide list. It is the only place a price
//! comes from: the cart copies a product's price when an item is first added,
//! and the order service looks every line up again at submission time.

use serde::Serialize;

use crate::types::Price;

/// Dietary labels shown on product cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DietaryTag {
    Vegan,
    GlutenFree,
}

/// A product for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "priceInCents")]
    pub price: Price,
    /// Net weight; `None` for assembled items such as gift baskets.
    pub weight_oz: Option<u32>,
    pub short_description: &'static str,
    pub long_description: &'static str,
    pub dietary_tags: &'static [DietaryTag],
}

const VEGAN_GLUTEN_FREE: &[DietaryTag] = &[DietaryTag::Vegan, DietaryTag::GlutenFree];

/// Everything currently for sale.
pub static PRODUCTS: [Product; 4] = [
    Product {
        id: "nuts-6oz",
        name: "6 oz Cinnamon Roasted Nuts",
        price: Price::from_cents(1000),
        weight_oz: Some(6),
        short_description: "The perfect snack size, a warm cinnamon glaze with five simple ingredients.",
        long_description: "Our signature cinnamon roasted nuts use just five simple ingredients. \
            No artificial flavors, no preservatives, just the way grandma made them.",
        dietary_tags: VEGAN_GLUTEN_FREE,
    },
    Product {
        id: "nuts-8oz",
        name: "8 oz Cinnamon Roasted Nuts",
        price: Price::from_cents(1500),
        weight_oz: Some(8),
        short_description: "Most popular size, perfect for sharing at home or taking on the road.",
        long_description: "Our most popular bag. The same five-ingredient cinnamon glaze \
            you'll follow from a hundred yards away at the market.",
        dietary_tags: VEGAN_GLUTEN_FREE,
    },
    Product {
        id: "nuts-15oz",
        name: "15 oz Cinnamon Roasted Nuts",
        price: Price::from_cents(2300),
        weight_oz: Some(15),
        short_description: "Family size. Stock up and savor every last nut.",
        long_description: "When you can't get enough. Our family-size bag keeps the cinnamon \
            aroma alive all week, if they last that long.",
        dietary_tags: VEGAN_GLUTEN_FREE,
    },
    Product {
        id: "gift-basket",
        name: "Holiday Gift Basket",
        price: Price::from_cents(4000),
        weight_oz: None,
        short_description: "A curated basket with all three sizes and a personal note.",
        long_description: "Give the gift of warm, fresh-roasted cinnamon nuts. Our Holiday Gift \
            Basket includes all three bag sizes, presented in a rustic wooden basket.",
        dietary_tags: VEGAN_GLUTEN_FREE,
    },
];

/// Read access to a set of products.
///
/// The server holds one as its authoritative price table; the cart uses one
/// to resolve names and prices when items are added.
pub trait Catalog: Send + Sync {
    /// All products, in display order.
    fn products(&self) -> &[Product];

    /// Look up a product by ID.
    fn product(&self, id: &str) -> Option<&Product> {
        self.products().iter().find(|p| p.id == id)
    }

    /// Current price for a product ID, or `None` if it is not sold.
    fn price_of(&self, id: &str) -> Option<Price> {
        self.product(id).map(|p| p.price)
    }
}

/// The built-in catalog backed by [`PRODUCTS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

impl Catalog for StaticCatalog {
    fn products(&self) -> &[Product] {
        &PRODUCTS
    }
}

/// Look up a product in the built-in catalog.
#[must_use]
pub fn product_by_id(id: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_exactly_four_products() {
        assert_eq!(StaticCatalog.products().len(), 4);
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<_> = PRODUCTS.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), PRODUCTS.len());
        for sku in ["nuts-6oz", "nuts-8oz", "nuts-15oz", "gift-basket"] {
            assert!(ids.contains(sku), "missing {sku}");
        }
    }

    #[test]
    fn test_lookup_by_id() {
        let product = StaticCatalog.product("nuts-8oz").expect("known product");
        assert_eq!(product.price.cents(), 1500);
        assert_eq!(product.name, "8 oz Cinnamon Roasted Nuts");
        assert_eq!(StaticCatalog.price_of("gift-basket"), Some(Price::from_cents(4000)));
    }

    #[test]
    fn test_unknown_id() {
        assert!(StaticCatalog.product("nonexistent").is_none());
        assert!(product_by_id("").is_none());
    }

    #[test]
    fn test_every_product_is_vegan_and_gluten_free() {
        for product in &PRODUCTS {
            assert!(product.dietary_tags.contains(&DietaryTag::Vegan));
            assert!(product.dietary_tags.contains(&DietaryTag::GlutenFree));
        }
    }

    #[test]
    fn test_serializes_price_in_cents() {
        let json = serde_json::to_value(&PRODUCTS[0]).expect("serialize");
        assert_eq!(json["priceInCents"], 1000);
        assert_eq!(json["weightOz"], 6);
        assert_eq!(json["dietaryTags"][1], "gluten-free");
    }
}
