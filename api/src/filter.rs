//! Catalog filter state: what the shopper asked to see.

use crate::money::Money;
use crate::money::ParseMoneyError;
use crate::product::Product;

/// Keywords offered as one-click searches.
pub const SUGGESTED_KEYWORDS: [&str; 6] = ["Apple", "Watch", "Fashion", "Trending", "Shoes", "Clothing"];

/// Plain mutable filter fields. Nothing is validated; a minimum above the
/// maximum simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search_query: String,
    pub selected_category: String,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub keyword: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn set_selected_category(&mut self, category: impl Into<String>) {
        self.selected_category = category.into();
    }

    pub fn set_min_price(&mut self, price: Option<Money>) {
        self.min_price = price;
    }

    pub fn set_max_price(&mut self, price: Option<Money>) {
        self.max_price = price;
    }

    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.keyword = keyword.into();
    }

    /// Picks a category and drops any keyword search.
    pub fn select_category(&mut self, category: impl Into<String>) {
        self.selected_category = category.into();
        self.keyword.clear();
    }

    /// Picks a keyword search and drops any category.
    pub fn select_keyword(&mut self, keyword: impl Into<String>) {
        self.keyword = keyword.into();
        self.selected_category.clear();
    }

    /// Sets the lower bound from text input; blank input clears it.
    pub fn set_min_price_input(&mut self, input: &str) -> Result<(), ParseMoneyError> {
        self.min_price = parse_price_input(input)?;
        Ok(())
    }

    /// Sets the upper bound from text input; blank input clears it.
    pub fn set_max_price_input(&mut self, input: &str) -> Result<(), ParseMoneyError> {
        self.max_price = parse_price_input(input)?;
        Ok(())
    }

    pub fn reset_filters(&mut self) {
        *self = Self::default();
    }

    /// The keyword, if it holds anything besides whitespace.
    pub fn active_keyword(&self) -> Option<&str> {
        let keyword = self.keyword.trim();
        (!keyword.is_empty()).then_some(keyword)
    }

    pub fn is_active(&self) -> bool {
        !self.search_query.is_empty()
            || !self.selected_category.is_empty()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.active_keyword().is_some()
    }

    /// Whether `product` passes every client-side predicate.
    ///
    /// The keyword is not checked here; it selects what the server returns.
    pub fn matches(&self, product: &Product) -> bool {
        if !self.search_query.is_empty()
            && !product
                .title
                .to_lowercase()
                .contains(&self.search_query.to_lowercase())
        {
            return false;
        }
        if !self.selected_category.is_empty() && product.category != self.selected_category {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }
}

fn parse_price_input(input: &str) -> Result<Option<Money>, ParseMoneyError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    Money::new_from_str(input).map(Some)
}

/// Distinct categories in the order they first appear.
pub fn categories_of<'a>(products: impl IntoIterator<Item = &'a Product>) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for product in products {
        if !product.category.is_empty() && !categories.contains(&product.category) {
            categories.push(product.category.clone());
        }
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u64, title: &str, category: &str, price_cents: i64) -> Product {
        Product {
            id,
            title: title.to_string(),
            description: String::new(),
            price: Money::new_from_minor(price_cents),
            rating: 0.0,
            category: category.to_string(),
            thumbnail: String::new(),
            images: Vec::new(),
        }
    }

    #[test]
    fn reset_restores_empty_fields() {
        let mut filters = FilterState::new();
        filters.set_search_query("phone");
        filters.set_selected_category("smartphones");
        filters.set_min_price(Some(Money::new_from_minor(100)));
        filters.set_max_price(Some(Money::new_from_minor(50)));
        filters.set_keyword("Apple");
        assert!(filters.is_active());

        filters.reset_filters();
        assert_eq!(filters.search_query, "");
        assert_eq!(filters.selected_category, "");
        assert_eq!(filters.min_price, None);
        assert_eq!(filters.max_price, None);
        assert_eq!(filters.keyword, "");
        assert!(!filters.is_active());
    }

    #[test]
    fn category_and_keyword_are_exclusive() {
        let mut filters = FilterState::new();
        filters.select_keyword("Shoes");
        filters.select_category("footwear");
        assert_eq!(filters.keyword, "");
        filters.select_keyword("Watch");
        assert_eq!(filters.selected_category, "");
        assert_eq!(filters.keyword, "Watch");
    }

    #[test]
    fn whitespace_keyword_is_inactive() {
        let mut filters = FilterState::new();
        filters.set_keyword("   ");
        assert_eq!(filters.active_keyword(), None);
        assert!(!filters.is_active());
    }

    #[test]
    fn price_input_parsing() {
        let mut filters = FilterState::new();
        filters.set_min_price_input("10.5").unwrap();
        assert_eq!(filters.min_price, Some(Money::new_from_minor(1050)));
        filters.set_min_price_input("  ").unwrap();
        assert_eq!(filters.min_price, None);
        assert!(filters.set_max_price_input("ten").is_err());
        assert_eq!(filters.max_price, None);
    }

    #[test]
    fn predicates_match_title_category_and_inclusive_bounds() {
        let mut filters = FilterState::new();
        let watch = product(1, "Smart Watch", "accessories", 1000);
        filters.set_search_query("WATCH");
        assert!(filters.matches(&watch));

        filters.set_selected_category("Accessories");
        assert!(!filters.matches(&watch));
        filters.set_selected_category("accessories");

        filters.set_min_price(Some(Money::new_from_minor(1000)));
        filters.set_max_price(Some(Money::new_from_minor(1000)));
        assert!(filters.matches(&watch));

        filters.set_min_price(Some(Money::new_from_minor(1001)));
        assert!(!filters.matches(&watch));

        // inverted bounds are allowed and match nothing
        filters.set_min_price(Some(Money::new_from_minor(2000)));
        filters.set_max_price(Some(Money::new_from_minor(500)));
        assert!(!filters.matches(&watch));
    }

    #[test]
    fn categories_keep_first_seen_order() {
        let products = vec![
            product(1, "a", "shoes", 1),
            product(2, "b", "bags", 1),
            product(3, "c", "shoes", 1),
            product(4, "d", "", 1),
        ];
        assert_eq!(categories_of(&products), vec!["shoes", "bags"]);
    }
}
