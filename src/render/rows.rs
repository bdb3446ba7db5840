use crate::data_models::{Product, ProductStatus};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub id: Uuid,
    pub title: String,
    pub price: String,
    pub status: &'static str,
    pub category_id: String,
    pub thumbnail: Option<String>,
}

fn status_label(status: ProductStatus) -> &'static str {
    match status {
        ProductStatus::Available => "Available",
        ProductStatus::Sold => "Sold",
        ProductStatus::Pending => "Pending",
    }
}

pub fn format_price(price: f64) -> String {
    format!("${price:.2}")
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            price: format_price(product.price),
            status: status_label(product.status),
            category_id: product.category_id.clone(),
            thumbnail: product
                .image_url
                .clone()
                .or_else(|| product.images.first().cloned()),
        }
    }
}

impl Display for ProductRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<40} {:>10}  {:<9} {}",
            self.title, self.price, self.status, self.category_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_row_works() {
        let product = Product {
            title: "Desk lamp".to_string(),
            price: 12.5,
            status: ProductStatus::Pending,
            image_url: None,
            images: vec!["lamp.jpg".to_string()],
            ..Product::dummy()
        };
        let row = ProductRow::from(&product);
        assert_eq!(row.price, "$12.50".to_string());
        assert_eq!(row.status, "Pending");
        assert_eq!(row.thumbnail, Some("lamp.jpg".to_string()));
        assert!(row.to_string().starts_with("Desk lamp"));
    }
}
