//! Cart pricing and order message construction.
//!
//! Cart lines reference products by row key in the `Product` partition.
//! Lines whose product has disappeared are shown as "Unknown Product" and
//! contribute nothing to the order.

use rust_decimal::Decimal;

use cloud_retail_core::{
    OrderItem, OrderMessage, PRODUCT_PARTITION, ProductModel, StorageError, StorageService,
};

use crate::models::{CartItem, Order};

/// A cart row joined with its product, if it still exists.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Option<ProductModel>,
}

impl CartLine {
    /// Product name for display.
    #[must_use]
    pub fn product_name(&self) -> &str {
        self.product
            .as_ref()
            .map_or("Unknown Product", |p| p.name.as_str())
    }

    /// Unit price, zero when the product is missing.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        self.product.as_ref().map_or(Decimal::ZERO, |p| p.price)
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.item.quantity)
    }
}

/// The priced content of a cart at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub items: Vec<OrderItem>,
    pub total: Decimal,
}

/// Look up the product of every cart row.
///
/// # Errors
///
/// Returns `StorageError` if a product lookup fails (a missing product is
/// not an error).
pub async fn load_cart_lines(
    storage: &dyn StorageService,
    items: Vec<CartItem>,
) -> Result<Vec<CartLine>, StorageError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product = storage
            .get_product(PRODUCT_PARTITION, &item.product_id)
            .await?;
        lines.push(CartLine { item, product });
    }
    Ok(lines)
}

/// Price every line whose product exists.
#[must_use]
pub fn price_cart(lines: &[CartLine]) -> PricedCart {
    let items: Vec<OrderItem> = lines
        .iter()
        .filter_map(|line| {
            line.product.as_ref().map(|product| OrderItem {
                product_id: line.item.product_id.clone(),
                quantity: line.item.quantity,
                unit_price: product.price,
            })
        })
        .collect();
    let total = items.iter().map(OrderItem::line_total).sum();
    PricedCart { items, total }
}

/// The queue message for a placed order, or `None` when nothing was priced.
#[must_use]
pub fn order_message(order: &Order, priced: PricedCart) -> Option<OrderMessage> {
    if priced.items.is_empty() {
        return None;
    }
    Some(OrderMessage {
        order_id: order.id,
        user_id: order.user_id,
        items: priced.items,
        total_amount: priced.total,
        order_date: order.order_date,
        status: order.status,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use cloud_retail_core::{CartItemId, OrderId, OrderStatus, UserId};
    use cloud_retail_storage::{MemoryBackend, Storage, StorageSettings};

    use super::*;

    fn item(id: i32, product_id: &str, quantity: i32) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            user_id: UserId::new(7),
            product_id: product_id.to_owned(),
            quantity,
        }
    }

    fn product(row_key: &str, cents: i64) -> ProductModel {
        ProductModel {
            row_key: row_key.to_owned(),
            name: format!("Product {row_key}"),
            price: Decimal::new(cents, 2),
            ..ProductModel::default()
        }
    }

    #[test]
    fn test_total_is_sum_of_price_times_quantity() {
        let lines = vec![
            CartLine {
                item: item(1, "a", 2),
                product: Some(product("a", 1250)),
            },
            CartLine {
                item: item(2, "b", 1),
                product: Some(product("b", 399)),
            },
        ];

        let priced = price_cart(&lines);
        assert_eq!(priced.total, Decimal::new(2899, 2));
        assert_eq!(priced.items.len(), 2);
        assert_eq!(priced.items[0].unit_price, Decimal::new(1250, 2));
    }

    #[test]
    fn test_missing_products_are_skipped() {
        let lines = vec![
            CartLine {
                item: item(1, "gone", 5),
                product: None,
            },
            CartLine {
                item: item(2, "b", 3),
                product: Some(product("b", 100)),
            },
        ];

        let priced = price_cart(&lines);
        assert_eq!(priced.total, Decimal::new(300, 2));
        assert_eq!(priced.items.len(), 1);
        assert_eq!(lines[0].product_name(), "Unknown Product");
        assert_eq!(lines[0].line_total(), Decimal::ZERO);
    }

    #[test]
    fn test_no_message_when_nothing_priced() {
        let order = Order {
            id: OrderId::new(3),
            user_id: UserId::new(7),
            total_amount: Decimal::ZERO,
            status: OrderStatus::Pending,
            order_date: Utc::now(),
        };
        let lines = vec![CartLine {
            item: item(1, "gone", 1),
            product: None,
        }];

        assert!(order_message(&order, price_cart(&lines)).is_none());
    }

    #[test]
    fn test_message_carries_order_fields() {
        let order = Order {
            id: OrderId::new(3),
            user_id: UserId::new(7),
            total_amount: Decimal::new(500, 2),
            status: OrderStatus::Pending,
            order_date: Utc::now(),
        };
        let lines = vec![CartLine {
            item: item(1, "a", 1),
            product: Some(product("a", 500)),
        }];

        let message = order_message(&order, price_cart(&lines)).unwrap();
        assert_eq!(message.order_id, OrderId::new(3));
        assert_eq!(message.user_id, UserId::new(7));
        assert_eq!(message.total_amount, Decimal::new(500, 2));
        assert_eq!(message.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_load_cart_lines_joins_products() {
        let storage: Arc<dyn StorageService> = Arc::new(Storage::new(
            MemoryBackend::new(),
            StorageSettings::default(),
        ));
        storage.add_product(product("a", 100), None).await.unwrap();

        let lines = load_cart_lines(storage.as_ref(), vec![item(1, "a", 1), item(2, "x", 1)])
            .await
            .unwrap();
        assert_eq!(lines[0].product_name(), "Product a");
        assert!(lines[1].product.is_none());
    }
}
