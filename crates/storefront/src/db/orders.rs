//! Order repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use cloud_retail_core::{OrderId, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderWithUser};

/// Repository for order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a `Pending` order and empty the user's cart in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either statement fails; nothing
    /// is committed in that case.
    pub async fn place_and_clear_cart(
        &self,
        user_id: UserId,
        total_amount: Decimal,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r"
            INSERT INTO retail.order (user_id, total_amount, status)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, total_amount, status, order_date
            ",
        )
        .bind(user_id)
        .bind(total_amount)
        .bind(OrderStatus::Pending)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM retail.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(order)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, total_amount, status, order_date
            FROM retail.order
            WHERE user_id = $1
            ORDER BY order_date DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Every order with its owner's username, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all_with_users(&self) -> Result<Vec<OrderWithUser>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderWithUser>(
            r"
            SELECT o.id, o.user_id, u.username, o.total_amount, o.status, o.order_date
            FROM retail.order o
            JOIN retail.user u ON u.id = o.user_id
            ORDER BY o.order_date DESC, o.id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Number of orders, optionally restricted to a user or a status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(
        &self,
        user_id: Option<UserId>,
        status: Option<OrderStatus>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM retail.order
            WHERE ($1::INTEGER IS NULL OR user_id = $1)
              AND ($2::retail.order_status IS NULL OR status = $2)
            ",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Change an order's status.
    ///
    /// # Returns
    ///
    /// Returns `true` if the order existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE retail.order SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
