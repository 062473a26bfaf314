use async_trait::async_trait;
use checkout::error::{CheckoutError, Result};
use checkout::model::{
    Cart, CartItem, CartOwner, ModelId, NewOrder, OrderItem, Paged, PaymentMethod, PaymentResult,
    PlacedOrder, Product, SalesSummary, ShippingAddress, User,
};
use checkout::money::Money;
use checkout::pricing::CartTotals;
use checkout::storage::{CartStore, OrderStore, ProductStore, UserStore};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use tracing::{debug, error, info};

/// Postgres storage backend. Composite operations group their writes under
/// one `begin`/`commit` pair; any failed statement drops the transaction
/// and rolls everything back.
pub struct PgStorage {
    pub pool: PgPool,
}

fn storage_err(err: sqlx::Error) -> CheckoutError {
    CheckoutError::Storage(err.to_string())
}

fn json_err(err: serde_json::Error) -> CheckoutError {
    CheckoutError::Storage(err.to_string())
}

impl PgStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await.map_err(storage_err)?;
        Ok(Self { pool })
    }

    fn cart_from_row(row: &PgRow) -> Result<Cart> {
        let owner = match row
            .try_get::<Option<i64>, _>("user_id")
            .map_err(storage_err)?
        {
            Some(user_id) => CartOwner::User(user_id),
            None => CartOwner::Session(
                row.try_get::<Option<String>, _>("session_cart_id")
                    .map_err(storage_err)?
                    .unwrap_or_default(),
            ),
        };
        let items: Vec<CartItem> =
            serde_json::from_value(row.try_get("items").map_err(storage_err)?)
                .map_err(json_err)?;
        Ok(Cart {
            owner,
            items,
            totals: totals_from_row(row)?,
        })
    }

    fn order_from_row(row: &PgRow) -> Result<PlacedOrder> {
        let payment_method: String = row.try_get("payment_method").map_err(storage_err)?;
        let shipping_address: ShippingAddress =
            serde_json::from_value(row.try_get("shipping_address").map_err(storage_err)?)
                .map_err(json_err)?;
        let payment_result: Option<PaymentResult> = row
            .try_get::<Option<serde_json::Value>, _>("payment_result")
            .map_err(storage_err)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(json_err)?;

        Ok(PlacedOrder {
            id: row.try_get("id").map_err(storage_err)?,
            user_id: row.try_get("user_id").map_err(storage_err)?,
            shipping_address,
            payment_method: PaymentMethod::from_str(&payment_method)?,
            totals: totals_from_row(row)?,
            items: Vec::new(),
            is_paid: row.try_get("is_paid").map_err(storage_err)?,
            paid_at: row.try_get("paid_at").map_err(storage_err)?,
            is_delivered: row.try_get("is_delivered").map_err(storage_err)?,
            delivered_at: row.try_get("delivered_at").map_err(storage_err)?,
            payment_result,
            created_at: row.try_get("created_at").map_err(storage_err)?,
        })
    }

    async fn load_order_items(&self, order_id: ModelId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, name, slug, price, qty, image
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter()
            .map(|row| {
                Ok(OrderItem {
                    product_id: row.try_get("product_id").map_err(storage_err)?,
                    name: row.try_get("name").map_err(storage_err)?,
                    slug: row.try_get("slug").map_err(storage_err)?,
                    price: Money::from_decimal(row.try_get("price").map_err(storage_err)?),
                    qty: row.try_get::<i32, _>("qty").map_err(storage_err)? as u32,
                    image: row.try_get("image").map_err(storage_err)?,
                })
            })
            .collect()
    }

    async fn load_orders_page(
        &self,
        rows: Vec<PgRow>,
        total: i64,
        limit: u32,
    ) -> Result<Paged<PlacedOrder>> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut order = Self::order_from_row(row)?;
            order.items = self.load_order_items(order.id).await?;
            orders.push(order);
        }
        let total_pages = (total as u32).div_ceil(limit.max(1));
        Ok(Paged {
            data: orders,
            total_pages,
        })
    }
}

fn totals_from_row(row: &PgRow) -> Result<CartTotals> {
    Ok(CartTotals {
        items_price: Money::from_decimal(row.try_get("items_price").map_err(storage_err)?),
        shipping_price: Money::from_decimal(row.try_get("shipping_price").map_err(storage_err)?),
        tax_price: Money::from_decimal(row.try_get("tax_price").map_err(storage_err)?),
        total_price: Money::from_decimal(row.try_get("total_price").map_err(storage_err)?),
    })
}

#[async_trait]
impl ProductStore for PgStorage {
    async fn get_product(&self, product_id: ModelId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"SELECT id, name, slug, price, stock, image FROM products WHERE id = $1"#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(|row| {
            Ok(Product {
                id: row.try_get("id").map_err(storage_err)?,
                name: row.try_get("name").map_err(storage_err)?,
                slug: row.try_get("slug").map_err(storage_err)?,
                price: Money::from_decimal(row.try_get("price").map_err(storage_err)?),
                stock: row.try_get("stock").map_err(storage_err)?,
                image: row.try_get("image").map_err(storage_err)?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl CartStore for PgStorage {
    async fn get_cart(&self, owner: &CartOwner) -> Result<Option<Cart>> {
        let query = match owner {
            CartOwner::Session(session_id) => sqlx::query(
                r#"
                SELECT session_cart_id, user_id, items,
                       items_price, shipping_price, tax_price, total_price
                FROM carts WHERE session_cart_id = $1
                "#,
            )
            .bind(session_id.clone()),
            CartOwner::User(user_id) => sqlx::query(
                r#"
                SELECT session_cart_id, user_id, items,
                       items_price, shipping_price, tax_price, total_price
                FROM carts WHERE user_id = $1
                "#,
            )
            .bind(*user_id),
        };

        let row = query.fetch_optional(&self.pool).await.map_err(storage_err)?;
        row.map(|row| Self::cart_from_row(&row)).transpose()
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let items = serde_json::to_value(&cart.items).map_err(json_err)?;
        debug!("Saving cart for {:?}", cart.owner);

        let query = match &cart.owner {
            CartOwner::Session(session_id) => sqlx::query(
                r#"
                INSERT INTO carts (
                    session_cart_id, items, items_price, shipping_price, tax_price, total_price
                ) VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (session_cart_id) DO UPDATE SET
                    items = EXCLUDED.items,
                    items_price = EXCLUDED.items_price,
                    shipping_price = EXCLUDED.shipping_price,
                    tax_price = EXCLUDED.tax_price,
                    total_price = EXCLUDED.total_price
                "#,
            )
            .bind(session_id.clone()),
            CartOwner::User(user_id) => sqlx::query(
                r#"
                INSERT INTO carts (
                    user_id, items, items_price, shipping_price, tax_price, total_price
                ) VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (user_id) DO UPDATE SET
                    items = EXCLUDED.items,
                    items_price = EXCLUDED.items_price,
                    shipping_price = EXCLUDED.shipping_price,
                    tax_price = EXCLUDED.tax_price,
                    total_price = EXCLUDED.total_price
                "#,
            )
            .bind(*user_id),
        };

        query
            .bind(items)
            .bind(cart.totals.items_price.amount())
            .bind(cart.totals.shipping_price.amount())
            .bind(cart.totals.tax_price.amount())
            .bind(cart.totals.total_price.amount())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn reattach_cart(&self, session_id: &str, user_id: ModelId) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let session_cart = sqlx::query(r#"SELECT id FROM carts WHERE session_cart_id = $1"#)
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage_err)?;

        if session_cart.is_some() {
            // The session cart wins over any stale cart already keyed to
            // the user.
            sqlx::query(r#"DELETE FROM carts WHERE user_id = $1"#)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(storage_err)?;
            sqlx::query(
                r#"UPDATE carts SET user_id = $1, session_cart_id = NULL WHERE session_cart_id = $2"#,
            )
            .bind(user_id)
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
            debug!("Re-attached session cart {} to user {}", session_id, user_id);
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStorage {
    async fn get_user(&self, user_id: ModelId) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"SELECT id, name, email, address, payment_method FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(|row| {
            let address: Option<ShippingAddress> = row
                .try_get::<Option<serde_json::Value>, _>("address")
                .map_err(storage_err)?
                .map(serde_json::from_value)
                .transpose()
                .map_err(json_err)?;
            let payment_method = row
                .try_get::<Option<String>, _>("payment_method")
                .map_err(storage_err)?
                .map(|raw| PaymentMethod::from_str(&raw))
                .transpose()?;
            Ok(User {
                id: row.try_get("id").map_err(storage_err)?,
                name: row.try_get("name").map_err(storage_err)?,
                email: row.try_get("email").map_err(storage_err)?,
                address,
                payment_method,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl OrderStore for PgStorage {
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<OrderItem>,
        cart_owner: &CartOwner,
    ) -> Result<ModelId> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let shipping_address = serde_json::to_value(&order.shipping_address).map_err(json_err)?;
        let row = sqlx::query(
            r#"
            INSERT INTO orders (
                user_id, shipping_address, payment_method,
                items_price, shipping_price, tax_price, total_price
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(order.user_id)
        .bind(shipping_address)
        .bind(order.payment_method.to_string())
        .bind(order.totals.items_price.amount())
        .bind(order.totals.shipping_price.amount())
        .bind(order.totals.tax_price.amount())
        .bind(order.totals.total_price.amount())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to insert order record: {}", e);
            storage_err(e)
        })?;
        let order_id: ModelId = row.try_get("id").map_err(storage_err)?;

        debug!("Inserting {} order items for order {}", items.len(), order_id);
        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, name, slug, price, qty, image)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.name.clone())
            .bind(item.slug.clone())
            .bind(item.price.amount())
            .bind(item.qty as i32)
            .bind(item.image.clone())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to insert order item: {}", e);
                storage_err(e)
            })?;
        }

        let zero = Decimal::new(0, 2);
        let clear = match cart_owner {
            CartOwner::Session(session_id) => sqlx::query(
                r#"
                UPDATE carts SET items = '[]'::jsonb,
                    items_price = $2, shipping_price = $2, tax_price = $2, total_price = $2
                WHERE session_cart_id = $1
                "#,
            )
            .bind(session_id.clone()),
            CartOwner::User(user_id) => sqlx::query(
                r#"
                UPDATE carts SET items = '[]'::jsonb,
                    items_price = $2, shipping_price = $2, tax_price = $2, total_price = $2
                WHERE user_id = $1
                "#,
            )
            .bind(*user_id),
        };
        let cleared = clear
            .bind(zero)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        if cleared.rows_affected() == 0 {
            return Err(CheckoutError::NotFound("Cart"));
        }

        tx.commit().await.map_err(storage_err)?;
        info!("Created order {} and cleared source cart", order_id);
        Ok(order_id)
    }

    async fn get_order(&self, order_id: ModelId) -> Result<Option<PlacedOrder>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, shipping_address, payment_method,
                   items_price, shipping_price, tax_price, total_price,
                   is_paid, paid_at, is_delivered, delivered_at,
                   payment_result, created_at
            FROM orders WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        let Some(row) = row else { return Ok(None) };
        let mut order = Self::order_from_row(&row)?;
        order.items = self.load_order_items(order_id).await?;
        Ok(Some(order))
    }

    async fn settle_order(
        &self,
        order_id: ModelId,
        payment_result: Option<PaymentResult>,
        paid_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        // Row lock serializes concurrent settlements of the same order.
        let row = sqlx::query(r#"SELECT is_paid FROM orders WHERE id = $1 FOR UPDATE"#)
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage_err)?
            .ok_or(CheckoutError::NotFound("Order"))?;
        if row.try_get::<bool, _>("is_paid").map_err(storage_err)? {
            return Err(CheckoutError::AlreadyPaid);
        }

        let items = sqlx::query(
            r#"SELECT product_id, name, qty FROM order_items WHERE order_id = $1"#,
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(storage_err)?;

        for item in &items {
            let product_id: ModelId = item.try_get("product_id").map_err(storage_err)?;
            let qty: i32 = item.try_get("qty").map_err(storage_err)?;
            let updated = sqlx::query(
                r#"UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2"#,
            )
            .bind(product_id)
            .bind(qty)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
            if updated.rows_affected() == 0 {
                // Dropping the transaction rolls back earlier decrements.
                return Err(CheckoutError::OutOfStock {
                    product: item.try_get("name").map_err(storage_err)?,
                });
            }
        }

        let payment_result = payment_result
            .map(|pr| serde_json::to_value(&pr))
            .transpose()
            .map_err(json_err)?;
        let flipped = sqlx::query(
            r#"
            UPDATE orders SET is_paid = TRUE, paid_at = $2, payment_result = $3
            WHERE id = $1 AND is_paid = FALSE
            "#,
        )
        .bind(order_id)
        .bind(paid_at)
        .bind(payment_result)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;
        if flipped.rows_affected() == 0 {
            return Err(CheckoutError::AlreadyPaid);
        }

        tx.commit().await.map_err(storage_err)?;
        info!("Settled order {}", order_id);
        Ok(())
    }

    async fn mark_delivered(&self, order_id: ModelId, delivered_at: DateTime<Utc>) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE orders SET is_delivered = TRUE, delivered_at = $2
            WHERE id = $1 AND is_paid = TRUE
            "#,
        )
        .bind(order_id)
        .bind(delivered_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if updated.rows_affected() == 0 {
            let exists = sqlx::query(r#"SELECT 1 AS one FROM orders WHERE id = $1"#)
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_err)?;
            return Err(match exists {
                Some(_) => CheckoutError::NotPaid,
                None => CheckoutError::NotFound("Order"),
            });
        }
        info!("Marked order {} as delivered", order_id);
        Ok(())
    }

    async fn list_user_orders(
        &self,
        user_id: ModelId,
        page: u32,
        limit: u32,
    ) -> Result<Paged<PlacedOrder>> {
        let limit = limit.max(1);
        let offset = i64::from(page.max(1) - 1) * i64::from(limit);

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, shipping_address, payment_method,
                   items_price, shipping_price, tax_price, total_price,
                   is_paid, paid_at, is_delivered, delivered_at,
                   payment_result, created_at
            FROM orders WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let total: i64 = sqlx::query(r#"SELECT COUNT(*) AS count FROM orders WHERE user_id = $1"#)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?
            .try_get("count")
            .map_err(storage_err)?;

        self.load_orders_page(rows, total, limit).await
    }

    async fn list_all_orders(&self, page: u32, limit: u32) -> Result<Paged<PlacedOrder>> {
        let limit = limit.max(1);
        let offset = i64::from(page.max(1) - 1) * i64::from(limit);

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, shipping_address, payment_method,
                   items_price, shipping_price, tax_price, total_price,
                   is_paid, paid_at, is_delivered, delivered_at,
                   payment_result, created_at
            FROM orders
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let total: i64 = sqlx::query(r#"SELECT COUNT(*) AS count FROM orders"#)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?
            .try_get("count")
            .map_err(storage_err)?;

        self.load_orders_page(rows, total, limit).await
    }

    async fn delete_order(&self, order_id: ModelId) -> Result<()> {
        let deleted = sqlx::query(r#"DELETE FROM orders WHERE id = $1"#)
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        if deleted.rows_affected() == 0 {
            return Err(CheckoutError::NotFound("Order"));
        }
        Ok(())
    }

    async fn sales_summary(&self) -> Result<SalesSummary> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM orders) AS orders_count,
                (SELECT COUNT(*) FROM products) AS products_count,
                (SELECT COUNT(*) FROM users) AS users_count,
                (SELECT COALESCE(SUM(total_price), 0) FROM orders) AS total_sales
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(SalesSummary {
            orders_count: row.try_get::<i64, _>("orders_count").map_err(storage_err)? as u64,
            products_count: row.try_get::<i64, _>("products_count").map_err(storage_err)? as u64,
            users_count: row.try_get::<i64, _>("users_count").map_err(storage_err)? as u64,
            total_sales: Money::from_decimal(row.try_get("total_sales").map_err(storage_err)?),
        })
    }
}
