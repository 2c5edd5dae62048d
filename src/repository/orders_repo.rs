use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use super::{NewOrder, NewOrderItem, OrderFilter, OrderRepository, SeaOrmStore};
use crate::{
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    models::OrderStatus,
};

#[async_trait]
impl OrderRepository for SeaOrmStore {
    async fn create_order_with_items(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> AppResult<(OrderModel, Vec<OrderItemModel>)> {
        let address_snapshot = serde_json::to_value(&order.address_snapshot)
            .map_err(|e| AppError::Internal(e.into()))?;

        // Dropping `txn` on an early return rolls everything back.
        let txn = self.orm.begin().await?;

        let header = OrderActive {
            id: Set(Uuid::new_v4()),
            order_number: Set(order.order_number),
            session_id: Set(order.session_id),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            payment_method: Set(order.payment_method.as_str().to_string()),
            delivery_method: Set(order.delivery_method.as_str().to_string()),
            wilaya_code: Set(order.wilaya_code),
            subtotal_dzd: Set(order.subtotal_dzd),
            shipping_dzd: Set(order.shipping_dzd),
            total_dzd: Set(order.total_dzd),
            address_snapshot: Set(address_snapshot),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;

        let mut rows = Vec::with_capacity(items.len());
        for (line_no, item) in (0i32..).zip(items) {
            let row = OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(header.id),
                line_no: Set(line_no),
                product_id: Set(item.product_id),
                variant_id: Set(item.variant_id),
                title_snapshot: Set(item.title_snapshot),
                unit_price_dzd: Set(item.unit_price_dzd),
                qty: Set(item.qty),
                line_total_dzd: Set(item.line_total_dzd),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
            rows.push(row);
        }

        txn.commit().await?;
        Ok((header, rows))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<OrderModel>> {
        Ok(Orders::find_by_id(id).one(&self.orm).await?)
    }

    async fn items_for(&self, order_id: Uuid) -> AppResult<Vec<OrderItemModel>> {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order_id))
            .order_by_asc(OrderItemCol::LineNo)
            .all(&self.orm)
            .await?;
        Ok(items)
    }

    async fn list(&self, filter: OrderFilter) -> AppResult<(Vec<OrderModel>, u64)> {
        let mut condition = Condition::all();
        if let Some(session_id) = filter.session_id {
            condition = condition.add(OrderCol::SessionId.eq(session_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }

        let mut finder = Orders::find().filter(condition);
        finder = if filter.newest_first {
            finder.order_by_desc(OrderCol::CreatedAt)
        } else {
            finder.order_by_asc(OrderCol::CreatedAt)
        };

        let total = finder.clone().count(&self.orm).await?;
        let orders = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.orm)
            .await?;
        Ok((orders, total))
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> AppResult<Option<OrderModel>> {
        let result = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(to.as_str()))
            .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(OrderCol::Id.eq(id))
            .filter(OrderCol::Status.eq(from.as_str()))
            .exec(&self.orm)
            .await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        Ok(Orders::find_by_id(id).one(&self.orm).await?)
    }
}
