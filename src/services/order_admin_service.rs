use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::{Order, OrderItem, OrderStatus},
    repository::OrderFilter,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

fn order_from_entity(model: crate::entity::orders::Model) -> AppResult<Order> {
    Order::from_entity(model).map_err(|e| AppError::Internal(e.into()))
}

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = OrderFilter {
        session_id: None,
        status: query.status,
        newest_first: !matches!(query.sort_order, Some(SortOrder::Asc)),
        limit: limit as u64,
        offset: offset as u64,
    };

    if let Some((list, meta)) = state.order_cache.get(&filter).await {
        tracing::debug!(page, "order list served from cache");
        return Ok(ApiResponse::success("Ok", list, Some(meta)));
    }

    let (orders, total) = state.repos.orders.list(filter.clone()).await?;
    let items = orders
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let list = OrderList { items };
    let meta = Meta::new(page, limit, total as i64);
    state
        .order_cache
        .insert(filter, (list.clone(), meta.clone()))
        .await;

    Ok(ApiResponse::success("Ok", list, Some(meta)))
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = state
        .repos
        .orders
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    let items = state.repos.orders.items_for(order.id).await?;

    Ok(ApiResponse::ok(
        "Ok",
        OrderWithItems {
            order: order_from_entity(order)?,
            items: items.into_iter().map(OrderItem::from).collect(),
        },
    ))
}

pub async fn update_status(
    state: &AppState,
    user: &AdminUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let order = state
        .repos
        .orders
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;

    let current: OrderStatus = order
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    let next = payload.status;
    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "cannot move order from {current} to {next}"
        )));
    }

    // A concurrent change between the read and the write leaves nothing updated.
    let updated = state
        .repos
        .orders
        .update_status(id, current, next)
        .await?
        .ok_or_else(|| AppError::Conflict("order status changed concurrently".into()))?;
    state.order_cache.invalidate();

    tracing::info!(
        order_number = %updated.order_number,
        from = %current,
        to = %next,
        "order status updated"
    );
    log_audit(
        state,
        Some(user.email.clone()),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": id,
            "from": current.as_str(),
            "to": next.as_str(),
        })),
    )
    .await;

    Ok(ApiResponse::ok("Status updated", order_from_entity(updated)?))
}
