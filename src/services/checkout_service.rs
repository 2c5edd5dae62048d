use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        checkout::{CartLine, CheckoutForm, PlacedOrder},
        orders::{OrderList, OrderWithItems},
    },
    error::{AppError, AppResult},
    models::{AddressSnapshot, DeliveryMethod, Order, OrderItem, PaymentMethod},
    repository::{NewOrder, NewOrderItem, OrderFilter},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    session,
    state::AppState,
    validation::non_empty,
};

/// Checkout input after every check that needs no storage.
#[derive(Debug)]
struct ValidatedCheckout {
    session_id: Uuid,
    address: AddressSnapshot,
    wilaya_code: i32,
    delivery_method: DeliveryMethod,
    payment_method: PaymentMethod,
    lines: Vec<CartLine>,
    subtotal: i64,
    shipping: i64,
    total: i64,
}

fn missing_information() -> AppError {
    AppError::BadRequest("missing information".into())
}

fn invalid_cart_data() -> AppError {
    AppError::BadRequest("invalid cart data".into())
}

fn parse_amount(raw: Option<&str>, field: &str) -> AppResult<i64> {
    let raw = non_empty(raw).ok_or_else(missing_information)?;
    raw.parse::<i64>()
        .map_err(|_| AppError::BadRequest(format!("invalid {field} amount")))
}

fn validate_form(raw_session: Option<&str>, form: &CheckoutForm) -> AppResult<ValidatedCheckout> {
    let raw_session = raw_session.ok_or_else(|| {
        AppError::Unauthorized("session not found, please refresh the page".into())
    })?;
    let session_id = session::parse_session_id(raw_session)
        .ok_or_else(|| AppError::Unauthorized("invalid session".into()))?;

    let delivery_method = match non_empty(form.delivery_method.as_deref()) {
        Some(raw) => raw.parse::<DeliveryMethod>().map_err(AppError::BadRequest)?,
        None => DeliveryMethod::Home,
    };

    let (Some(first_name), Some(last_name), Some(phone), Some(address), Some(wilaya)) = (
        non_empty(form.first_name.as_deref()),
        non_empty(form.last_name.as_deref()),
        non_empty(form.phone.as_deref()),
        non_empty(form.address.as_deref()),
        non_empty(form.wilaya_code.as_deref()),
    ) else {
        return Err(missing_information());
    };
    let stop_desk_name = non_empty(form.stop_desk_name.as_deref());
    if delivery_method == DeliveryMethod::Desk && stop_desk_name.is_none() {
        return Err(missing_information());
    }

    let wilaya_code = wilaya
        .parse::<i32>()
        .ok()
        .filter(|code| (1..=69).contains(code))
        .ok_or_else(|| AppError::BadRequest("invalid wilaya".into()))?;

    let payment_method = match non_empty(form.payment_method.as_deref()) {
        Some(raw) => raw.parse::<PaymentMethod>().map_err(AppError::BadRequest)?,
        None => PaymentMethod::CashOnDelivery,
    };

    let lines: Vec<CartLine> = serde_json::from_str(form.cart_items.as_deref().unwrap_or("[]"))
        .map_err(|_| invalid_cart_data())?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("cart is empty".into()));
    }
    if lines.iter().any(|line| line.quantity <= 0) {
        return Err(invalid_cart_data());
    }

    let subtotal = parse_amount(form.subtotal.as_deref(), "subtotal")?;
    let shipping = parse_amount(form.shipping.as_deref(), "shipping")?;
    let total = parse_amount(form.total.as_deref(), "total")?;
    if shipping < 0 || subtotal.checked_add(shipping) != Some(total) {
        return Err(AppError::BadRequest("order totals do not add up".into()));
    }

    Ok(ValidatedCheckout {
        session_id,
        address: AddressSnapshot {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: phone.to_string(),
            address: address.to_string(),
            stop_desk_name: match delivery_method {
                DeliveryMethod::Desk => stop_desk_name.map(str::to_string),
                DeliveryMethod::Home => None,
            },
        },
        wilaya_code,
        delivery_method,
        payment_method,
        lines,
        subtotal,
        shipping,
        total,
    })
}

/// Prices every cart line from the catalog. Titles and unit prices sent by
/// the browser are ignored.
async fn price_lines(state: &AppState, lines: &[CartLine]) -> AppResult<Vec<NewOrderItem>> {
    let mut ids: Vec<Uuid> = lines.iter().map(|line| line.product.id).collect();
    ids.sort_unstable();
    ids.dedup();

    let catalog: HashMap<Uuid, _> = state
        .repos
        .products
        .find_by_ids(&ids)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    lines
        .iter()
        .map(|line| {
            let product = catalog
                .get(&line.product.id)
                .filter(|product| product.is_active)
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "product {} is no longer available",
                        line.product.id
                    ))
                })?;
            let line_total_dzd = product
                .price_dzd
                .checked_mul(i64::from(line.quantity))
                .ok_or_else(invalid_cart_data)?;
            Ok(NewOrderItem {
                product_id: product.id,
                variant_id: line.variant_id,
                title_snapshot: product.name_fr.clone(),
                unit_price_dzd: product.price_dzd,
                qty: line.quantity,
                line_total_dzd,
            })
        })
        .collect()
}

pub async fn place_order(
    state: &AppState,
    raw_session: Option<&str>,
    form: CheckoutForm,
) -> AppResult<ApiResponse<PlacedOrder>> {
    let checkout = validate_form(raw_session, &form)?;

    let items = price_lines(state, &checkout.lines).await?;
    let computed_subtotal = items
        .iter()
        .try_fold(0i64, |acc, item| acc.checked_add(item.line_total_dzd))
        .ok_or_else(invalid_cart_data)?;
    if computed_subtotal != checkout.subtotal {
        tracing::info!(
            session_id = %checkout.session_id,
            submitted = checkout.subtotal,
            computed = computed_subtotal,
            "checkout subtotal mismatch"
        );
        return Err(AppError::BadRequest(
            "cart prices changed, please review your cart".into(),
        ));
    }

    let new_order = NewOrder {
        order_number: state.order_numbers.next(),
        session_id: checkout.session_id,
        payment_method: checkout.payment_method,
        delivery_method: checkout.delivery_method,
        wilaya_code: checkout.wilaya_code,
        subtotal_dzd: checkout.subtotal,
        shipping_dzd: checkout.shipping,
        total_dzd: checkout.total,
        address_snapshot: checkout.address,
    };

    let (order, items) = state
        .repos
        .orders
        .create_order_with_items(new_order, items)
        .await?;
    state.order_cache.invalidate();

    tracing::info!(
        order_number = %order.order_number,
        session_id = %order.session_id,
        items = items.len(),
        total_dzd = order.total_dzd,
        "order placed"
    );
    log_audit(
        state,
        Some(order.session_id.to_string()),
        "order_placed",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "order_number": order.order_number,
            "total_dzd": order.total_dzd,
        })),
    )
    .await;

    Ok(ApiResponse::ok(
        "Order placed",
        PlacedOrder {
            success: true,
            order_id: order.id,
            order_number: order.order_number,
        },
    ))
}

pub async fn list_session_orders(
    state: &AppState,
    session_id: Uuid,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = OrderFilter {
        session_id: Some(session_id),
        status: query.status,
        newest_first: !matches!(query.sort_order, Some(SortOrder::Asc)),
        limit: limit as u64,
        offset: offset as u64,
    };
    let (orders, total) = state.repos.orders.list(filter).await?;
    let items = orders
        .into_iter()
        .map(Order::from_entity)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(page, limit, total as i64)),
    ))
}

pub async fn get_session_order(
    state: &AppState,
    session_id: Uuid,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = state
        .repos
        .orders
        .find_by_id(order_id)
        .await?
        .filter(|order| order.session_id == session_id)
        .ok_or(AppError::NotFound)?;
    let items = state.repos.orders.items_for(order.id).await?;

    let order = Order::from_entity(order).map_err(|e| AppError::Internal(e.into()))?;
    Ok(ApiResponse::ok(
        "Ok",
        OrderWithItems {
            order,
            items: items.into_iter().map(OrderItem::from).collect(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = "0b7e4a4c-3a0b-4d2c-9a51-5a3c2a1f9e10";

    fn form() -> CheckoutForm {
        CheckoutForm {
            first_name: Some("Amine".into()),
            last_name: Some("Kaci".into()),
            phone: Some("0555000000".into()),
            address: Some("12 rue Didouche Mourad".into()),
            wilaya_code: Some("16".into()),
            delivery_method: Some("home".into()),
            payment_method: Some("cod".into()),
            cart_items: Some(format!(
                r#"[{{"product":{{"id":"{}","title":"x","price":1}},"quantity":2}}]"#,
                Uuid::new_v4()
            )),
            subtotal: Some("2000".into()),
            shipping: Some("300".into()),
            total: Some("2300".into()),
            ..Default::default()
        }
    }

    fn message(err: AppError) -> String {
        err.to_string()
    }

    #[test]
    fn accepts_complete_form() {
        let checkout = validate_form(Some(SESSION), &form()).unwrap();
        assert_eq!(checkout.total, 2300);
        assert_eq!(checkout.lines.len(), 1);
        assert_eq!(checkout.payment_method, PaymentMethod::CashOnDelivery);
        assert!(checkout.address.stop_desk_name.is_none());
    }

    #[test]
    fn session_is_checked_first() {
        let err = validate_form(None, &CheckoutForm::default()).unwrap_err();
        assert_eq!(message(err), "session not found, please refresh the page");
        let err = validate_form(Some("nope"), &form()).unwrap_err();
        assert_eq!(message(err), "invalid session");
    }

    #[test]
    fn blank_fields_are_missing_information() {
        let mut f = form();
        f.phone = Some("   ".into());
        assert_eq!(message(validate_form(Some(SESSION), &f).unwrap_err()), "missing information");

        let mut f = form();
        f.delivery_method = Some("desk".into());
        assert_eq!(message(validate_form(Some(SESSION), &f).unwrap_err()), "missing information");
        f.stop_desk_name = Some("Relais Bab Ezzouar".into());
        let checkout = validate_form(Some(SESSION), &f).unwrap();
        assert_eq!(checkout.address.stop_desk_name.as_deref(), Some("Relais Bab Ezzouar"));
    }

    #[test]
    fn cart_errors() {
        let mut f = form();
        f.cart_items = Some("{not json".into());
        assert_eq!(message(validate_form(Some(SESSION), &f).unwrap_err()), "invalid cart data");
        f.cart_items = Some("[]".into());
        assert_eq!(message(validate_form(Some(SESSION), &f).unwrap_err()), "cart is empty");
    }

    #[test]
    fn totals_must_add_up() {
        let mut f = form();
        f.total = Some("2200".into());
        assert!(validate_form(Some(SESSION), &f).is_err());

        let mut f = form();
        f.shipping = Some("-100".into());
        f.total = Some("1900".into());
        assert!(validate_form(Some(SESSION), &f).is_err());
    }
}
