use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::identity::Caller;
use crate::domain::order::{
    CartLine, DeliveryInfo, OrderCommandHandler, OrderError, OrderId, PlaceOrder,
};

// ============================================================================
// Order Routes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Option<Vec<CartLine>>,
    pub delivery_address: Option<String>,
    pub delivery_phone: Option<String>,
    pub payment_method: Option<String>,
    pub special_instructions: Option<String>,
    pub scheduled_delivery: Option<DateTime<Utc>>,
}

impl From<CreateOrderRequest> for PlaceOrder {
    fn from(req: CreateOrderRequest) -> Self {
        PlaceOrder::new(
            req.items.unwrap_or_default(),
            DeliveryInfo {
                address: req.delivery_address,
                phone: req.delivery_phone,
                payment_method: req.payment_method,
                special_instructions: req.special_instructions,
                scheduled_delivery: req.scheduled_delivery,
            },
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UserOrdersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[tracing::instrument(
    name = "create_order",
    skip_all,
    fields(request_id = %Uuid::new_v4(), user_id = caller.id)
)]
pub async fn create_order(
    handler: web::Data<OrderCommandHandler>,
    caller: Caller,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, OrderError> {
    let order = handler
        .create_order(Some(caller.id), body.into_inner().into())
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Order created successfully",
        "order": {
            "id": order.id,
            "total_amount": order.total_amount,
            "status": order.status,
        }
    })))
}

#[tracing::instrument(
    name = "get_order",
    skip_all,
    fields(request_id = %Uuid::new_v4(), user_id = caller.id, order_id = *order_id)
)]
pub async fn get_order(
    handler: web::Data<OrderCommandHandler>,
    caller: Caller,
    order_id: web::Path<OrderId>,
) -> Result<HttpResponse, OrderError> {
    let order = handler.get_order(&caller, order_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "order": order,
    })))
}

#[tracing::instrument(
    name = "update_order_status",
    skip_all,
    fields(request_id = %Uuid::new_v4(), user_id = caller.id, order_id = *order_id)
)]
pub async fn update_order_status(
    handler: web::Data<OrderCommandHandler>,
    caller: Caller,
    order_id: web::Path<OrderId>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, OrderError> {
    handler
        .update_order_status(&caller, order_id.into_inner(), body.status.trim())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Order status updated successfully",
    })))
}

#[tracing::instrument(
    name = "list_user_orders",
    skip_all,
    fields(request_id = %Uuid::new_v4(), user_id = caller.id)
)]
pub async fn list_user_orders(
    handler: web::Data<OrderCommandHandler>,
    caller: Caller,
    query: web::Query<UserOrdersQuery>,
) -> Result<HttpResponse, OrderError> {
    let orders = handler
        .list_user_orders(&caller, query.status.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "orders": orders,
    })))
}

#[tracing::instrument(
    name = "list_admin_orders",
    skip_all,
    fields(request_id = %Uuid::new_v4(), user_id = caller.id)
)]
pub async fn list_admin_orders(
    handler: web::Data<OrderCommandHandler>,
    caller: Caller,
    query: web::Query<AdminOrdersQuery>,
) -> Result<HttpResponse, OrderError> {
    let orders = handler
        .list_all_orders(&caller, query.status.as_deref(), query.limit, query.offset)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "orders": orders,
    })))
}
