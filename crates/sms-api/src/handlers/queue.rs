//! Queue introspection and manual-intervention endpoints (§6).

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use sms_core::queue::{ListFilter, QueueStatus};

use crate::middleware::error_handler::ApiResult;
use crate::state::AppState;

pub async fn stats(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let stats = data.queue_service.stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub campaign_id: Option<i64>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub async fn list_items(data: web::Data<AppState>, query: web::Query<ListQuery>) -> ApiResult<HttpResponse> {
    let filter = ListFilter {
        status: query.status.as_deref().and_then(QueueStatus::from_str_opt),
        campaign_id: query.campaign_id,
    };
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);
    let items = data.queue_service.list(filter, limit, offset).await?;
    Ok(HttpResponse::Ok().json(items))
}

#[derive(Debug, Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel_item(
    data: web::Data<AppState>,
    id: web::Path<i64>,
    body: Option<web::Json<CancelRequest>>,
) -> ApiResult<HttpResponse> {
    let reason = body.and_then(|b| b.into_inner().reason).unwrap_or_else(|| "cancelled by operator".to_string());
    let cancelled = data.queue_service.cancel(id.into_inner(), &reason).await?;
    if cancelled {
        Ok(HttpResponse::Ok().json(serde_json::json!({ "cancelled": true })))
    } else {
        Ok(HttpResponse::NotFound().json(serde_json::json!({ "cancelled": false })))
    }
}

pub async fn retry_item(data: web::Data<AppState>, id: web::Path<i64>) -> ApiResult<HttpResponse> {
    let item = data.queue_service.reset_for_retry(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(item))
}

pub async fn message_timeline(data: web::Data<AppState>, id: web::Path<i64>) -> ApiResult<HttpResponse> {
    let events = data.logging_service.timeline(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(events))
}

pub async fn campaign_stats(data: web::Data<AppState>, id: web::Path<i64>) -> ApiResult<HttpResponse> {
    let stats = data.logging_service.campaign_stats(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[derive(Debug, Deserialize)]
pub struct FailedMessagesQuery {
    pub campaign_id: Option<i64>,
    pub limit: Option<u64>,
}

pub async fn failed_messages(
    data: web::Data<AppState>,
    query: web::Query<FailedMessagesQuery>,
) -> ApiResult<HttpResponse> {
    let limit = query.limit.unwrap_or(100);
    let messages = data.logging_service.failed_for_retry(query.campaign_id, limit).await?;
    Ok(HttpResponse::Ok().json(messages))
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    pub days: Option<i64>,
    pub dry_run: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CleanupResponse {
    Preview(sms_core::queue::CleanupPreview),
    Deleted { deleted: i64 },
}

pub async fn cleanup(data: web::Data<AppState>, query: web::Query<CleanupQuery>) -> ApiResult<HttpResponse> {
    let days = query.days.unwrap_or(30);
    let dry_run = query.dry_run.unwrap_or(true);

    let response = if dry_run {
        CleanupResponse::Preview(data.queue_service.cleanup_preview(days).await?)
    } else {
        CleanupResponse::Deleted { deleted: data.queue_service.cleanup(days).await? }
    };
    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_defaults_apply_when_unset() {
        let query = ListQuery { status: None, campaign_id: None, limit: None, offset: None };
        assert_eq!(query.limit.unwrap_or(50), 50);
        assert_eq!(query.offset.unwrap_or(0), 0);
    }

    #[test]
    fn cleanup_defaults_to_dry_run() {
        let query = CleanupQuery { days: None, dry_run: None };
        assert!(query.dry_run.unwrap_or(true));
        assert_eq!(query.days.unwrap_or(30), 30);
    }
}
