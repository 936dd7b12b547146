//! HTTP-edge error mapping and the error-logging middleware.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpResponse, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
};
use tracing::error;

use sms_core::errors::CoreError;

/// Wraps [`CoreError`] so it can implement [`ResponseError`] and map to the
/// status codes named in the error handling design: `Validation`->400,
/// `NotFound`/`NotCancellable`/`NotRetryable`->404, carrier/internal->500.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub CoreError);

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::NotCancellable(_) | CoreError::NotRetryable(_) => StatusCode::NOT_FOUND,
            CoreError::CarrierTransient(_) | CoreError::CarrierPermanent(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = ErrorBody {
            error: self.0.category(),
            message: self.0.to_string(),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: sms_core::errors::ErrorCategory,
    message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Logs unhandled request errors with the request ID attached.
pub struct ErrorHandler;

impl<S, B> Transform<S, ServiceRequest> for ErrorHandler
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ErrorHandlerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ErrorHandlerMiddleware { service: Rc::new(service) }))
    }
}

pub struct ErrorHandlerMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ErrorHandlerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        Box::pin(async move {
            let request_id = crate::middleware::request_id::extract_request_id(req.request());
            match service.call(req).await {
                Ok(res) => Ok(res),
                Err(err) => {
                    error!(request_id = ?request_id, error = %err, "request failed");
                    Err(err)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = ApiError(CoreError::validation("bad"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_and_state_violations_map_to_404() {
        assert_eq!(ApiError(CoreError::not_found("QueueItem", "1")).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError(CoreError::NotCancellable("1".into())).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError(CoreError::NotRetryable("1".into())).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn carrier_and_internal_errors_map_to_500() {
        assert_eq!(ApiError(CoreError::CarrierTransient("timeout".into())).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError(CoreError::Internal("boom".into())).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
