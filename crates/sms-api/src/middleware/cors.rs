//! CORS policy construction from [`CorsConfig`].

use actix_cors::Cors;
use actix_web::http::{header, Method};

use crate::config::CorsConfig;

pub fn setup_cors(config: &CorsConfig) -> Cors {
    let mut cors = Cors::default();

    for origin in &config.allowed_origins {
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }

    let mut methods = Vec::new();
    for method_str in &config.allowed_methods {
        match method_str.to_uppercase().as_str() {
            "GET" => methods.push(Method::GET),
            "POST" => methods.push(Method::POST),
            "PUT" => methods.push(Method::PUT),
            "DELETE" => methods.push(Method::DELETE),
            "PATCH" => methods.push(Method::PATCH),
            "OPTIONS" => methods.push(Method::OPTIONS),
            "HEAD" => methods.push(Method::HEAD),
            _ => tracing::warn!("unknown HTTP method in CORS config: {}", method_str),
        }
    }
    cors = cors.allowed_methods(methods);

    let mut headers = Vec::new();
    for header_str in &config.allowed_headers {
        match header_str.to_lowercase().as_str() {
            "content-type" => headers.push(header::CONTENT_TYPE),
            "authorization" => headers.push(header::AUTHORIZATION),
            "x-requested-with" => headers.push(header::HeaderName::from_static("x-requested-with")),
            "accept" => headers.push(header::ACCEPT),
            "origin" => headers.push(header::ORIGIN),
            _ => {
                if let Ok(header_name) = header::HeaderName::try_from(header_str.as_str()) {
                    headers.push(header_name);
                } else {
                    tracing::warn!("invalid header name in CORS config: {}", header_str);
                }
            }
        }
    }
    cors = cors.allowed_headers(headers);

    let mut expose_headers = Vec::new();
    for header_str in &config.expose_headers {
        match header_str.to_lowercase().as_str() {
            "x-total-count" => expose_headers.push(header::HeaderName::from_static("x-total-count")),
            "x-request-id" => expose_headers.push(header::HeaderName::from_static("x-request-id")),
            _ => {
                if let Ok(header_name) = header::HeaderName::try_from(header_str.as_str()) {
                    expose_headers.push(header_name);
                } else {
                    tracing::warn!("invalid expose header name in CORS config: {}", header_str);
                }
            }
        }
    }
    if !expose_headers.is_empty() {
        cors = cors.expose_headers(expose_headers);
    }

    if let Some(max_age) = config.max_age {
        cors = cors.max_age(max_age);
    }

    if config.supports_credentials {
        cors = cors.supports_credentials();
    }

    cors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_cors_does_not_panic() {
        let config = CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string()],
            allowed_headers: vec!["content-type".to_string(), "authorization".to_string()],
            expose_headers: vec!["x-total-count".to_string()],
            max_age: Some(3600),
            supports_credentials: true,
        };
        let _cors = setup_cors(&config);
    }
}
