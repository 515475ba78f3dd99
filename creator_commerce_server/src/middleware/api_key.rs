//! Admin API-key middleware.
//!
//! The admin surface (batch management, ledger views, backfill) sits behind a single shared
//! key presented in the `X-CCG-Api-Key` header. Wallet-grade auth is deliberately out of
//! scope for this service; the admin UI holds the key server-side.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    Error,
};
use ccg_common::Secret;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::helpers::constant_time_eq;

pub const API_KEY_HEADER: &str = "X-CCG-Api-Key";

pub struct ApiKeyMiddlewareFactory {
    key: Secret<String>,
}

impl ApiKeyMiddlewareFactory {
    pub fn new(key: Secret<String>) -> Self {
        ApiKeyMiddlewareFactory { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = ApiKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyMiddlewareService { key: self.key.clone(), service: Rc::new(service) }))
    }
}

pub struct ApiKeyMiddlewareService<S> {
    key: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let expected = self.key.reveal().clone();
        Box::pin(async move {
            let presented = req.headers().get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
            match presented {
                Some(key) if constant_time_eq(key.as_bytes(), expected.as_bytes()) => {
                    trace!("🔑️ Admin API key accepted");
                    service.call(req).await
                },
                Some(_) => {
                    warn!("🔑️ Invalid admin API key presented. Denying access.");
                    Err(ErrorUnauthorized("Invalid API key."))
                },
                None => {
                    warn!("🔑️ No admin API key presented. Denying access.");
                    Err(ErrorUnauthorized("No API key found."))
                },
            }
        })
    }
}
