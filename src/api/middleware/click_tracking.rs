//! 点击追踪中间件
//!
//! 带推广码参数的请求先交给 [`ClickTracker`]，再进入正常路由。
//! 追踪失败只记日志，请求总会继续处理；签发的 cookie 附加到最终响应上。

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::tracking::{ClickTracker, TrackingOutcome};

#[derive(Clone)]
pub struct ClickTracking {
    tracker: Arc<ClickTracker>,
}

impl ClickTracking {
    pub fn new(tracker: Arc<ClickTracker>) -> Self {
        Self { tracker }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ClickTracking
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ClickTrackingMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClickTrackingMiddleware {
            service: Rc::new(service),
            tracker: self.tracker.clone(),
        }))
    }
}

pub struct ClickTrackingMiddleware<S> {
    service: Rc<S>,
    tracker: Arc<ClickTracker>,
}

impl<S, B> Service<ServiceRequest> for ClickTrackingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let tracker = self.tracker.clone();
        let context = tracker.context_from_request(req.request());

        Box::pin(async move {
            let cookie = match context {
                Some(ctx) => match tracker.track(&ctx).await {
                    Ok(TrackingOutcome::Applied { cookie, click }) => {
                        trace!("Referral {} tracked: {:?}", ctx.ref_code, click);
                        Some(cookie)
                    }
                    Ok(TrackingOutcome::Skipped(reason)) => {
                        debug!("Referral {} skipped: {}", ctx.ref_code, reason);
                        None
                    }
                    Err(e) => {
                        warn!("Click tracking for {} failed: {}", ctx.ref_code, e);
                        None
                    }
                },
                None => None,
            };

            let mut response = srv.call(req).await?;
            if let Some(cookie) = cookie
                && let Err(e) = response.response_mut().add_cookie(&cookie)
            {
                warn!("Failed to attach tracking cookie: {}", e);
            }
            Ok(response)
        })
    }
}
