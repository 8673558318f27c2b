use crate::error::GuardError;
use crate::rate_limit::{Action, RateLimitConfig, RateLimiter, ANONYMOUS_IDENTIFIER};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A layer that checks a [`RateLimiter`] before every request.
///
/// `identify` maps a request to the caller's identifier; `None` falls back to
/// [`ANONYMOUS_IDENTIFIER`].
pub struct RateLimitLayer<F> {
    limiter: RateLimiter,
    action: Arc<str>,
    config: RateLimitConfig,
    identify: Arc<F>,
}

impl<F> RateLimitLayer<F> {
    /// Gate on a table action.
    pub fn new(limiter: RateLimiter, action: Action, identify: F) -> Self {
        Self::custom(limiter, action.as_str(), action.config(), identify)
    }

    /// Gate on an arbitrary action name and limit.
    pub fn custom(
        limiter: RateLimiter,
        action: impl Into<Arc<str>>,
        config: RateLimitConfig,
        identify: F,
    ) -> Self {
        Self { limiter, action: action.into(), config, identify: Arc::new(identify) }
    }
}

impl<F> Clone for RateLimitLayer<F> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            action: self.action.clone(),
            config: self.config,
            identify: self.identify.clone(),
        }
    }
}

impl<F> std::fmt::Debug for RateLimitLayer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitLayer")
            .field("action", &self.action)
            .field("config", &self.config)
            .field("identify", &"<extractor>")
            .finish()
    }
}

impl<S, F> Layer<S> for RateLimitLayer<F> {
    type Service = RateLimitService<S, F>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService { inner: service, layer: self.clone() }
    }
}

/// Middleware service that enforces rate limits.
pub struct RateLimitService<S, F> {
    inner: S,
    layer: RateLimitLayer<F>,
}

impl<S: Clone, F> Clone for RateLimitService<S, F> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), layer: self.layer.clone() }
    }
}

impl<S, F, Req> Service<Req> for RateLimitService<S, F>
where
    S: Service<Req>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    S::Response: Send + 'static,
    F: Fn(&Req) -> Option<String>,
{
    type Response = S::Response;
    type Error = GuardError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(GuardError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let identifier = (self.layer.identify)(&req)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| ANONYMOUS_IDENTIFIER.to_string());
        let action = &self.layer.action;
        let decision = self.layer.limiter.check(&identifier, action, self.layer.config);

        if !decision.allowed {
            let err = GuardError::RateLimited { action: action.to_string(), reset_in: decision.reset_in };
            return Box::pin(async move { Err::<S::Response, _>(err) });
        }

        let fut = self.inner.call(req);
        Box::pin(async move { fut.await.map_err(GuardError::Inner) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::{service_fn, ServiceExt};

    #[derive(Debug, Clone)]
    struct AddToCart {
        session: Option<String>,
        sku: &'static str,
    }

    fn cart(session: Option<&str>) -> AddToCart {
        AddToCart { session: session.map(str::to_string), sku: "SKU-1" }
    }

    #[tokio::test]
    async fn denies_without_calling_inner_once_limit_is_hit() {
        let clock = ManualClock::new(0);
        let limiter = RateLimiter::with_clock(Arc::new(clock.clone()));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_inner = calls.clone();
        let inner = service_fn(move |req: AddToCart| {
            calls_inner.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, Infallible>(req.sku) }
        });
        let config = RateLimitConfig::from_millis(2, 10_000).unwrap();
        let layer = RateLimitLayer::custom(limiter, "addToCart", config, |r: &AddToCart| r.session.clone());
        let svc = layer.layer(inner);

        assert_eq!(svc.clone().oneshot(cart(Some("s1"))).await.unwrap(), "SKU-1");
        assert_eq!(svc.clone().oneshot(cart(Some("s1"))).await.unwrap(), "SKU-1");

        clock.advance(Duration::from_millis(4_000));
        let err = svc.clone().oneshot(cart(Some("s1"))).await.unwrap_err();
        assert_eq!(
            err,
            GuardError::RateLimited { action: "addToCart".into(), reset_in: Duration::from_millis(6_000) }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // another session has its own window
        assert!(svc.oneshot(cart(Some("s2"))).await.is_ok());
    }

    #[tokio::test]
    async fn anonymous_requests_share_a_window() {
        let limiter = RateLimiter::with_clock(Arc::new(ManualClock::new(0)));
        let inner = service_fn(|_: AddToCart| async { Ok::<_, Infallible>(()) });
        let svc = RateLimitLayer::new(limiter.clone(), Action::Register, |r: &AddToCart| r.session.clone())
            .layer(inner);

        for _ in 0..3 {
            svc.clone().oneshot(cart(None)).await.unwrap();
        }
        let err = svc.oneshot(cart(Some(""))).await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(limiter.window(ANONYMOUS_IDENTIFIER, "register").unwrap().count, 3);
    }

    #[tokio::test]
    async fn inner_errors_are_wrapped() {
        let limiter = RateLimiter::with_clock(Arc::new(ManualClock::new(0)));
        let inner = service_fn(|_: AddToCart| async {
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "out of stock"))
        });
        let svc = RateLimitLayer::new(limiter, Action::Checkout, |r: &AddToCart| r.session.clone())
            .layer(inner);

        let err = svc.oneshot(cart(Some("s1"))).await.unwrap_err();
        assert_eq!(err.into_inner().unwrap().to_string(), "out of stock");
    }
}
