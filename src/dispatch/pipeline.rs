//! Pre-routing pipeline stages.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::http::request::Request;
use crate::http::response::Response;

/// Future returned by a stage: the (possibly annotated) request plus an
/// optional short-circuit response.
pub type StageFuture = Pin<Box<dyn Future<Output = (Request, Option<Response>)> + Send>>;

/// An ordered, named pre-routing processing unit.
///
/// Stages run in registration order for every request, before resolution.
/// Returning `Some(response)` stops dispatch; the response goes straight
/// back to the client.
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &str;
    fn process(&self, request: Request, cancel: CancellationToken) -> StageFuture;
}

/// Shared reference to a registered stage.
pub type StageRef = Arc<dyn PipelineStage>;

/// A stage built from a name and an async closure.
pub struct FnStage<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnStage<F>
where
    F: Fn(Request, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (Request, Option<Response>)> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> StageRef {
        Arc::new(Self {
            name: name.into(),
            f,
        })
    }
}

impl<F, Fut> PipelineStage for FnStage<F>
where
    F: Fn(Request, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = (Request, Option<Response>)> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, request: Request, cancel: CancellationToken) -> StageFuture {
        Box::pin((self.f)(request, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn fn_stage_passes_request_through() {
        let stage = FnStage::new("noop", |req, _cancel| async move { (req, None) });
        assert_eq!(stage.name(), "noop");
        let req = Request::new(Method::GET, "h", "/x");
        let (req, resp) = stage.process(req, CancellationToken::new()).await;
        assert_eq!(req.path, "/x");
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn fn_stage_can_short_circuit() {
        let stage = FnStage::new("deny", |req, _cancel| async move {
            let resp = Response::new(StatusCode::FORBIDDEN);
            (req, Some(resp))
        });
        let (_req, resp) = stage
            .process(Request::new(Method::GET, "h", "/x"), CancellationToken::new())
            .await;
        assert_eq!(resp.unwrap().status, StatusCode::FORBIDDEN);
    }
}
