use bytes::Bytes;
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use std::{convert::Infallible, net::SocketAddr};
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::leaderboard::LeaderboardService;

/// Serve `service` on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, service: LeaderboardService) -> AppResult<()> {
    let make_service = make_service_fn(move |_conn| {
        let service = service.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |request| {
                let service = service.clone();
                async move { Ok::<_, Infallible>(dispatch(&service, request).await) }
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_service);
    info!("Leaderboard listening on http://{}", server.local_addr());

    server.with_graceful_shutdown(shutdown_signal()).await?;
    info!("Leaderboard server stopped.");
    Ok(())
}

async fn dispatch(service: &LeaderboardService, request: Request<Body>) -> Response<Body> {
    let (parts, body) = request.into_parts();
    let body = match hyper::body::to_bytes(body).await {
        Ok(body) => body,
        Err(e) => {
            error!("Could not read request body: {e}");
            // An unreadable body gets the same answer as an unparsable one.
            Bytes::new()
        }
    };

    let response = service.handle(Request::from_parts(parts, body)).await;
    response.map(Body::from)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        let error = AppError::Other(format!("Could not install Ctrl-C handler. {e}"));
        error!("{error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LeaderboardConfig;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_dispatch_round_trip() {
        let service =
            LeaderboardService::new(LeaderboardConfig::default(), Some(Arc::new(MemoryStore::new())));

        let request = Request::post("/scores")
            .body(Body::from(r#"{"name":"ace","score":7}"#))
            .unwrap();
        let response = dispatch(&service, request).await;
        assert_eq!(response.status(), 200);

        let request = Request::get("/scores").body(Body::empty()).unwrap();
        let response = dispatch(&service, request).await;
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], br#"[{"name":"ACE","score":7}]"#);
    }
}
