//! CORS stage.
//!
//! Preflights are answered here and never reach the target. On relayed
//! responses the stage only fills in: any `Access-Control-*` header the
//! target set is kept as sent, so credentialed responses keep their
//! explicit origin.

use axum::{
    extract::Request,
    http::{HeaderMap, Method},
    middleware::{from_fn, Next},
    response::Response,
    Router,
};
use tower_http::cors::{AllowHeaders, Any, CorsLayer};

/// CORS headers the target sent, held across the CORS layer.
#[derive(Debug, Clone, Default)]
struct TargetCorsHeaders(HeaderMap);

/// Any origin, common methods, requested headers mirrored.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Wrap `router` in the CORS stage.
pub fn wrap(router: Router) -> Router {
    router
        .layer(from_fn(set_aside_target_cors))
        .layer(cors_layer())
        .layer(from_fn(restore_target_cors))
}

fn is_cors_header(name: &str) -> bool {
    name.starts_with("access-control-")
}

/// Inside the CORS layer: move the target's CORS headers out of reach.
async fn set_aside_target_cors(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let names: Vec<_> = response
        .headers()
        .keys()
        .filter(|name| is_cors_header(name.as_str()))
        .cloned()
        .collect();
    if names.is_empty() {
        return response;
    }

    let mut held = HeaderMap::new();
    for name in names {
        for value in response.headers().get_all(&name) {
            held.append(name.clone(), value.clone());
        }
        response.headers_mut().remove(&name);
    }
    response.extensions_mut().insert(TargetCorsHeaders(held));
    response
}

/// Outside the CORS layer: the target's values replace the defaults.
async fn restore_target_cors(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    if let Some(TargetCorsHeaders(held)) = response.extensions_mut().remove::<TargetCorsHeaders>() {
        let headers = response.headers_mut();
        for name in held.keys() {
            headers.remove(name);
        }
        for (name, value) in held.iter() {
            headers.append(name.clone(), value.clone());
        }
    }
    response
}
