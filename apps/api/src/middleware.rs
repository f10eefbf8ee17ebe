use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use campus_application::WriteScope;
use campus_core::{ActorIdentity, RequestContext};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_LABEL_HEADER: &str = "x-actor-label";

/// Attaches the caller's [`WriteScope`] to the request extensions.
///
/// Requests without an actor header are served but their writes are not audited.
pub async fn resolve_write_scope(mut request: Request, next: Next) -> Response {
    let scope = write_scope_from_headers(request.headers());
    request.extensions_mut().insert(scope);
    next.run(request).await
}

pub fn write_scope_from_headers(headers: &HeaderMap) -> WriteScope {
    let actor = ActorIdentity::resolve(
        header_value(headers, ACTOR_ID_HEADER),
        header_value(headers, ACTOR_LABEL_HEADER),
    );
    let context = extract_request_context(headers);

    WriteScope {
        actor,
        context: (!context.is_empty()).then_some(context),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn extract_request_context(headers: &HeaderMap) -> RequestContext {
    let ip = header_value(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    let user_agent = header_value(headers, "user-agent").map(ToOwned::to_owned);

    RequestContext { ip, user_agent }
}
