use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::shared::format::{format_elapsed, format_number};

/// Middleware для логирования HTTP запросов
///
/// Пишет в tracing:
/// - метод и путь
/// - статус код
/// - длительность
/// - размер ответа (форматированный)
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let (parts, body) = response.into_parts();

    // Читаем тело ответа, чтобы узнать реальный размер
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(
                "{} {} -> {} in {} (body error: {})",
                method,
                path,
                parts.status.as_u16(),
                format_elapsed(start.elapsed()),
                e
            );
            return Response::from_parts(parts, Body::default());
        }
    };

    let elapsed = format_elapsed(start.elapsed());
    let size = format_number(bytes.len());
    if parts.status.is_success() {
        tracing::info!("{} {} -> {} in {}, {} bytes", method, path, parts.status.as_u16(), elapsed, size);
    } else {
        tracing::warn!("{} {} -> {} in {}, {} bytes", method, path, parts.status.as_u16(), elapsed, size);
    }

    Response::from_parts(parts, Body::from(bytes))
}
