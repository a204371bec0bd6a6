//! HTTP surface: `GET /` health check and `POST /process`.
//!
//! Every `/process` answer is a JSON [`ProcessResponse`], including bodies
//! that fail to parse or exceed the size limit. Status codes follow
//! [`ServiceError::status_code`].

use crate::error::{ErrorKind, ServiceError, ValidationError};
use crate::model::ProcessResponse;
use crate::service::DeckService;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use serde_json::{json, Value};
use tracing::{error, info, warn};

/// Register app data and routes for `service`.
///
/// ```rust,no_run
/// # use qa2deck::{server, DeckService, MemoryStore, ServiceConfig};
/// # use std::sync::Arc;
/// let svc = DeckService::new(ServiceConfig::default(), Arc::new(MemoryStore::new()));
/// let app = actix_web::App::new().configure(server::configure(svc));
/// ```
pub fn configure(service: DeckService) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let limit = service.config().max_body_bytes;
        cfg.app_data(web::Data::new(service))
            .app_data(json_config(limit))
            .route("/", web::get().to(health))
            .route("/process", web::post().to(process));
    }
}

/// Bind and serve until shutdown.
pub async fn run(service: DeckService) -> std::io::Result<()> {
    let (host, port) = service.config().bind_addr();
    info!(
        "Listening on http://{}:{} (storage: {})",
        host,
        port,
        service.store().name()
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(configure(service.clone()))
            .default_service(web::to(not_found))
    })
    .bind((host, port))?
    .run()
    .await
}

/// JSON extractor config: size limit, any content type, structured errors.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .content_type_required(false)
        .error_handler(move |err, _req| {
            let validation = match &err {
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                    ValidationError::PayloadTooLarge { limit }
                }
                other => ValidationError::MalformedJson {
                    detail: other.to_string(),
                },
            };
            let failure = ServiceError::from(validation);
            warn!("Rejected request body: {}", failure);
            InternalError::from_response(err, failure_response(&failure)).into()
        })
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "Application is running",
        "message": "Welcome to the deck generation API",
    }))
}

async fn process(service: web::Data<DeckService>, body: web::Json<Value>) -> HttpResponse {
    match service.process_value(&body).await {
        Ok(output) => HttpResponse::Ok().json(ProcessResponse::success(output)),
        Err(e) => {
            match e.kind() {
                ErrorKind::ValidationError => warn!("Rejected request: {}", e),
                ErrorKind::RenderError | ErrorKind::StorageError => {
                    error!("Request failed ({}): {}", e.kind().as_str(), e)
                }
            }
            failure_response(&e)
        }
    }
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Not found" }))
}

fn failure_response(error: &ServiceError) -> HttpResponse {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(ProcessResponse::failure(error))
}
