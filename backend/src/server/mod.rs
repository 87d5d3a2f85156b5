//! Server construction and middleware wiring.

mod config;
mod state_builders;
mod workers;

pub use config::{AppSettings, ServerConfig};
pub use state_builders::{Wiring, build_wiring};
pub use workers::{Workers, start_workers};

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use seckill::Trace;
#[cfg(debug_assertions)]
use seckill::doc::ApiDoc;
use seckill::inbound::http::health::{HealthState, live, ready};
use seckill::inbound::http::state::HttpState;
use seckill::inbound::http::{api_scope, json_config};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .wrap(Trace)
        .service(api_scope())
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server.
///
/// The health state is marked ready once the listener is bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        bind_addr,
        http_state,
    } = config;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use env_lock::lock_env;
    use mockable::DefaultClock;
    use ortho_config::OrthoConfig;
    use rstest::rstest;
    use serde_json::{Value, json};
    use std::sync::Arc;

    async fn in_memory_state() -> web::Data<HttpState> {
        let settings = {
            let _guard = lock_env([
                ("SECKILL_DATABASE_URL", None::<String>),
                ("SECKILL_REDIS_URL", None::<String>),
            ]);
            AppSettings::load_from_iter([OsString::from("seckill")]).expect("config should load")
        };
        let wiring = build_wiring(&settings, Arc::new(DefaultClock))
            .await
            .expect("in-memory wiring");
        web::Data::new(wiring.http_state)
    }

    #[rstest]
    #[actix_web::test]
    async fn responses_carry_a_trace_id_header() {
        let health_state = web::Data::new(HealthState::new());
        health_state.mark_ready();
        let app = actix_test::init_service(build_app(AppDependencies {
            health_state,
            http_state: in_memory_state().await,
        }))
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/health/ready")
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("trace-id"));
    }

    #[rstest]
    #[actix_web::test]
    async fn sale_routes_are_mounted_under_api_v1() {
        let app = actix_test::init_service(build_app(AppDependencies {
            health_state: web::Data::new(HealthState::new()),
            http_state: in_memory_state().await,
        }))
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/voucher/seckill")
                .set_json(json!({"voucherId": 404, "userId": 1}))
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["code"], "not_found");
        assert!(body["traceId"].is_string());
    }
}
