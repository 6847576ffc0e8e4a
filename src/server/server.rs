//! HTTP server core implementation

use crate::config::{Config, ServerConfig};
use crate::core::orchestrator::Orchestrator;
use crate::server::routes;
use crate::server::state::AppState;
use crate::utils::error::{GatewayError, Result};
use actix_cors::Cors;
use actix_web::{App, HttpServer as ActixHttpServer, middleware::DefaultHeaders, web};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

/// HTTP server
pub struct HttpServer {
    /// Server configuration
    config: ServerConfig,
    /// Application state
    state: AppState,
}

impl HttpServer {
    /// Build the pipeline and the HTTP server from configuration
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Creating HTTP server");
        let orchestrator = Orchestrator::new(config.clone()).await?;
        Ok(Self::from_orchestrator(Arc::new(orchestrator)))
    }

    /// Serve an already-built pipeline
    pub fn from_orchestrator(orchestrator: Arc<Orchestrator>) -> Self {
        let state = AppState::new(orchestrator);
        Self {
            config: state.config.server().clone(),
            state,
        }
    }

    fn cors(state: &AppState) -> Cors {
        let cors_config = &state.config.server().cors;
        if !cors_config.enabled {
            return Cors::default();
        }

        let mut cors = Cors::default();
        if cors_config.allows_all_origins() {
            cors = cors.allow_any_origin();
            cors_config.validate().unwrap_or_else(|e| {
                warn!(error = %e, "CORS Configuration Warning");
            });
        } else {
            for origin in &cors_config.allowed_origins {
                cors = cors.allowed_origin(origin);
            }
        }

        let methods: Vec<actix_web::http::Method> = cors_config
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        if !methods.is_empty() {
            cors = cors.allowed_methods(methods);
        }

        let headers: Vec<actix_web::http::header::HeaderName> = cors_config
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        if !headers.is_empty() {
            cors = cors.allowed_headers(headers);
        }

        cors.max_age(cors_config.max_age as usize)
    }

    /// Create the Actix-web application
    pub fn create_app(
        state: web::Data<AppState>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let cors = Self::cors(&state);
        let json_config = web::JsonConfig::default()
            .limit(state.config.server().max_body_size)
            .error_handler(|err, _req| GatewayError::validation(err.to_string()).into());
        let query_config = web::QueryConfig::default()
            .error_handler(|err, _req| GatewayError::validation(err.to_string()).into());

        App::new()
            .app_data(state)
            .app_data(json_config)
            .app_data(query_config)
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(DefaultHeaders::new().add(("Server", "docqa-gateway")))
            .configure(routes::configure_routes)
    }

    /// Start the dispatcher and serve until the process is told to stop
    pub async fn start(self) -> Result<()> {
        let bind_addr = self.config.address();
        let port = self.config.port;
        let orchestrator = Arc::clone(&self.state.orchestrator);

        info!("Starting HTTP server on {}", bind_addr);
        orchestrator.start();

        let state = web::Data::new(self.state);
        let mut server = ActixHttpServer::new(move || Self::create_app(state.clone()));
        if let Some(workers) = self.config.workers {
            server = server.workers(workers);
        }
        let server = server
            .bind(&bind_addr)
            .map_err(|e| Self::format_bind_error(e, &bind_addr, port))?
            .run();

        info!("HTTP server listening on {}", bind_addr);
        let served = server.await;

        orchestrator.shutdown().await;
        served.map_err(|e| GatewayError::internal(format!("Server error: {}", e)))?;

        info!("HTTP server stopped");
        Ok(())
    }

    fn format_bind_error(error: std::io::Error, bind_addr: &str, port: u16) -> GatewayError {
        if error.kind() == std::io::ErrorKind::AddrInUse {
            GatewayError::Config(format!(
                "Port {} is already in use; pick another with --port {} or PORT={}",
                port,
                port.saturating_add(1),
                port.saturating_add(1)
            ))
        } else {
            GatewayError::Config(format!("Failed to bind {}: {}", bind_addr, error))
        }
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}
