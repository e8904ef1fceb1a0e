use actix_cors::Cors;
use actix_web::{
    delete, get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult,
};
use actix_ws::Message;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use wfcore::io::{export_file_name, export_workflow, import_workflow};
use wfcore::templates::workflow_templates;
use wfcore::{ExecutionContext, FlowError, WorkflowDraft, WorkflowError};
use wfruntime::{analyze, RunOptions, RuntimeConfig, WorkflowRuntime};

/// Application state shared across handlers
struct AppState {
    runtime: Arc<WorkflowRuntime>,
}

/// Request body for workflow execution
#[derive(Debug, Default, Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    context: serde_json::Map<String, serde_json::Value>,
}

/// Response for workflow creation
#[derive(Debug, Serialize)]
struct WorkflowResponse {
    id: String,
    message: String,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn not_found(id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: format!("Workflow {} not found", id),
    })
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "wfserver"
    }))
}

/// List all workflows
#[get("/api/workflows")]
async fn list_workflows(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let workflow_list: Vec<_> = data
        .runtime
        .store()
        .list()
        .await
        .iter()
        .map(|w| {
            serde_json::json!({
                "id": w.id,
                "name": w.name,
                "description": w.description,
                "isActive": w.is_active,
                "nodes": w.nodes.len(),
                "edges": w.edges.len(),
                "updatedAt": wfcore::iso_millis::format(&w.updated_at),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(workflow_list))
}

/// Create a new workflow
#[post("/api/workflows")]
async fn create_workflow(
    data: web::Data<AppState>,
    draft: web::Json<WorkflowDraft>,
) -> ActixResult<impl Responder> {
    let id = data.runtime.store().create(draft.into_inner()).await;

    Ok(HttpResponse::Created().json(WorkflowResponse {
        id,
        message: "Workflow created successfully".to_string(),
    }))
}

/// Get a specific workflow
#[get("/api/workflows/{id}")]
async fn get_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    match data.runtime.store().get(&workflow_id).await {
        Some(workflow) => Ok(HttpResponse::Ok().json(workflow)),
        None => Ok(not_found(&workflow_id)),
    }
}

/// Delete a workflow
#[delete("/api/workflows/{id}")]
async fn delete_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    match data.runtime.store().delete(&workflow_id).await {
        Some(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Workflow deleted successfully"
        }))),
        None => Ok(not_found(&workflow_id)),
    }
}

/// Flip a workflow between active and inactive
#[post("/api/workflows/{id}/toggle")]
async fn toggle_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    match data.runtime.store().toggle_active(&workflow_id).await {
        Ok(is_active) => {
            info!("Workflow {} active: {}", workflow_id, is_active);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "id": workflow_id,
                "isActive": is_active,
            })))
        }
        Err(_) => Ok(not_found(&workflow_id)),
    }
}

/// Execute a workflow and return the full result with its log
#[post("/api/workflows/{id}/execute")]
async fn execute_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
    req: Option<web::Json<ExecuteRequest>>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();
    let request = req.map(|r| r.into_inner()).unwrap_or_default();

    info!("Executing workflow: {}", workflow_id);

    let options = RunOptions::default().with_context(ExecutionContext::from(request.context));

    match data.runtime.execute_workflow(&workflow_id, options).await {
        Ok(result) => {
            info!(
                "Workflow {} finished {:?}: {}/{} nodes",
                workflow_id, result.status, result.executed_nodes, result.total_nodes
            );
            Ok(HttpResponse::Ok().json(result))
        }
        Err(FlowError::Workflow(WorkflowError::NotFound(_))) => Ok(not_found(&workflow_id)),
        Err(e) => {
            error!("Workflow {} execution failed: {}", workflow_id, e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            }))
        }
    }
}

/// Static graph checks for a stored workflow
#[get("/api/workflows/{id}/validate")]
async fn validate_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    match data.runtime.store().get(&workflow_id).await {
        Some(workflow) => Ok(HttpResponse::Ok().json(analyze(&workflow))),
        None => Ok(not_found(&workflow_id)),
    }
}

/// Download a workflow in the export format
#[get("/api/workflows/{id}/export")]
async fn export_stored_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    let Some(workflow) = data.runtime.store().get(&workflow_id).await else {
        return Ok(not_found(&workflow_id));
    };

    let body = export_workflow(&workflow).map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", export_file_name(&workflow)),
        ))
        .body(body))
}

/// Import an exported workflow document
#[post("/api/workflows/import")]
async fn import_stored_workflow(
    data: web::Data<AppState>,
    body: String,
) -> ActixResult<impl Responder> {
    let Some(workflow) = import_workflow(&body) else {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid workflow file".to_string(),
        }));
    };

    let id = workflow.id.clone();
    info!("Importing workflow: {} ({})", workflow.name, id);
    if data.runtime.store().insert(workflow).await.is_some() {
        warn!("Import replaced existing workflow {}", id);
    }

    Ok(HttpResponse::Created().json(WorkflowResponse {
        id,
        message: "Workflow imported successfully".to_string(),
    }))
}

/// List built-in templates
#[get("/api/templates")]
async fn list_templates() -> impl Responder {
    HttpResponse::Ok().json(workflow_templates())
}

/// Create a workflow from a built-in template
#[post("/api/templates/{index}")]
async fn instantiate_template(
    data: web::Data<AppState>,
    path: web::Path<usize>,
) -> ActixResult<impl Responder> {
    let index = path.into_inner();

    let Some(draft) = workflow_templates().into_iter().nth(index) else {
        return Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Template {} not found", index),
        }));
    };

    let id = data.runtime.store().create(draft).await;

    Ok(HttpResponse::Created().json(WorkflowResponse {
        id,
        message: "Workflow created from template".to_string(),
    }))
}

/// WebSocket endpoint for real-time events
#[get("/api/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    let mut events = data.runtime.subscribe_events();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            debug!("Forwarding event for execution {}", event.execution_id());
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                            warn!("WebSocket client lagged, dropped {} events", missed);
                        }
                        Err(_) => break,
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

/// List available node types
#[get("/api/nodes")]
async fn list_node_types(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let registry = data.runtime.registry();

    let nodes: Vec<_> = registry
        .list_node_types()
        .into_iter()
        .map(|node_type| {
            serde_json::json!({
                "type": node_type,
                "description": registry.description(node_type).unwrap_or_default(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(nodes))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 Starting workflow server");

    let config = RuntimeConfig::from_env();
    let registry = wfnodes::standard_registry(&config);
    let runtime = WorkflowRuntime::with_registry(Arc::new(registry), config);

    info!("✅ Runtime initialized with standard nodes");

    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
    });

    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("🌐 Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(list_workflows)
            .service(create_workflow)
            .service(import_stored_workflow)
            .service(get_workflow)
            .service(delete_workflow)
            .service(toggle_workflow)
            .service(execute_workflow)
            .service(validate_workflow)
            .service(export_stored_workflow)
            .service(list_templates)
            .service(instantiate_template)
            .service(websocket_events)
            .service(list_node_types)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
