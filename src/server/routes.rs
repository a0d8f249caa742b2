// src/server/routes.rs

pub mod health {
    use rocket::{get, serde::json::Json};
    use serde_json::{json, Value};

    #[get("/health")]
    pub async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": "contact-scout-api"
        }))
    }

    #[get("/")]
    pub async fn index() -> Json<Value> {
        Json(json!({
            "name": "Contact Scout API",
            "version": "0.1.0",
            "description": "Search-driven business contact discovery",
            "endpoints": {
                "health": "/api/health",
                "search": "/api/search",
                "history": "/api/history"
            }
        }))
    }
}
