// crates/shellbridge-server/src/openapi.rs
// ============================================================================
// Module: OpenAPI Generation
// Description: OpenAPI 3.0 document derived from the tool registry.
// Purpose: Publish one POST path per tool with its derived input schema.
// Dependencies: shellbridge-core, serde_json
// ============================================================================

//! ## Overview
//! Generates the `/openapi.json` document from the frozen registry: one
//! `POST /rpc/{tool}` path per registered tool, tagged with the tool's tag
//! group, with the derived input schema as request body and the generic
//! result envelope as response schema. The output is a pure function of the
//! registry and configuration, so identical registries produce identical
//! documents. Generated once at startup and served as a cached value.

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use shellbridge_core::ToolRegistry;

use crate::config::OpenApiConfig;

// ============================================================================
// SECTION: Document Generation
// ============================================================================

/// Builds the OpenAPI 3.0 document for a registry.
#[must_use]
pub fn openapi_document(
    registry: &ToolRegistry,
    config: &OpenApiConfig,
    server_url: &str,
) -> Value {
    let mut paths = Map::new();
    for definition in registry.list() {
        let tag = registry.tag_of(&definition.name).unwrap_or("General").to_string();
        let request_schema = definition.input_schema.to_value();
        paths.insert(
            format!("/rpc/{}", definition.name),
            json!({
                "post": {
                    "operationId": definition.name,
                    "summary": definition.description,
                    "tags": [tag],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": { "schema": request_schema }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "Tool result envelope",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/ResultEnvelope" }
                                }
                            }
                        }
                    }
                }
            }),
        );
    }

    let tags: Vec<Value> = registry
        .list_by_tag()
        .keys()
        .map(|tag| json!({ "name": tag }))
        .collect();

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": config.title,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "servers": [{ "url": server_url }],
        "tags": tags,
        "paths": Value::Object(paths),
        "components": {
            "schemas": {
                "ResultEnvelope": {
                    "type": "object",
                    "properties": {
                        "content": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "type": { "type": "string" },
                                    "text": { "type": "string" },
                                    "data": { "type": "string" },
                                    "mimeType": { "type": "string" }
                                },
                                "required": ["type"]
                            }
                        },
                        "isError": { "type": "boolean" }
                    },
                    "required": ["content", "isError"]
                }
            },
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer" }
            }
        },
        "security": [{ "bearerAuth": [] }]
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
