//! HTTP API - Routes and handlers for the `/api/v1/{server}` surface

pub mod handlers;
pub mod routes;
