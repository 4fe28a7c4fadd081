//! Shanghai metro information server.
//!
//! A web application over the MetroInfo backend: best routes with
//! transfers, nearby stations, live arrivals, carriage crowding and the
//! line list, served as HTML pages or JSON.

pub mod arrivals;
pub mod backend;
pub mod cache;
pub mod config;
pub mod crowding;
pub mod domain;
pub mod nearby;
pub mod route;
pub mod stations;
pub mod web;
