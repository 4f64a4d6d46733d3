pub mod config;
pub mod model;

// Inventory ingestion
pub mod inventory;
pub mod netbox;

// Menu hierarchy and navigation
pub mod navigator;
pub mod tree;

// Outbound sessions
pub mod session;

// Startup and the menu/session loop
pub mod controller;
