// Web Interface module root
pub mod gallery;
pub mod routes;
pub mod web_server;

// Re-export commonly used items
pub use gallery::render_gallery;
pub use web_server::WebServer;
