pub mod api;
pub mod classifier;
pub mod environment;
pub mod labels;
pub mod logging;
pub mod rss;

pub const TARGET_WEB_REQUEST: &str = "web_request";
