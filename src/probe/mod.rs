pub mod http_probe;
pub mod live;
pub mod throttle;
