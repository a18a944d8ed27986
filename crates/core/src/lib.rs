//! Object proximity estimation: detect objects in frames, estimate their
//! distance from the camera, classify them as safe or too close, throttle
//! audible alerts, and stream or return annotated results.

pub mod alerting;
pub mod annotation;
pub mod detection;
pub mod pipeline;
pub mod proximity;
pub mod shared;
pub mod video;
