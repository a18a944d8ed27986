pub mod alert_gate;
pub mod announcer;
