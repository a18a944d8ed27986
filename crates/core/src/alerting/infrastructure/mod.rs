pub mod announcer_factory;
pub mod background_announcer;
pub mod command_announcer;
pub mod log_announcer;
