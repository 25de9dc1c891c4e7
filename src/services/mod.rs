pub mod calendar_engine;
pub mod free_time;
pub mod interval_store;
pub mod settings_service;
pub mod solver;
