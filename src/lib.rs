pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{AppError, AppResult};
pub use models::event::Event;
pub use models::interval::TimeInterval;
pub use models::priority::Priority;
pub use models::settings::CalendarSettings;
pub use models::tag::Tag;
pub use models::task::Task;
pub use services::calendar_engine::{CalendarEngine, PlacementStrategy};
pub use services::solver::{add_tasks, sort_tasks, BatchOutcome, PlacedTask};
