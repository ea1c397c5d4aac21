pub mod games;
pub mod races;
pub mod schedule;
pub mod worker;

pub use games::{CatalogTickReport, GameCatalogSync};
pub use races::{RaceOutcome, RaceSync, RaceTickReport};
pub use schedule::SyncSchedule;
pub use worker::SourceWorker;
