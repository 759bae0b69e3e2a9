pub mod autorole_models;
pub mod autorole_service;
pub mod conditions;
pub mod statistics_service;

pub use autorole_models::{AutoroleConfiguration, AutoroleConfirmation, ConfirmationStatus};
pub use autorole_service::{AutoroleError, AutoroleService, AutoroleStore};
pub use conditions::{AutoroleCondition, QualificationContext};
pub use statistics_service::{
    StatisticsError, StatisticsService, StatisticsStore, UserChannelStatistics, UserStatistics,
};
