pub mod analytics;
pub mod domain;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod ports;
pub mod service;
pub mod validation;

pub use domain::{
    Activity, ActivityAnalytics, ActivityFilter, ActivityPatch, ActivityResponse, Caller,
    Category, NewActivity, NewUser, RecordedResponse, ResponseType, Role, User, UserCredentials,
};
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryDatabase;
pub use ports::{DatabaseService, PortError, PortResult};
pub use service::ActivityService;
