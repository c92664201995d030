pub mod audit_logs;
pub mod bookings;
pub mod feedbacks;
pub mod notifications;
pub mod trip_requests;
pub mod trips;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use bookings::Entity as Bookings;
pub use feedbacks::Entity as Feedbacks;
pub use notifications::Entity as Notifications;
pub use trip_requests::Entity as TripRequests;
pub use trips::Entity as Trips;
pub use users::Entity as Users;
