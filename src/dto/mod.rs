pub mod auth;
pub mod bookings;
pub mod feedback;
pub mod notifications;
pub mod trip_requests;
pub mod trips;
