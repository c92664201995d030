pub mod admin_service;
pub mod auth_service;
pub mod booking_service;
pub mod feedback_service;
pub mod notification_service;
pub mod trip_request_service;
pub mod trip_service;
pub mod user_service;
