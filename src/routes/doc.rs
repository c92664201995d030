use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        bookings::{BookingList, CreateBookingRequest},
        feedback::{CreateFeedbackRequest, FeedbackList},
        notifications::{CreateNotificationRequest, NotificationList, NotificationReceipt},
        trip_requests::{AcceptTripRequestRequest, CreateTripRequestRequest, TripRequestList},
        trips::{CreateTripRequest, TripList, UpdateTripRequest},
    },
    models::{Booking, Feedback, Notification, Trip, TripRequest, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, bookings, feedback, health, notifications, trip_requests, trips, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        users::get_me,
        users::get_user,
        users::upload_my_photo,
        users::serve_user_photo,
        trips::create_trip,
        trips::list_trips,
        trips::my_trips,
        trips::get_trip,
        trips::update_trip,
        trips::delete_trip,
        trips::cancel_trip,
        trips::complete_trip,
        trips::upload_photo,
        trips::serve_photo,
        bookings::create_booking,
        bookings::my_bookings,
        bookings::cancel_booking,
        trip_requests::create_request,
        trip_requests::my_requests,
        trip_requests::unclaimed_requests,
        trip_requests::accept_request,
        trip_requests::reject_request,
        feedback::submit_feedback,
        feedback::trip_feedback,
        notifications::send_notification,
        notifications::list_notifications,
        notifications::mark_read,
        admin::list_users,
        admin::delete_user,
        admin::list_trips,
        admin::list_trip_requests,
        admin::stats
    ),
    components(
        schemas(
            User,
            Trip,
            Booking,
            TripRequest,
            Feedback,
            Notification,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateTripRequest,
            UpdateTripRequest,
            TripList,
            CreateBookingRequest,
            BookingList,
            CreateTripRequestRequest,
            AcceptTripRequestRequest,
            TripRequestList,
            CreateFeedbackRequest,
            FeedbackList,
            CreateNotificationRequest,
            NotificationReceipt,
            NotificationList,
            admin::UserList,
            admin::AdminStats,
            health::HealthData,
            Meta,
            ApiResponse<User>,
            ApiResponse<Trip>,
            ApiResponse<TripList>,
            ApiResponse<Booking>,
            ApiResponse<BookingList>,
            ApiResponse<TripRequest>,
            ApiResponse<TripRequestList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Users", description = "User profile endpoints"),
        (name = "Trips", description = "Trip endpoints"),
        (name = "Bookings", description = "Booking endpoints"),
        (name = "Trip Requests", description = "Trip request and matching endpoints"),
        (name = "Feedback", description = "Trip feedback endpoints"),
        (name = "Notifications", description = "Notification endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
