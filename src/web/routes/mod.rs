pub mod contact_routes;
pub mod user_routes;
