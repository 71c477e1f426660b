pub mod get_response_request;
pub mod get_response_route;
