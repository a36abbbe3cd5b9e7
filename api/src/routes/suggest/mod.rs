pub mod suggest_request;
pub mod suggest_response;
pub mod suggest_route;
