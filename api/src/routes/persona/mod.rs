pub mod get_user_route;
