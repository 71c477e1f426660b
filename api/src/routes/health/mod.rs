pub mod health_check_route;
