pub mod delivery_route;
pub mod fixes;
pub mod routes;
pub mod session;
pub mod ws;
