pub mod fix_projector;
pub mod route_model;
