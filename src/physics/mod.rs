pub mod bodies;
pub mod body_description;
pub mod body_properties;
pub mod collidables;
pub mod collision_detection;
pub mod handles;
pub mod island;
pub mod island_sleeper;
pub mod pose_integration;
pub mod simulation;
pub mod simulation_settings;
pub mod solver;
pub mod trees;
