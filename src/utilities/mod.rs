pub mod bounding_box;
pub mod for_each_ref;
pub mod half_space;
pub mod math_helper;
pub mod memory;
pub mod rigid_transform;
