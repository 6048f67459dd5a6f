pub mod box_shape;
pub mod ray;
