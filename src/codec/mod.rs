pub mod frame;
pub mod primitive;
pub mod schema;
