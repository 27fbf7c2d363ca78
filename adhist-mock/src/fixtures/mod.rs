pub mod scenario;
pub mod synthetic;
