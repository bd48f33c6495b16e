pub mod api;
pub mod cli;
pub mod database_ops;
pub mod model;
pub mod text;
pub mod tracing;

pub mod util {
    pub mod db;
    pub mod env;
}
