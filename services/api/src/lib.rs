mod cli;
mod infra;
mod routes;
mod server;

pub use cli::run;
