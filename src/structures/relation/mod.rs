pub mod table;
pub mod utils;
pub mod io;
pub mod crud;
pub mod aggregate;
pub mod join;
pub mod derive;
pub mod sort;
pub mod display;
pub mod export;
pub mod profile;
