pub mod db;
pub mod import;
