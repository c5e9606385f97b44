pub mod chatdb;
pub mod db;
pub mod orderdb;
pub mod userdb;
