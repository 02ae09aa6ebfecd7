mod common;
mod db;
mod session;
