pub mod adapter;
pub mod ui;
