pub mod app;
pub mod dialog;
pub mod draw;
pub mod edit;
pub mod panes;
