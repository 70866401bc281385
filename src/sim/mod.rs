pub mod action;
pub mod contact;
pub mod event;
pub mod level;
pub mod step;
pub mod world;
