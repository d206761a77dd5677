pub mod clock;
pub mod controller;
pub mod navigation;
pub mod speech;
pub mod timer;
