mod controller;

pub use controller::Controller;
