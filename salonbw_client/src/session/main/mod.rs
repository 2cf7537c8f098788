mod builder;
mod controller;
mod logout;
mod profile;

pub use builder::SessionControllerBuilder;
pub use controller::SessionController;
