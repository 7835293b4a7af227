mod user;

pub use user::cmd_create_user;
