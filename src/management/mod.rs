mod login;

pub use login::LOGIN_TTL;
pub use login::LoginManager;
