pub mod pool;
pub mod rls;

pub use pool::create_pool;
pub use rls::{set_current_admin, CURRENT_ADMIN_SETTING};
