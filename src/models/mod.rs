pub mod admin_user;
pub mod car;
pub mod enquiry;
pub mod pre_approval;

pub use admin_user::*;
pub use car::*;
pub use enquiry::*;
pub use pre_approval::*;
