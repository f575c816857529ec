pub mod admin_service;
pub mod auth_service;
pub mod autocomplete;
pub mod coerce;
pub mod enquiry_service;
pub mod inventory_service;
pub mod pdf_export;
pub mod pre_approval_service;

pub use admin_service::AdminService;
pub use auth_service::AuthService;
pub use enquiry_service::EnquiryService;
pub use inventory_service::InventoryService;
pub use pre_approval_service::PreApprovalService;
