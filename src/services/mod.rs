pub mod admin_service;
pub mod advice_service;
pub mod client_service;
pub mod crm_import_service;
pub mod dashboard_service;
pub mod document_service;
pub mod document_store;
pub mod existing_product_view;
pub mod fund_matching;
pub mod gemelnet_import_service;
pub mod justification_service;
pub mod note_service;
pub mod packet_service;
pub mod pdf_service;
pub mod report_service;
pub mod signature_image;
pub mod signing_service;
pub mod snapshot_service;
