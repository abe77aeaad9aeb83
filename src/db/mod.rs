pub mod beneficiary_queries;
pub mod client_queries;
pub mod existing_product_queries;
pub mod form_instance_queries;
pub mod new_product_queries;
pub mod note_queries;
pub mod saving_product_queries;
pub mod signature_request_queries;
pub mod snapshot_queries;
