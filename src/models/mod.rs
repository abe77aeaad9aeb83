mod admin;
mod beneficiary;
mod client;
mod dashboard;
mod document;
mod existing_product;
mod form_instance;
mod market_match;
mod new_product;
mod note;
mod saving_product;
mod signature_request;
mod snapshot;

pub use admin::{ClearCrmDataResult, ClearJustificationDataResult, CrmImportResult, GemelNetImportResult};
pub use beneficiary::{Beneficiary, BeneficiaryInput};
pub use client::{Client, ClientDetail, CreateClient, NewClient, UpdateClient};
pub use dashboard::{
    ClientSummaryItem, FundHistoryPoint, FundHistoryQuery, HistoryPoint, HistoryQuery, MonthQuery,
    MonthlyChangePoint, SummaryResponse,
};
pub use document::{PacketQuery, PacketTrimRequest, PacketTrimResponse, UploadResponse};
pub use existing_product::{CreateExistingProduct, ExistingProduct, UpdateExistingProduct};
pub use form_instance::{CreateFormInstance, FormInstance, DEFAULT_FORM_STATUS};
pub use market_match::{MarketMatchRequest, MarketMatchResponse};
pub use new_product::{CreateNewProduct, NewProduct};
pub use note::{CreateNote, Note, Reminder};
pub use saving_product::SavingProduct;
pub use signature_request::{
    SignRequestResponse, SignatureRequest, SignatureSubmit, SignatureSubmitResponse, STATUS_PENDING,
    STATUS_SIGNED,
};
pub use snapshot::{CreateSnapshot, NewSnapshot, Snapshot};
