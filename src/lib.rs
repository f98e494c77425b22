// Async client for the Comarch loyalty management SOAP API

pub mod client;
pub mod config;
pub mod customer;
pub mod envelope;
pub mod error;
pub mod operations;
pub mod transport;
pub mod xml_response;

// Re-export key types for convenience
pub use client::ComarchClient;
pub use config::ClientConfig;
pub use customer::{
    Address, AddressType, CommunicationPreferences, Customer, ExtendedAttribute, PhoneData, PhoneType,
    StatementChannel,
};
pub use envelope::encode_request;
pub use error::{ApiError, ErrorKind, Fault};
pub use operations::{
    Enroll, GetAccountSummary, GetBalance, GetCustomer, MergeAccount, NonAirlineAccrual, Product,
    ReverseNonAirlineAccrual, SoapOperation, TransactionFilter,
};
pub use transport::{HttpResponse, HttpTransport, SoapRequest, Transport};
pub use xml_response::{decode_response, XmlValue};
