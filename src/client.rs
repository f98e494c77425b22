// Comarch loyalty SOAP client
//
// Usage:
//     let client = ComarchClient::connect(ClientConfig::new("user", "pass", "https://host/ws"))?;
//     let balance = client.get_balance("000000000").await?;
//
// The client owns its HTTP connection pool; dropping it (or calling `close`)
// releases the pool. Calls share no mutable state, so one client can serve
// any number of concurrent requests.
use crate::config::ClientConfig;
use crate::customer::Customer;
use crate::envelope::{encode_request, prettify_xml, redact_credentials};
use crate::error::ApiError;
use crate::operations::*;
use crate::transport::{HttpTransport, SoapRequest, Transport};
use crate::xml_response::{decode_response, XmlValue};
use rust_decimal::Decimal;
use std::time::Instant;
use tracing::{debug, enabled, trace, warn, Level};

pub struct ComarchClient<T: Transport = HttpTransport> {
    config: ClientConfig,
    transport: T,
}

impl ComarchClient<HttpTransport> {
    // Open a session with a fresh connection pool
    pub fn connect(config: ClientConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        debug!(uri = %config.uri, username = %config.username, "Comarch client session opened");
        Ok(Self { config, transport })
    }
}

impl<T: Transport> ComarchClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // End the session. Equivalent to dropping the client.
    pub fn close(self) {
        debug!(uri = %self.config.uri, "Comarch client session closed");
    }

    // One request/response round trip for any operation
    pub async fn call<O: SoapOperation>(&self, operation: &O) -> Result<XmlValue, ApiError> {
        let method = O::METHOD;
        let request_id = format!("{:08x}", rand::random::<u32>());
        let started = Instant::now();

        let body = encode_request(&self.config, operation)?;
        if enabled!(Level::TRACE) {
            trace!(request_id = %request_id, method, request = %pretty_for_log(&body), "Comarch SOAP request");
        }

        let request = SoapRequest {
            uri: self.config.uri.clone(),
            body,
            basic_auth: self
                .config
                .basic_auth
                .then(|| (self.config.username.clone(), self.config.password.clone())),
        };

        let response = match self.transport.post(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    method,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Comarch request failed"
                );
                return Err(e);
            }
        };

        if enabled!(Level::TRACE) {
            trace!(
                request_id = %request_id,
                method,
                status_code = response.status_code,
                response = %pretty_for_log(&response.body),
                "Comarch SOAP response"
            );
        }

        // Status wins over body: a fault served with 500 is still a transport failure
        if !response.is_success() {
            warn!(
                request_id = %request_id,
                method,
                status_code = response.status_code,
                duration_ms = started.elapsed().as_millis() as u64,
                "Comarch returned non-success status"
            );
            return Err(ApiError::HttpStatus {
                status_code: response.status_code,
                body: response.body,
            });
        }

        match decode_response(method, &response.body) {
            Ok(value) => {
                debug!(
                    request_id = %request_id,
                    method,
                    status_code = response.status_code,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Comarch request completed"
                );
                Ok(value)
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    method,
                    status_code = response.status_code,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Comarch response rejected"
                );
                Err(e)
            }
        }
    }

    // Points balance of a loyalty card
    pub async fn get_balance(&self, card_number: &str) -> Result<XmlValue, ApiError> {
        self.call(&GetBalance {
            card_number: card_number.to_string(),
        })
        .await
    }

    pub async fn get_customer(&self, card_number: &str) -> Result<XmlValue, ApiError> {
        self.call(&GetCustomer {
            card_number: card_number.to_string(),
        })
        .await
    }

    pub async fn get_transactions(&self, filter: impl Into<TransactionFilter>) -> Result<XmlValue, ApiError> {
        self.call(&filter.into()).await
    }

    // Balance plus basic profile data such as name and elite tier
    pub async fn get_account_summary(&self, card_number: &str) -> Result<XmlValue, ApiError> {
        self.call(&GetAccountSummary {
            card_number: card_number.to_string(),
        })
        .await
    }

    // Move everything from the source (donor) card onto the destination card
    pub async fn merge_account(
        &self,
        source_card_number: &str,
        destination_card_number: &str,
    ) -> Result<XmlValue, ApiError> {
        self.call(&MergeAccount {
            source_card_number: source_card_number.to_string(),
            destination_card_number: destination_card_number.to_string(),
        })
        .await
    }

    // `is_complete == false` is a quick enrollment
    pub async fn enroll(&self, customer: Customer, is_complete: bool) -> Result<XmlValue, ApiError> {
        self.call(&Enroll { customer, is_complete }).await
    }

    pub async fn non_airline_accrual(
        &self,
        card_number: &str,
        products: Vec<Product>,
        value: Decimal,
    ) -> Result<XmlValue, ApiError> {
        self.call(&NonAirlineAccrual {
            card_number: card_number.to_string(),
            products,
            value,
        })
        .await
    }

    pub async fn reverse_non_airline_accrual(
        &self,
        card_number: &str,
        products: Vec<Product>,
        value: Decimal,
    ) -> Result<XmlValue, ApiError> {
        self.call(&ReverseNonAirlineAccrual {
            card_number: card_number.to_string(),
            products,
            value,
        })
        .await
    }
}

fn pretty_for_log(xml: &str) -> String {
    let redacted = redact_credentials(xml);
    prettify_xml(&redacted).unwrap_or(redacted)
}
