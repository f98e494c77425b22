// One parameter struct per SOAP method
//
// Each struct serializes to the content of the `<data>` element of its call.
use crate::customer::{serialize_optional_date, Customer};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

pub trait SoapOperation: Serialize + Send + Sync {
    // SOAP method name as the service spells it
    const METHOD: &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetBalance {
    #[serde(rename = "cardNo")]
    pub card_number: String,
}

impl SoapOperation for GetBalance {
    const METHOD: &'static str = "getBalance";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetCustomer {
    #[serde(rename = "cardNo")]
    pub card_number: String,
}

impl SoapOperation for GetCustomer {
    const METHOD: &'static str = "getCustomer";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetAccountSummary {
    #[serde(rename = "cardNo")]
    pub card_number: String,
}

impl SoapOperation for GetAccountSummary {
    const METHOD: &'static str = "getAccountSummary";
}

// Search criteria for `getTransactions`. Only the card is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionFilter {
    #[serde(rename = "cardNo")]
    pub card_number: String,
    #[serde(
        rename = "dateFrom",
        serialize_with = "serialize_optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_from: Option<NaiveDate>,
    #[serde(
        rename = "dateTo",
        serialize_with = "serialize_optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_to: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn for_card(card_number: impl Into<String>) -> Self {
        Self {
            card_number: card_number.into(),
            date_from: None,
            date_to: None,
        }
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }
}

impl From<&str> for TransactionFilter {
    fn from(card_number: &str) -> Self {
        Self::for_card(card_number)
    }
}

impl SoapOperation for TransactionFilter {
    const METHOD: &'static str = "getTransactions";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeAccount {
    // Donor card, closed by the merge
    #[serde(rename = "sourceCardNo")]
    pub source_card_number: String,
    #[serde(rename = "destinationCardNo")]
    pub destination_card_number: String,
}

impl SoapOperation for MergeAccount {
    const METHOD: &'static str = "mergeAccount";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enroll {
    pub customer: Customer,
    // false means "quick enrollment"
    #[serde(rename = "incompleteData", serialize_with = "serialize_incomplete_flag")]
    pub is_complete: bool,
}

fn serialize_incomplete_flag<S: Serializer>(is_complete: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *is_complete { "N" } else { "Y" })
}

impl SoapOperation for Enroll {
    const METHOD: &'static str = "enroll";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub code: String,
    pub quantity: u32,
}

impl Product {
    pub fn new(code: impl Into<String>, quantity: u32) -> Self {
        Self {
            code: code.into(),
            quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NonAirlineAccrual {
    #[serde(rename = "cardNo")]
    pub card_number: String,
    #[serde(rename = "product")]
    pub products: Vec<Product>,
    // Monetary value of the purchase the points are accrued for
    pub value: Decimal,
}

impl SoapOperation for NonAirlineAccrual {
    const METHOD: &'static str = "nonAirlineAccrual";
}

// Undoes a previous accrual; must mirror the original products and value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReverseNonAirlineAccrual {
    #[serde(rename = "cardNo")]
    pub card_number: String,
    #[serde(rename = "product")]
    pub products: Vec<Product>,
    pub value: Decimal,
}

impl From<NonAirlineAccrual> for ReverseNonAirlineAccrual {
    fn from(accrual: NonAirlineAccrual) -> Self {
        Self {
            card_number: accrual.card_number,
            products: accrual.products,
            value: accrual.value,
        }
    }
}

impl SoapOperation for ReverseNonAirlineAccrual {
    const METHOD: &'static str = "reverseNonAirlineAccrual";
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn to_xml<O: SoapOperation>(op: &O) -> String {
        quick_xml::se::to_string_with_root("data", op).unwrap()
    }

    #[test]
    fn test_transaction_filter_dates() {
        let filter = TransactionFilter::for_card("000000000").between(
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        assert_eq!(
            to_xml(&filter),
            "<data><cardNo>000000000</cardNo><dateFrom>05012024</dateFrom><dateTo>31122024</dateTo></data>"
        );
        assert_eq!(
            to_xml(&TransactionFilter::from("000000000")),
            "<data><cardNo>000000000</cardNo></data>"
        );
    }

    #[test]
    fn test_accrual_products_repeat() {
        let accrual = NonAirlineAccrual {
            card_number: "100200300".to_string(),
            products: vec![Product::new("HOTEL", 2), Product::new("CAR", 1)],
            value: dec!(1250.50),
        };
        assert_eq!(
            to_xml(&accrual),
            "<data><cardNo>100200300</cardNo>\
             <product><code>HOTEL</code><quantity>2</quantity></product>\
             <product><code>CAR</code><quantity>1</quantity></product>\
             <value>1250.50</value></data>"
        );

        let reversal = ReverseNonAirlineAccrual::from(accrual.clone());
        assert_eq!(reversal.value, accrual.value);
        assert_eq!(reversal.products, accrual.products);
    }
}
