// Member data sent with `enroll`
//
// Field names follow the Comarch wire format; absent optional fields are left
// out of the request entirely.
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

// Comarch expects dates as ddmmyyyy
pub(crate) const DATE_FORMAT: &str = "%d%m%Y";

pub(crate) fn serialize_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(DATE_FORMAT))
}

pub(crate) fn serialize_optional_date<S: Serializer>(
    date: &Option<NaiveDate>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => serialize_date(date, serializer),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Customer {
    pub login: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "dateOfBirth", serialize_with = "serialize_date")]
    pub birthdate: NaiveDate,
    #[serde(rename = "address")]
    pub addresses: Vec<Address>,
    #[serde(rename = "commPrefs")]
    pub communication_preferences: CommunicationPreferences,
    #[serde(rename = "extAttributes")]
    pub extended_attributes: Vec<ExtendedAttribute>,
    #[serde(rename = "phone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<PhoneData>,
    // Left empty on enroll, the service assigns a card
    #[serde(rename = "cardNumber", skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
}

impl Customer {
    pub fn new(
        login: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        birthdate: NaiveDate,
        communication_preferences: CommunicationPreferences,
    ) -> Self {
        Self {
            login: login.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            birthdate,
            addresses: Vec::new(),
            communication_preferences,
            extended_attributes: Vec::new(),
            phone: None,
            card_number: None,
        }
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn with_attribute(mut self, attribute: ExtendedAttribute) -> Self {
        self.extended_attributes.push(attribute);
        self
    }

    pub fn with_phone(mut self, phone: PhoneData) -> Self {
        self.phone = Some(phone);
        self
    }

    pub fn with_card_number(mut self, card_number: impl Into<String>) -> Self {
        self.card_number = Some(card_number.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum AddressType {
    #[default]
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "B")]
    Business,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Address {
    #[serde(rename = "defaultAddress")]
    pub default_address: bool,
    #[serde(rename = "addressType")]
    pub address_type: AddressType,
    // Street with house and flat numbers
    #[serde(rename = "addressLine1")]
    pub address_line_1: String,
    #[serde(rename = "addressLine2", skip_serializing_if = "Option::is_none")]
    pub address_line_2: Option<String>,
    #[serde(rename = "addressLine3", skip_serializing_if = "Option::is_none")]
    pub address_line_3: Option<String>,
    // ISO 3166-1 alpha-3
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub city: String,
    #[serde(rename = "zipCode")]
    pub zip_code: String,
    // Also used as the member's login
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatementChannel {
    #[serde(rename = "S")]
    Sms,
    #[serde(rename = "E")]
    Email,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunicationPreferences {
    #[serde(rename = "preferredLanguage")]
    pub language: String,
    #[serde(rename = "statementPreference")]
    pub statement: StatementChannel,
    #[serde(rename = "commPermissionCc")]
    pub permission_call_center: bool,
    #[serde(rename = "commPermissionEmail")]
    pub permission_email: bool,
}

// Project specific key/value attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtendedAttribute {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ExtendedAttribute {
    pub fn new(code: impl Into<String>, value: Option<String>) -> Self {
        Self {
            code: code.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhoneType {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "B")]
    Business,
    #[serde(rename = "M")]
    Mobile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneData {
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    #[serde(rename = "phoneType", skip_serializing_if = "Option::is_none")]
    pub phone_type: Option<PhoneType>,
    #[serde(rename = "altPhoneNumber", skip_serializing_if = "Option::is_none")]
    pub alt_phone_number: Option<String>,
    #[serde(rename = "altPhoneType", skip_serializing_if = "Option::is_none")]
    pub alt_phone_type: Option<PhoneType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
}

impl PhoneData {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            phone_type: None,
            alt_phone_number: None,
            alt_phone_type: None,
            fax: None,
        }
    }
}
