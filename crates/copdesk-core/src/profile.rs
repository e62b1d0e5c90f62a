use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A named collection of profiles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileGroup {
    /// Server-assigned opaque id.
    pub id: String,
    /// Human name.
    pub name: String,
    /// Profiles in this group, keyed by profile id.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// A saved identity/payment/shipping record usable by tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Server-assigned opaque id.
    pub id: String,
    /// Human name.
    pub name: String,
    pub shipping: ShippingAddress,
    pub billing: BillingAddress,
    pub card: PaymentCard,
}

/// Shipping contact and address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub one: String,
    pub two: Option<String>,
    pub zip: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub phone: String,
    pub email: String,
    /// When set, the billing address is used for shipping instead.
    pub same_as_billing: bool,
}

/// Billing contact and address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillingAddress {
    pub name: String,
    pub one: String,
    pub two: Option<String>,
    pub zip: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub phone: String,
    pub email: String,
}

/// Payment card details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCard {
    pub card_name: String,
    pub number: String,
    pub month: String,
    pub year: String,
    pub cvv: String,
}

/// Street-address fields common to shipping and billing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetAddress {
    pub one: String,
    pub two: Option<String>,
    pub zip: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl From<&ShippingAddress> for StreetAddress {
    fn from(a: &ShippingAddress) -> Self {
        Self {
            one: a.one.clone(),
            two: a.two.clone(),
            zip: a.zip.clone(),
            city: a.city.clone(),
            state: a.state.clone(),
            country: a.country.clone(),
        }
    }
}

impl From<&BillingAddress> for StreetAddress {
    fn from(a: &BillingAddress) -> Self {
        Self {
            one: a.one.clone(),
            two: a.two.clone(),
            zip: a.zip.clone(),
            city: a.city.clone(),
            state: a.state.clone(),
            country: a.country.clone(),
        }
    }
}

impl Profile {
    /// Resolves the address a task should ship to.
    ///
    /// Derived, not stored: when `same_as_billing` is set the billing address
    /// wins, otherwise the shipping address is used as-is.
    pub fn effective_shipping_address(&self) -> StreetAddress {
        if self.shipping.same_as_billing {
            StreetAddress::from(&self.billing)
        } else {
            StreetAddress::from(&self.shipping)
        }
    }
}

impl fmt::Display for StreetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = vec![self.one.as_str()];
        if let Some(two) = self.two.as_deref() {
            if !two.is_empty() {
                lines.push(two);
            }
        }
        let tail = format!("{}, {} {}", self.city, self.state, self.zip);
        lines.push(&tail);
        write!(f, "{}", lines.join(" \\ "))
    }
}
