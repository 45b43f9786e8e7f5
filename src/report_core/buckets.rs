//! Fulfillment-channel bucket definitions
//!
//! Five fixed buckets partition orders by how they were placed and fulfilled.
//! A `None` method set means no restriction on that axis.

/// Method-set filter; `None` = unrestricted
pub type MethodSet = Option<&'static [&'static str]>;

const IN_STORE_PLACED: &[&str] = &["Register", "Phone", "Drive Thru"];
const IN_STORE_FULFILLED: &[&str] = &["Register", "Drive Thru"];
const DIGITAL_PLACED: &[&str] = &["Website", "Mobile", "Call Center"];
const PICKUP_FULFILLED: &[&str] = &["Register", "Drive Thru", "Pickup Window"];
const DELIVERY_FULFILLED: &[&str] = &["Delivery"];
const THIRD_PARTY_PLACED: &[&str] = &["DoorDash", "UberEats", "GrubHub"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceBucket {
    InStore,
    LcPickup,
    LcDelivery,
    ThirdParty,
    All,
}

impl ServiceBucket {
    pub fn key(&self) -> &'static str {
        match self {
            ServiceBucket::InStore => "in_store",
            ServiceBucket::LcPickup => "lc_pickup",
            ServiceBucket::LcDelivery => "lc_delivery",
            ServiceBucket::ThirdParty => "third_party",
            ServiceBucket::All => "all",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceBucket::InStore => "In-Store",
            ServiceBucket::LcPickup => "LC Pickup",
            ServiceBucket::LcDelivery => "LC Delivery",
            ServiceBucket::ThirdParty => "Third Party",
            ServiceBucket::All => "All",
        }
    }

    /// Placed-method filter for sales aggregation
    pub fn placed_methods(&self) -> MethodSet {
        match self {
            ServiceBucket::InStore => Some(IN_STORE_PLACED),
            ServiceBucket::LcPickup => Some(DIGITAL_PLACED),
            ServiceBucket::LcDelivery => Some(DIGITAL_PLACED),
            ServiceBucket::ThirdParty => Some(THIRD_PARTY_PLACED),
            ServiceBucket::All => None,
        }
    }

    /// Fulfilled-method filter for sales aggregation
    pub fn fulfilled_methods(&self) -> MethodSet {
        match self {
            ServiceBucket::InStore => Some(IN_STORE_FULFILLED),
            ServiceBucket::LcPickup => Some(PICKUP_FULFILLED),
            ServiceBucket::LcDelivery => Some(DELIVERY_FULFILLED),
            ServiceBucket::ThirdParty => None,
            ServiceBucket::All => None,
        }
    }

    /// Placed-method filter used when resolving unit prices
    ///
    /// The menu price follows the ordering channel, so pricing keeps the
    /// placed restriction but never the fulfilled one: a website order costs
    /// the same whether it leaves through the register or the pickup window.
    pub fn price_placed_methods(&self) -> MethodSet {
        self.placed_methods()
    }

    /// Fulfilled-method filter used when resolving unit prices (always open)
    pub fn price_fulfilled_methods(&self) -> MethodSet {
        None
    }

    pub fn from_key(s: &str) -> Option<Self> {
        match s {
            "in_store" => Some(ServiceBucket::InStore),
            "lc_pickup" => Some(ServiceBucket::LcPickup),
            "lc_delivery" => Some(ServiceBucket::LcDelivery),
            "third_party" => Some(ServiceBucket::ThirdParty),
            "all" => Some(ServiceBucket::All),
            _ => None,
        }
    }

    /// Unknown keys fall back to the unrestricted bucket
    pub fn from_key_or_default(s: &str) -> Self {
        match Self::from_key(s) {
            Some(bucket) => bucket,
            None => {
                log::warn!("Unknown bucket key '{}', using '{}'", s, ServiceBucket::All.key());
                ServiceBucket::All
            }
        }
    }

    /// Processing order for the fused report
    pub fn all() -> [ServiceBucket; 5] {
        [
            ServiceBucket::InStore,
            ServiceBucket::LcPickup,
            ServiceBucket::LcDelivery,
            ServiceBucket::ThirdParty,
            ServiceBucket::All,
        ]
    }
}
