//! Endpoint registry
//!
//! Single source of truth mapping logical resource names to URL paths.
//! Paths are relative to the configured API base URL.
//!
//! Literal resources are plain `&str` constants. Parameterized resources are
//! pure path builders taking the record id. No validation is performed on
//! ids: an empty id produces a path with an empty trailing segment.
//!
//! # Example
//!
//! ```rust
//! use vtel_common::endpoints;
//!
//! assert_eq!(endpoints::CONTACTS, "/contacts");
//! assert_eq!(endpoints::invoice_by_id(42), "/invoices/42");
//! assert_eq!(endpoints::resolve("invoice", Some("42")).as_deref(), Some("/invoices/42"));
//! ```

use std::fmt::Display;

// ============================================================================
// Literal endpoints
// ============================================================================

pub const USER_DETAILS: &str = "/user/details";
pub const USER_STATUS: &str = "/user/status";
pub const INVOICES: &str = "/invoices";
pub const CREDITS: &str = "/credits";
pub const CONTACTS: &str = "/contacts";
pub const CONTACT_LISTS: &str = "/contact-lists";
pub const CALL_LOGS: &str = "/call-logs";
pub const BRANCHES: &str = "/branches";
pub const VIRTUAL_NUMBERS: &str = "/virtual-numbers";
pub const PLANS: &str = "/plans";
pub const REPORTS: &str = "/reports";
pub const SETTINGS: &str = "/settings";
pub const DASHBOARD: &str = "/dashboard";
pub const IVR_FLOWS: &str = "/ivr-flows";
pub const CAMPAIGNS: &str = "/campaigns";

// ============================================================================
// Parameterized endpoints
// ============================================================================

/// Billing record for a business account
pub fn billing_by_business(business_id: impl Display) -> String {
    format!("/billing/business/{}", business_id)
}

pub fn invoice_by_id(id: impl Display) -> String {
    format!("{}/{}", INVOICES, id)
}

pub fn contact_by_id(id: impl Display) -> String {
    format!("{}/{}", CONTACTS, id)
}

/// Single contact list with its members
pub fn contact_list_by_id(id: impl Display) -> String {
    format!("{}/{}", CONTACT_LISTS, id)
}

pub fn call_log_by_id(id: impl Display) -> String {
    format!("{}/{}", CALL_LOGS, id)
}

/// Branch (agent) record
pub fn branch_by_id(id: impl Display) -> String {
    format!("{}/{}", BRANCHES, id)
}

pub fn ivr_flow_by_id(id: impl Display) -> String {
    format!("{}/{}", IVR_FLOWS, id)
}

pub fn campaign_by_id(id: impl Display) -> String {
    format!("{}/{}", CAMPAIGNS, id)
}

// ============================================================================
// Lookup table
// ============================================================================

/// Path of a registry entry: either literal or built from an id
#[derive(Clone, Copy)]
pub enum EndpointPath {
    Static(&'static str),
    ById(fn(&str) -> String),
}

impl std::fmt::Debug for EndpointPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointPath::Static(path) => write!(f, "Static({:?})", path),
            EndpointPath::ById(build) => write!(f, "ById({:?})", build("{id}")),
        }
    }
}

/// Named registry entry
#[derive(Debug, Clone, Copy)]
pub struct EndpointDef {
    /// Logical name (e.g. "contacts", "invoice")
    pub name: &'static str,
    pub path: EndpointPath,
    pub description: &'static str,
}

impl EndpointDef {
    /// Whether the path needs an id to be resolved
    pub fn requires_id(&self) -> bool {
        matches!(self.path, EndpointPath::ById(_))
    }

    /// Path template for display, with `{id}` standing in for the parameter
    pub fn template(&self) -> String {
        match self.path {
            EndpointPath::Static(path) => path.to_string(),
            EndpointPath::ById(build) => build("{id}"),
        }
    }

    /// Resolve to a concrete path
    ///
    /// Literal entries ignore `id`. Parameterized entries return `None`
    /// when no id is supplied.
    pub fn resolve(&self, id: Option<&str>) -> Option<String> {
        match (self.path, id) {
            (EndpointPath::Static(path), _) => Some(path.to_string()),
            (EndpointPath::ById(build), Some(id)) => Some(build(id)),
            (EndpointPath::ById(_), None) => None,
        }
    }
}

const fn fixed(
    name: &'static str,
    path: &'static str,
    description: &'static str,
) -> EndpointDef {
    EndpointDef {
        name,
        path: EndpointPath::Static(path),
        description,
    }
}

const fn by_id(
    name: &'static str,
    build: fn(&str) -> String,
    description: &'static str,
) -> EndpointDef {
    EndpointDef {
        name,
        path: EndpointPath::ById(build),
        description,
    }
}

/// All logical endpoints, in display order
pub const ENDPOINTS: &[EndpointDef] = &[
    fixed("user-details", USER_DETAILS, "Logged-in user profile"),
    fixed("user-status", USER_STATUS, "Account status and plan state"),
    by_id("billing", |id| billing_by_business(id), "Billing record for a business"),
    fixed("invoices", INVOICES, "Invoice history"),
    by_id("invoice", |id| invoice_by_id(id), "Single invoice"),
    fixed("credits", CREDITS, "Credit balance and top-ups"),
    fixed("contacts", CONTACTS, "Contacts"),
    by_id("contact", |id| contact_by_id(id), "Single contact"),
    fixed("contact-lists", CONTACT_LISTS, "Contact lists"),
    by_id("contact-list", |id| contact_list_by_id(id), "Single contact list"),
    fixed("call-logs", CALL_LOGS, "Call detail records"),
    by_id("call-log", |id| call_log_by_id(id), "Single call record"),
    fixed("branches", BRANCHES, "Branches (agents)"),
    by_id("branch", |id| branch_by_id(id), "Single branch"),
    fixed("virtual-numbers", VIRTUAL_NUMBERS, "Virtual phone numbers"),
    fixed("plans", PLANS, "Subscription plans"),
    fixed("reports", REPORTS, "Reporting views"),
    fixed("settings", SETTINGS, "Account settings"),
    fixed("dashboard", DASHBOARD, "Dashboard summary"),
    fixed("ivr-flows", IVR_FLOWS, "IVR flow configurations"),
    by_id("ivr-flow", |id| ivr_flow_by_id(id), "Single IVR flow"),
    fixed("campaigns", CAMPAIGNS, "Audio campaigns"),
    by_id("campaign", |id| campaign_by_id(id), "Single audio campaign"),
];

/// Look up a registry entry by logical name
pub fn find(name: &str) -> Option<&'static EndpointDef> {
    ENDPOINTS.iter().find(|def| def.name == name)
}

/// Resolve a logical name (and optional id) to a concrete path
pub fn resolve(name: &str, id: Option<&str>) -> Option<String> {
    find(name).and_then(|def| def.resolve(id))
}
