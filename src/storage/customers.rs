//! Customer records
//!
//! `CustomerDraft` is the state of the create/edit form: it owns the tag
//! editor and the validation rules. `CustomerStore` keeps the committed
//! customers and persists them as a JSON array.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use super::error::{StorageError, StorageResult};
use super::types::{same_tag, Customer, CustomerStatus};

const MAX_NAME_LEN: usize = 200;
const MAX_TAG_LEN: usize = 50;

/// Create/edit form for a customer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomerDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub status: CustomerStatus,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Pending text of the tag input box
    #[serde(skip)]
    pub tag_input: String,
}

impl CustomerDraft {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            ..Default::default()
        }
    }

    /// Pre-fill the form from an existing customer
    pub fn from_customer(customer: &Customer) -> Self {
        Self {
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            status: customer.status,
            source: customer.source.clone(),
            notes: customer.notes.clone(),
            tags: customer.tags.clone(),
            assigned_to: customer.assigned_to.clone(),
            tag_input: String::new(),
        }
    }

    /// Commit the tag input box.
    ///
    /// On success the input is cleared. Blank input and tags already on the
    /// draft (compared case-insensitively) are rejected and leave the input
    /// untouched.
    pub fn add_tag(&mut self) -> bool {
        let tag = self.tag_input.clone();
        if self.push_tag(&tag) {
            self.tag_input.clear();
            true
        } else {
            false
        }
    }

    /// Add a tag directly, skipping blanks, over-long tags and duplicates
    pub fn push_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || validate_tag(tag).is_err() {
            return false;
        }
        if self.tags.iter().any(|t| same_tag(t, tag)) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Remove a tag, ignoring case
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        let before = self.tags.len();
        self.tags.retain(|t| !same_tag(t, tag));
        self.tags.len() != before
    }

    /// Check required fields and formats
    pub fn validate(&self) -> StorageResult<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(StorageError::invalid("name", "is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(StorageError::invalid(
                "name",
                format!("exceeds maximum length of {} characters", MAX_NAME_LEN),
            ));
        }

        if self.phone.trim().is_empty() {
            return Err(StorageError::invalid("phone", "is required"));
        }
        if !self
            .phone
            .trim()
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
        {
            return Err(StorageError::invalid(
                "phone",
                "may only contain digits, spaces, '+', '-', '(' and ')'",
            ));
        }

        for tag in &self.tags {
            validate_tag(tag.trim())?;
        }

        if let Some(email) = non_blank(&self.email) {
            if !is_plausible_email(&email) {
                return Err(StorageError::invalid(
                    "email",
                    format!("'{}' is not a valid address", email),
                ));
            }
        }

        Ok(())
    }

    /// Build a new customer from a valid draft
    pub fn into_customer(self) -> StorageResult<Customer> {
        self.validate()?;

        let now = Utc::now();
        let mut customer = Customer {
            id: Uuid::new_v4(),
            name: String::new(),
            email: None,
            phone: String::new(),
            status: CustomerStatus::Prospect,
            source: None,
            notes: None,
            tags: Vec::new(),
            assigned_to: None,
            created_at: now,
            updated_at: now,
        };
        self.write_fields(&mut customer);
        Ok(customer)
    }

    /// Overwrite an existing customer with the draft's fields
    pub fn apply_to(self, customer: &mut Customer) -> StorageResult<()> {
        self.validate()?;
        self.write_fields(customer);
        customer.updated_at = Utc::now();
        Ok(())
    }

    fn write_fields(self, customer: &mut Customer) {
        customer.name = self.name.trim().to_string();
        customer.email = non_blank(&self.email);
        customer.phone = self.phone.trim().to_string();
        customer.status = self.status;
        customer.source = non_blank(&self.source);
        customer.notes = non_blank(&self.notes);
        customer.assigned_to = non_blank(&self.assigned_to);

        let mut tags = CustomerDraft::default();
        for tag in &self.tags {
            tags.push_tag(tag);
        }
        customer.tags = tags.tags;
    }
}

fn validate_tag(tag: &str) -> StorageResult<()> {
    if tag.chars().count() > MAX_TAG_LEN {
        return Err(StorageError::invalid(
            "tag",
            format!("exceeds maximum length of {} characters", MAX_TAG_LEN),
        ));
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// List filters, all optional and combined with AND
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerFilter {
    #[serde(default)]
    pub status: Option<CustomerStatus>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl CustomerFilter {
    pub fn matches(&self, customer: &Customer) -> bool {
        if let Some(status) = self.status {
            if customer.status != status {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !customer.matches_search(search) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !customer.has_tag(tag) {
                return false;
            }
        }
        if let Some(agent) = &self.assigned_to {
            let assigned = customer.assigned_to.as_deref().unwrap_or_default();
            if !assigned.eq_ignore_ascii_case(agent.trim()) {
                return false;
            }
        }
        true
    }
}

/// Committed customers
#[derive(Debug, Clone, Default)]
pub struct CustomerStore {
    customers: Vec<Customer>,
}

impl CustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> StorageResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let customers: Vec<Customer> = serde_json::from_str(&content)?;
        Ok(Self { customers })
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.customers)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    pub fn create(&mut self, draft: CustomerDraft) -> StorageResult<Customer> {
        let customer = draft.into_customer()?;
        self.customers.push(customer.clone());
        Ok(customer)
    }

    pub fn get(&self, id: Uuid) -> StorageResult<&Customer> {
        self.customers
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| StorageError::CustomerNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: Uuid) -> StorageResult<&mut Customer> {
        self.customers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StorageError::CustomerNotFound(id.to_string()))
    }

    pub fn update(&mut self, id: Uuid, draft: CustomerDraft) -> StorageResult<Customer> {
        let customer = self.get_mut(id)?;
        draft.apply_to(customer)?;
        Ok(customer.clone())
    }

    pub fn delete(&mut self, id: Uuid) -> StorageResult<Customer> {
        let idx = self
            .customers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StorageError::CustomerNotFound(id.to_string()))?;
        Ok(self.customers.remove(idx))
    }

    /// Add a tag to a stored customer. Duplicates are a no-op.
    pub fn add_tag(&mut self, id: Uuid, tag: &str) -> StorageResult<Customer> {
        if tag.trim().is_empty() {
            return Err(StorageError::invalid("tag", "cannot be empty"));
        }
        validate_tag(tag.trim())?;
        let customer = self.get_mut(id)?;
        let mut draft = CustomerDraft::from_customer(customer);
        if draft.push_tag(tag) {
            customer.tags = draft.tags;
            customer.updated_at = Utc::now();
        }
        Ok(customer.clone())
    }

    pub fn remove_tag(&mut self, id: Uuid, tag: &str) -> StorageResult<Customer> {
        let customer = self.get_mut(id)?;
        let mut draft = CustomerDraft::from_customer(customer);
        if draft.remove_tag(tag) {
            customer.tags = draft.tags;
            customer.updated_at = Utc::now();
        }
        Ok(customer.clone())
    }

    /// Matching customers, newest first
    pub fn list(&self, filter: &CustomerFilter) -> Vec<Customer> {
        let mut matched: Vec<Customer> = self
            .customers
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }

    /// Customer count per status, every status present
    pub fn count_by_status(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = CustomerStatus::all()
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        for customer in &self.customers {
            *counts.entry(customer.status.to_string()).or_default() += 1;
        }
        counts
    }

    /// Customer count grouped by an arbitrary optional field
    pub fn count_by<F>(&self, key: F) -> BTreeMap<String, usize>
    where
        F: Fn(&Customer) -> Option<&str>,
    {
        let mut counts = BTreeMap::new();
        for customer in &self.customers {
            let label = key(customer).unwrap_or("unassigned").to_string();
            *counts.entry(label).or_default() += 1;
        }
        counts
    }
}
