//! Customer CSV Import/Export
//!
//! Header-driven import: columns are matched by name (case-insensitive,
//! a few common aliases accepted). Tags are split on `;` or `|`.

use std::io::Read;

use super::IntegrationError;
use crate::storage::{Customer, CustomerDraft, CustomerStatus};

/// Which draft field a CSV column feeds
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Name,
    Email,
    Phone,
    Status,
    Source,
    Notes,
    Tags,
    AssignedTo,
}

impl Field {
    fn from_header(header: &str) -> Option<Self> {
        match header.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "name" | "full_name" | "customer" => Some(Field::Name),
            "email" | "e_mail" => Some(Field::Email),
            "phone" | "mobile" | "whatsapp" | "phone_number" => Some(Field::Phone),
            "status" => Some(Field::Status),
            "source" | "origin" => Some(Field::Source),
            "notes" | "note" | "comments" => Some(Field::Notes),
            "tags" | "labels" => Some(Field::Tags),
            "assigned_to" | "agent" | "owner" => Some(Field::AssignedTo),
            _ => None,
        }
    }
}

/// Result of a CSV import operation
#[derive(Debug, Default)]
pub struct CsvImportResult {
    pub drafts: Vec<CustomerDraft>,
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub errors: Vec<String>,
}

/// CSV reader producing customer drafts
#[derive(Debug, Default)]
pub struct CsvImporter {
    columns: Vec<(usize, Field)>,
}

impl CsvImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map header cells onto draft fields; unknown headers are skipped
    fn detect_columns(&mut self, headers: &csv::StringRecord) {
        self.columns = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| Field::from_header(h).map(|f| (idx, f)))
            .collect();
    }

    /// Parse CSV data into drafts. Rows with an unparsable status are
    /// counted as failures; field validation is left to the store.
    pub fn import<R: Read>(&mut self, reader: R) -> Result<CsvImportResult, IntegrationError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        self.detect_columns(&headers);

        if !self.columns.iter().any(|(_, f)| *f == Field::Name) {
            return Err(IntegrationError::InvalidInput(
                "CSV header must include a 'name' column".to_string(),
            ));
        }

        let mut result = CsvImportResult::default();

        for (row_idx, record) in rdr.records().enumerate() {
            result.rows_processed += 1;
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.rows_failed += 1;
                    result.errors.push(format!("row {}: {}", row_idx + 1, e));
                    continue;
                }
            };

            match self.draft_from_record(&record) {
                Ok(draft) => result.drafts.push(draft),
                Err(e) => {
                    result.rows_failed += 1;
                    result.errors.push(format!("row {}: {}", row_idx + 1, e));
                }
            }
        }

        Ok(result)
    }

    fn draft_from_record(&self, record: &csv::StringRecord) -> Result<CustomerDraft, String> {
        let mut draft = CustomerDraft::default();

        for &(idx, field) in &self.columns {
            let value = record.get(idx).unwrap_or_default();
            if value.is_empty() {
                continue;
            }
            match field {
                Field::Name => draft.name = value.to_string(),
                Field::Email => draft.email = Some(value.to_string()),
                Field::Phone => draft.phone = value.to_string(),
                Field::Status => {
                    draft.status = value
                        .parse::<CustomerStatus>()
                        .map_err(|e| e.to_string())?;
                }
                Field::Source => draft.source = Some(value.to_string()),
                Field::Notes => draft.notes = Some(value.to_string()),
                Field::Tags => {
                    for tag in value.split(|c: char| c == ';' || c == '|') {
                        draft.push_tag(tag);
                    }
                }
                Field::AssignedTo => draft.assigned_to = Some(value.to_string()),
            }
        }

        Ok(draft)
    }
}

/// Render customers as CSV with a header row
pub fn export_customers(customers: &[Customer]) -> Result<String, IntegrationError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "id",
        "name",
        "email",
        "phone",
        "status",
        "source",
        "notes",
        "tags",
        "assigned_to",
        "created_at",
    ])
    .map_err(export_error)?;

    for c in customers {
        wtr.write_record([
            c.id.to_string(),
            c.name.clone(),
            c.email.clone().unwrap_or_default(),
            c.phone.clone(),
            c.status.to_string(),
            c.source.clone().unwrap_or_default(),
            c.notes.clone().unwrap_or_default(),
            c.tags.join(";"),
            c.assigned_to.clone().unwrap_or_default(),
            c.created_at.to_rfc3339(),
        ])
        .map_err(export_error)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| IntegrationError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| IntegrationError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Export failures are server-side
fn export_error(err: csv::Error) -> IntegrationError {
    IntegrationError::Io(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_with_aliases() {
        let data = "Full Name,WhatsApp,E-mail,Status,Tags,Agent\n\
                    Ana Lima,+5511999,ana@example.com,active,vip;lead;VIP,Carlos\n\
                    Bruno,+5511888,,,,\n";

        let result = CsvImporter::new().import(data.as_bytes()).unwrap();
        assert_eq!(result.rows_processed, 2);
        assert_eq!(result.rows_failed, 0);

        let ana = &result.drafts[0];
        assert_eq!(ana.name, "Ana Lima");
        assert_eq!(ana.phone, "+5511999");
        assert_eq!(ana.email.as_deref(), Some("ana@example.com"));
        assert_eq!(ana.status, CustomerStatus::Active);
        assert_eq!(ana.tags, vec!["vip", "lead"]);
        assert_eq!(ana.assigned_to.as_deref(), Some("Carlos"));

        let bruno = &result.drafts[1];
        assert_eq!(bruno.status, CustomerStatus::Prospect);
        assert!(bruno.email.is_none());
    }

    #[test]
    fn test_bad_status_counts_as_failure() {
        let data = "name,phone,status\nAna,1,vip\nBruno,2,inactive\n";
        let result = CsvImporter::new().import(data.as_bytes()).unwrap();
        assert_eq!(result.rows_failed, 1);
        assert_eq!(result.drafts.len(), 1);
        assert!(result.errors[0].starts_with("row 1"));
    }

    #[test]
    fn test_missing_name_column() {
        let data = "phone,email\n1,a@b.c\n";
        assert!(matches!(
            CsvImporter::new().import(data.as_bytes()),
            Err(IntegrationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_export_header_and_rows() {
        let customer = CustomerDraft {
            tags: vec!["vip".to_string(), "lead".to_string()],
            ..CustomerDraft::new("Ana, Lima", "+5511")
        }
        .into_customer()
        .unwrap();

        let csv = export_customers(&[customer]).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("id,name,email,phone,status"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Ana, Lima\""));
        assert!(row.contains("vip;lead"));
    }
}
