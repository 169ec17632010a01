//! Recipient resolver
//!
//! Per-channel recipient tables injected from configuration: a default list
//! plus department-specific additions. Department lookups are
//! case-insensitive and department matches extend the defaults, never
//! replace them.

use std::collections::HashMap;

/// Alert recipient tables. Email addresses and phone numbers are independent.
#[derive(Debug, Clone, Default)]
pub struct RecipientConfig {
    pub email_defaults: Vec<String>,
    /// Keys are lower-cased department names
    pub email_by_department: HashMap<String, Vec<String>>,
    pub whatsapp_defaults: Vec<String>,
    pub whatsapp_by_department: HashMap<String, Vec<String>>,
}

impl RecipientConfig {
    pub fn email_recipients(&self, department: Option<&str>) -> Vec<String> {
        resolve(&self.email_defaults, &self.email_by_department, department)
    }

    pub fn whatsapp_recipients(&self, department: Option<&str>) -> Vec<String> {
        resolve(&self.whatsapp_defaults, &self.whatsapp_by_department, department)
    }
}

fn resolve(
    defaults: &[String],
    by_department: &HashMap<String, Vec<String>>,
    department: Option<&str>,
) -> Vec<String> {
    let mut recipients = defaults.to_vec();

    if let Some(dept) = department {
        if let Some(extra) = by_department.get(&dept.to_lowercase()) {
            recipients.extend(extra.iter().cloned());
        }
    }

    recipients
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RecipientConfig {
        RecipientConfig {
            email_defaults: vec![
                "safety@yourcompany.com".to_string(),
                "supervisor@yourcompany.com".to_string(),
            ],
            email_by_department: HashMap::from([(
                "production".to_string(),
                vec!["production-manager@yourcompany.com".to_string()],
            )]),
            whatsapp_defaults: vec!["+1234567890".to_string()],
            whatsapp_by_department: HashMap::from([(
                "warehouse".to_string(),
                vec!["+1234567894".to_string()],
            )]),
        }
    }

    #[test]
    fn test_department_lookup_is_case_insensitive() {
        let recipients = config().email_recipients(Some("Production"));
        assert_eq!(
            recipients,
            vec![
                "safety@yourcompany.com",
                "supervisor@yourcompany.com",
                "production-manager@yourcompany.com"
            ]
        );
    }

    #[test]
    fn test_unknown_department_yields_defaults_only() {
        let cfg = config();
        assert_eq!(cfg.email_recipients(Some("finance")).len(), 2);
        assert_eq!(cfg.email_recipients(None).len(), 2);
    }

    #[test]
    fn test_channel_tables_are_independent() {
        let cfg = config();
        // Production only has an email override, warehouse only a phone one
        assert_eq!(cfg.whatsapp_recipients(Some("production")), vec!["+1234567890"]);
        assert_eq!(
            cfg.whatsapp_recipients(Some("Warehouse")),
            vec!["+1234567890", "+1234567894"]
        );
    }
}
