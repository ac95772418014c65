//! Builtin alias and software tables, plus TOML overrides
//!
//! The alias table maps each canonical field to the header spellings seen
//! in the wild, most canonical spelling first (the alias resolver is
//! order-stable). The software table maps the short numeric column codes
//! and the long free-text headers onto canonical software names.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Canonical field identifiers used throughout the pipeline.
pub mod fields {
    pub const NAME: &str = "name";
    pub const PHONE: &str = "phone";
    pub const EMAIL: &str = "email";
    pub const DATE_OF_BIRTH: &str = "date_of_birth";
    pub const ADDRESS: &str = "address";
    pub const ENROLLMENT_DATE: &str = "enrollment_date";
    pub const STATUS: &str = "status";

    pub const FIRST_SOFTWARE: &str = "first_software";
    pub const FIRST_BATCH_START: &str = "first_batch_start";
    pub const FIRST_BATCH_END: &str = "first_batch_end";
    pub const FIRST_FACULTY: &str = "first_faculty";
    pub const FIRST_SCHEDULE: &str = "first_schedule";
    pub const SECOND_SOFTWARE: &str = "second_software";
    pub const SECOND_BATCH_START: &str = "second_batch_start";
    pub const SECOND_BATCH_END: &str = "second_batch_end";
    pub const SECOND_FACULTY: &str = "second_faculty";
    pub const SECOND_SCHEDULE: &str = "second_schedule";

    pub const TOTAL_FEE: &str = "total_fee";
    pub const AMOUNT_PAID: &str = "amount_paid";
    pub const BALANCE_DUE: &str = "balance_due";
    pub const EMERGENCY_CONTACT: &str = "emergency_contact";
    pub const GUARDIAN_NAME: &str = "guardian_name";
    pub const LEAD_SOURCE: &str = "lead_source";
    pub const REMARKS: &str = "remarks";
    pub const FINISHED_BATCHES: &str = "finished_batches";
    pub const CURRENT_BATCHES: &str = "current_batches";
    pub const PENDING_BATCHES: &str = "pending_batches";
}

/// One software column: the header as it appears in source files (short
/// numeric code or long name) and the canonical software name it maps to.
#[derive(Debug, Clone, Deserialize)]
pub struct SoftwareColumn {
    pub column: String,
    pub name: String,
}

/// The static lookup tables consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct Tables {
    aliases: HashMap<String, Vec<String>>,
    software_columns: Vec<SoftwareColumn>,
}

#[derive(Debug, Deserialize)]
struct TablesFile {
    #[serde(default)]
    fields: HashMap<String, Vec<String>>,
    #[serde(default)]
    software: Vec<SoftwareColumn>,
}

impl Tables {
    /// Ordered alias list for a canonical field. Unknown fields resolve to
    /// an empty list rather than failing.
    pub fn aliases(&self, field: &str) -> &[String] {
        self.aliases.get(field).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Software columns in processing order.
    pub fn software_columns(&self) -> &[SoftwareColumn] {
        &self.software_columns
    }

    /// Merge a TOML override document on top of these tables. A `[fields]`
    /// key replaces that field's alias list; a `[[software]]` entry with a
    /// known column replaces its mapping, unknown columns are appended.
    pub fn apply_overrides(&mut self, toml_text: &str) -> Result<()> {
        let file: TablesFile =
            toml::from_str(toml_text).context("Failed to parse tables TOML")?;
        for (field, aliases) in file.fields {
            self.aliases.insert(field, aliases);
        }
        for entry in file.software {
            match self
                .software_columns
                .iter_mut()
                .find(|c| c.column == entry.column)
            {
                Some(existing) => existing.name = entry.name,
                None => self.software_columns.push(entry),
            }
        }
        Ok(())
    }

    /// The tables shipped with the binary.
    pub fn builtin() -> Self {
        let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
        let mut add = |field: &str, spellings: &[&str]| {
            aliases.insert(
                field.to_string(),
                spellings.iter().map(|s| s.to_string()).collect(),
            );
        };

        add(fields::NAME, &[
            "Name", "NAME", "Student Name", "StudentName", "studentName",
            "Full Name", "FULL NAME", "Candidate Name",
        ]);
        add(fields::PHONE, &[
            "Phone", "phone", "PHONE", "Phone Number", "phoneNumber",
            "PhoneNumber", "NUMBER", "Number", "Mobile", "Mobile Number",
            "Contact", "Contact Number", "Contact No", "WhatsApp Number",
        ]);
        add(fields::EMAIL, &[
            "Email", "EMAIL", "E-mail", "Email ID", "Email Id", "emailId",
            "Mail ID", "Student Email",
        ]);
        add(fields::DATE_OF_BIRTH, &[
            "DOB", "dob", "D.O.B", "D.O.B.", "Date of Birth", "DateOfBirth",
            "Birth Date",
        ]);
        add(fields::ADDRESS, &[
            "Address", "ADDRESS", "address", "Full Address",
            "Residential Address",
        ]);
        add(fields::ENROLLMENT_DATE, &[
            "Enrollment Date", "EnrollmentDate", "Admission Date",
            "ADMISSION DATE", "Date of Admission", "DOA", "Joining Date",
            "Date of Joining",
        ]);
        add(fields::STATUS, &[
            "Status", "STATUS", "Student Status", "Enrollment Status",
        ]);

        add(fields::FIRST_SOFTWARE, &[
            "1st Software", "1ST SOFTWARE", "1st software", "First Software",
            "Software 1",
        ]);
        add(fields::FIRST_BATCH_START, &[
            "1st Batch Start Date", "1st Batch Start", "1st Start Date",
            "Batch 1 Start",
        ]);
        add(fields::FIRST_BATCH_END, &[
            "1st Batch End Date", "1st Batch End", "1st End Date",
            "Batch 1 End",
        ]);
        add(fields::FIRST_FACULTY, &[
            "1st Faculty", "1st Faculty Name", "Faculty 1", "Faculty Name 1",
        ]);
        add(fields::FIRST_SCHEDULE, &[
            "1st Schedule", "1st Batch Time", "1st Timing", "Schedule 1",
        ]);
        add(fields::SECOND_SOFTWARE, &[
            "2nd Software", "2ND SOFTWARE", "2nd software", "Second Software",
            "Software 2",
        ]);
        add(fields::SECOND_BATCH_START, &[
            "2nd Batch Start Date", "2nd Batch Start", "2nd Start Date",
            "Batch 2 Start",
        ]);
        add(fields::SECOND_BATCH_END, &[
            "2nd Batch End Date", "2nd Batch End", "2nd End Date",
            "Batch 2 End",
        ]);
        add(fields::SECOND_FACULTY, &[
            "2nd Faculty", "2nd Faculty Name", "Faculty 2", "Faculty Name 2",
        ]);
        add(fields::SECOND_SCHEDULE, &[
            "2nd Schedule", "2nd Batch Time", "2nd Timing", "Schedule 2",
        ]);

        add(fields::TOTAL_FEE, &[
            "Total Fee", "Total Fees", "TOTAL FEES", "Fees", "Package",
        ]);
        add(fields::AMOUNT_PAID, &[
            "Amount Paid", "Paid", "Fees Paid", "Received",
        ]);
        add(fields::BALANCE_DUE, &[
            "Balance", "Balance Due", "Due", "Pending Amount",
        ]);
        add(fields::EMERGENCY_CONTACT, &[
            "Emergency Contact", "Emergency Number", "Parent Contact",
            "Guardian Number",
        ]);
        add(fields::GUARDIAN_NAME, &[
            "Guardian Name", "Parent Name", "Father Name", "Father's Name",
        ]);
        add(fields::LEAD_SOURCE, &[
            "Lead Source", "Source", "Reference", "Referred By",
            "Enquiry Source",
        ]);
        add(fields::REMARKS, &[
            "Remarks", "REMARKS", "Notes", "Comment", "Comments",
        ]);
        add(fields::FINISHED_BATCHES, &[
            "Finished Batches", "Completed Batches", "Finished Batch",
        ]);
        add(fields::CURRENT_BATCHES, &[
            "Current Batches", "Running Batches", "Current Batch",
        ]);
        add(fields::PENDING_BATCHES, &[
            "Pending Batches", "Pending Batch", "Remaining Batches",
        ]);

        let software_columns = [
            ("1", "Photoshop"),
            ("2", "CorelDRAW"),
            ("3", "InDesign"),
            ("4", "Premiere Pro"),
            ("5", "After Effects"),
            ("6", "Lightroom"),
            ("7", "Illustrator"),
            ("8", "Figma"),
            ("9", "Blender"),
            ("10", "Maya"),
            ("11", "3ds Max"),
            ("12", "AutoCAD"),
            ("Adobe Photoshop", "Photoshop"),
            ("Adobe Illustrator", "Illustrator"),
            ("Adobe InDesign", "InDesign"),
            ("Corel Draw", "CorelDRAW"),
            ("Premiere", "Premiere Pro"),
            ("AfterEffects", "After Effects"),
            ("3DS Max", "3ds Max"),
            ("Auto CAD", "AutoCAD"),
        ]
        .into_iter()
        .map(|(column, name)| SoftwareColumn {
            column: column.to_string(),
            name: name.to_string(),
        })
        .collect();

        Tables {
            aliases,
            software_columns,
        }
    }
}
