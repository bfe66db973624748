//! Header/row codec: deterministic mapping from a form submission to a
//! fixed-width row.
//!
//! Each collection declares an ordered column layout. Column 0 is always
//! the wall-clock timestamp; every other column is bound to a named
//! submission field. The transform is one-way — the encoded row is the
//! persisted format.

use chrono::{DateTime, Local};

use crate::form::{Collection, Row, Submission};

/// Timestamp column format, mirroring the site's locale rendering
/// (`DD/MM/YYYY, hh:mm:ss am/pm`).
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %I:%M:%S %p";

/// A collection's column layout: the header row, and the submission
/// field bound to each column after the timestamp.
///
/// Invariant: `headers.len() == fields.len() + 1`.
#[derive(Debug)]
pub struct Layout {
    /// Ordered column names, starting with `Timestamp`.
    pub headers: &'static [&'static str],
    /// Submission field names, parallel to `headers[1..]`.
    pub fields: &'static [&'static str],
}

static TUTOR_LAYOUT: Layout = Layout {
    headers: &[
        "Timestamp",
        "Full Name",
        "Gender",
        "Qualification",
        "Qualification Other",
        "Marital Status",
        "Subjects",
        "Subjects Other",
        "Teaching Standard",
        "Work Preference",
        "Training Program",
        "Eligibility Coaching",
        "Address",
        "Contact Number",
        "Email ID",
    ],
    fields: &[
        "fullName",
        "gender",
        "qualification",
        "qualificationOther",
        "maritalStatus",
        "subjects",
        "subjectsOtherText",
        "teachingStandard",
        "workPreference",
        "trainingProgram",
        "eligibilityCoaching",
        "address",
        "contactNumber",
        "emailId",
    ],
};

static SCHOOL_LAYOUT: Layout = Layout {
    headers: &[
        "Timestamp",
        "School Name",
        "Pattern",
        "Contact Person",
        "Designation",
        "School Address",
        "Email",
        "Contact Number",
        "Teachers Required",
        "Subjects",
        "Subjects Other",
        "Salary Range",
        "Experience Required",
    ],
    fields: &[
        "schoolName",
        "pattern",
        "contactPerson",
        "designation",
        "schoolAddress",
        "partnerEmail",
        "partnerContact",
        "teachersRequired",
        "partnerSubjects",
        "partnerSubjectsOtherText",
        "salaryRange",
        "experienceRequired",
    ],
};

static PARENT_STUDENT_LAYOUT: Layout = Layout {
    headers: &[
        "Timestamp",
        "Parent Name",
        "Student Name",
        "Student Class",
        "School Name",
        "Pattern",
        "Tuition Subjects",
        "Tuition Subjects Other",
        "Tuition Location",
        "Residential Address",
        "Contact Number",
        "Alternate Number",
        "Email ID",
        "Specific Remarks",
    ],
    fields: &[
        "parentName",
        "studentName",
        "studentClass",
        "schoolName",
        "pattern",
        "tuitionSubjects",
        "tuitionSubjectsOtherText",
        "tuitionLocation",
        "residentialAddress",
        "contactNumber",
        "alternateNumber",
        "emailId",
        "specificRemarks",
    ],
};

/// Get the column layout for a collection.
#[must_use]
pub fn layout(collection: Collection) -> &'static Layout {
    match collection {
        Collection::Tutor => &TUTOR_LAYOUT,
        Collection::School => &SCHOOL_LAYOUT,
        Collection::ParentStudent => &PARENT_STUDENT_LAYOUT,
    }
}

/// Build the header row for a collection.
#[must_use]
pub fn header_row(collection: Collection) -> Row {
    layout(collection)
        .headers
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Encode a submission into a row, stamping the current wall-clock time.
#[must_use]
pub fn encode(collection: Collection, submission: &Submission) -> Row {
    encode_at(collection, submission, Local::now())
}

/// Encode a submission into a row with an explicit timestamp.
///
/// Missing fields encode as `""`; list-valued fields join with `", "`.
/// The returned row's width always equals the collection's header width.
#[must_use]
pub fn encode_at(collection: Collection, submission: &Submission, at: DateTime<Local>) -> Row {
    let layout = layout(collection);
    let mut row = Vec::with_capacity(layout.headers.len());
    row.push(at.format(TIMESTAMP_FORMAT).to_string());
    for field in layout.fields {
        row.push(submission.render(field));
    }
    row
}
