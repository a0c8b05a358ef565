//! Declarative descriptions of the problem types this service grades.
//!
//! Front ends use these records to render submission forms and to decide who may
//! see or edit each field. Nothing in the grading engine reads them.

use serde::Serialize;

use crate::sandbox::ExecutionMode;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Edit,
    View,
    Nothing,
}

use Access::{Edit, Nothing, View};

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ProblemType {
    pub name: &'static str,
    pub tag: ExecutionMode,
    pub field_list: &'static [ProblemField],
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ProblemField {
    pub name: &'static str,
    pub prompt: &'static str,
    pub title: &'static str,
    #[serde(rename = "Type")]
    pub kind: &'static str,
    pub list: bool,
    pub default: &'static str,
    pub creator: Access,
    pub student: Access,
    pub grader: Access,
    pub result: Access,
}

/// Access for (creator, student, grader, result)
type Roles = (Access, Access, Access, Access);

const fn field(
    name: &'static str,
    prompt: &'static str,
    title: &'static str,
    kind: &'static str,
    roles: Roles,
) -> ProblemField {
    ProblemField {
        name,
        prompt,
        title,
        kind,
        list: false,
        default: "",
        creator: roles.0,
        student: roles.1,
        grader: roles.2,
        result: roles.3,
    }
}

const fn list_field(
    name: &'static str,
    prompt: &'static str,
    title: &'static str,
    kind: &'static str,
    roles: Roles,
) -> ProblemField {
    ProblemField {
        list: true,
        ..field(name, prompt, title, kind, roles)
    }
}

const fn int_field(name: &'static str, title: &'static str, default: &'static str) -> ProblemField {
    ProblemField {
        default,
        ..field(name, title, title, "int", (Edit, View, View, View))
    }
}

const PASSED: ProblemField = field(
    "Passed",
    "Did the solution pass?",
    "Did the solution pass?",
    "bool",
    (Nothing, View, Edit, View),
);
const REPORT: ProblemField = field(
    "Report",
    "Grader report",
    "Grader report",
    "text",
    (Nothing, View, Edit, View),
);
const DESCRIPTION: ProblemField = field(
    "Description",
    "Enter the problem description here",
    "Problem description",
    "markdown",
    (Edit, View, Nothing, View),
);
const REFERENCE: ProblemField = field(
    "Reference",
    "Enter the reference solution here",
    "Reference solution",
    "python",
    (Edit, Nothing, View, Nothing),
);
const CANDIDATE: ProblemField = field(
    "Candidate",
    "Enter your solution here",
    "Student solution",
    "python",
    (Nothing, Edit, View, View),
);
const OUTPUT: ProblemField = list_field(
    "Output",
    "Expected output",
    "This is the output produced by the reference solution",
    "text",
    (Nothing, View, Nothing, View),
);
const MAX_SECONDS: ProblemField = int_field("MaxSeconds", "Max time permitted in seconds", "2");
const MAX_MB: ProblemField = int_field("MaxMB", "Max memory permitted in megabytes", "32");

pub static STDIN_FEED: ProblemType = ProblemType {
    name: "Stdin Feed",
    tag: ExecutionMode::StdinFeed,
    field_list: &[
        PASSED,
        REPORT,
        DESCRIPTION,
        REFERENCE,
        CANDIDATE,
        list_field(
            "Tests",
            "Test cases",
            "This data will be given to you via Stdin",
            "text",
            (Edit, View, View, View),
        ),
        OUTPUT,
        list_field(
            "HiddenTests",
            "Hidden test cases",
            "This data will also be given to you via Stdin",
            "text",
            (Edit, Nothing, View, Nothing),
        ),
        MAX_SECONDS,
        MAX_MB,
    ],
};

pub static MODULE_DRIVER: ProblemType = ProblemType {
    name: "Module Driver",
    tag: ExecutionMode::ModuleDriver,
    field_list: &[
        PASSED,
        REPORT,
        DESCRIPTION,
        REFERENCE,
        CANDIDATE,
        list_field(
            "Tests",
            "Test drivers",
            "This code will run and will access your code as the 'Candidate' module",
            "python",
            (Edit, View, View, View),
        ),
        OUTPUT,
        list_field(
            "HiddenTests",
            "Hidden test drivers",
            "This code will also run and access your code as the 'Candidate' module",
            "python",
            (Edit, Nothing, View, Nothing),
        ),
        MAX_SECONDS,
        MAX_MB,
    ],
};

/// Every problem type, in listing order
pub fn all() -> [&'static ProblemType; 2] {
    [&STDIN_FEED, &MODULE_DRIVER]
}

pub fn describe(mode: ExecutionMode) -> &'static ProblemType {
    match mode {
        ExecutionMode::StdinFeed => &STDIN_FEED,
        ExecutionMode::ModuleDriver => &MODULE_DRIVER,
    }
}
