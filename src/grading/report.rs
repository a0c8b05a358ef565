use std::fmt::Write;

use crate::sandbox::ExecutionResult;

use super::{Role, Visibility};

pub(super) const SEPARATOR: &str = "\n-=-=-=-=-=-=-=-=-\n\n";

/// Header line of one test block
pub(super) fn header(number: usize, visibility: Visibility, passed: bool) -> String {
    let label = match visibility {
        Visibility::Visible => "Test",
        Visibility::Hidden => "Hidden test",
    };
    let status = if passed { "PASSED" } else { "FAILED" };
    format!("{label} #{number}: {status}\n")
}

/// Details following the header, empty for a clean pass
///
/// Hidden tests never disclose program output, only error messages.
pub(super) fn detail(
    visibility: Visibility,
    reference: &ExecutionResult,
    candidate: &ExecutionResult,
) -> String {
    let mut out = String::new();
    let disclose = visibility == Visibility::Visible;

    for (role, result) in [(Role::Reference, reference), (Role::Candidate, candidate)] {
        if result.failed {
            let _ = writeln!(
                out,
                "The {role} solution ended in error: {}",
                result.message
            );
            if disclose {
                push_captured(&mut out, result);
            }
        }
    }

    if !reference.failed && !candidate.failed && reference.stdout != candidate.stdout {
        out.push_str("The output was incorrect.\n");
        if disclose {
            let _ = write!(
                out,
                "\nThe correct output is:\n<<<<\n{}>>>>\n\nYour output was:\n<<<<\n{}>>>>\n",
                reference.stdout_text(),
                candidate.stdout_text()
            );
        }
    }

    out
}

/// What the reference produced for a test, as shown to problem authors
pub(super) fn expected_output(reference: &ExecutionResult) -> String {
    if !reference.failed {
        return reference.stdout_text();
    }
    let mut out = format!(
        "The reference solution ended in error: {}\n",
        reference.message
    );
    push_captured(&mut out, reference);
    out
}

fn push_captured(out: &mut String, result: &ExecutionResult) {
    if !result.stdout.is_empty() {
        let _ = write!(
            out,
            "Standard output before it quit:\n<<<<\n{}>>>>\n\n",
            result.stdout_text()
        );
    }
    if !result.stderr.is_empty() {
        let _ = write!(
            out,
            "Standard error reported:\n<<<<\n{}>>>>\n\n",
            result.stderr_text()
        );
    }
}
