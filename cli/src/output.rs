//! Plain-text rendering of query results. Positions are shown one-based.

use std::fmt::Write;

use gmod_types::{Position, QueryOutput, Severity, SourceRange};

fn pos(p: Position) -> String {
    format!("{}:{}", p.row + 1, p.col + 1)
}

fn range(r: SourceRange) -> String {
    format!("{}-{}", pos(r.start), pos(r.end))
}

#[must_use]
pub fn render(output: &QueryOutput) -> String {
    let mut out = String::new();
    match output {
        QueryOutput::Lines(lines) => {
            for line in lines {
                let _ = writeln!(out, "{line}");
            }
        }
        QueryOutput::Browse(symbols) => {
            for symbol in symbols {
                match &symbol.type_signature {
                    Some(sig) => {
                        let _ = write!(out, "{} :: {sig}", symbol.name);
                    }
                    None => out.push_str(&symbol.name),
                }
                if let Some(parent) = &symbol.parent {
                    let _ = write!(out, "  (from {parent})");
                }
                out.push('\n');
            }
        }
        QueryOutput::Type(info) => {
            let _ = writeln!(out, "{} {}", range(info.range), info.type_text);
        }
        QueryOutput::Info(text) => {
            let _ = writeln!(out, "{text}");
        }
        QueryOutput::CaseSplit(edits) => {
            for edit in edits {
                let _ = writeln!(out, "{}\n{}", range(edit.range), edit.replacement);
            }
        }
        QueryOutput::SigFill(fill) => {
            let _ = writeln!(out, "{} {}\n{}", fill.type_text, range(fill.range), fill.body);
        }
        QueryOutput::Messages(messages) => {
            for message in messages {
                let severity = match message.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                    Severity::Lint => "lint",
                };
                let _ = writeln!(
                    out,
                    "{}:{}: {severity}: {}",
                    message.file.display(),
                    pos(message.position),
                    message.message
                );
            }
        }
        QueryOutput::Capabilities(caps) => {
            let _ = writeln!(out, "ghc-mod {}", caps.version);
            let flags = [
                ("file_map", caps.file_map),
                ("quote_args", caps.quote_args),
                ("optparse", caps.optparse),
                ("type_constraints", caps.type_constraints),
                ("browse_parents", caps.browse_parents),
                ("interactive_case_split", caps.interactive_case_split),
                ("imported_from", caps.imported_from),
            ];
            for (name, enabled) in flags {
                let _ = writeln!(out, "  {name}: {enabled}");
            }
        }
    }
    out
}
