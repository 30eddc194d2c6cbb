//! Canonical layout pass for generated Go source.
//!
//! The generator already emits gofmt-shaped text; this pass settles indentation
//! and blank lines so that output is byte-stable, and rejects text whose
//! delimiters do not balance.

use anyhow::Result;

use crate::diagnostics::Diagnostic;

pub fn format(src: &str) -> Result<String> {
    let depths = line_depths(src)?;

    let mut lines: Vec<String> = Vec::new();
    for (line, (depth, opens_with_closer)) in src.lines().zip(depths) {
        let text = line.trim();
        if text.is_empty() {
            lines.push(String::new());
            continue;
        }
        let indent = if opens_with_closer {
            depth.saturating_sub(1)
        } else {
            depth
        };
        let mut out = "\t".repeat(indent);
        out.push_str(text);
        lines.push(out);
    }

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        if line.is_empty() {
            let prev = out.last().map(String::as_str);
            let next = lines[idx + 1..].iter().find(|l| !l.is_empty());
            let after_opener = prev.map_or(true, |p| p.is_empty() || ends_with_opener(p));
            let before_closer = next.map_or(true, |n| starts_with_closer(n.trim_start()));
            if after_opener || before_closer {
                continue;
            }
        }
        out.push(line.clone());
    }

    let mut text = out.join("\n");
    text.push('\n');
    Ok(text)
}

fn ends_with_opener(line: &str) -> bool {
    if line.trim_start().starts_with("//") {
        return false;
    }
    matches!(line.trim_end().chars().last(), Some('{' | '(' | '['))
}

fn starts_with_closer(line: &str) -> bool {
    matches!(line.chars().next(), Some('}' | ')' | ']'))
}

/// Delimiter depth at the start of each line, and whether the line begins with
/// a closing delimiter.
fn line_depths(src: &str) -> Result<Vec<(usize, bool)>> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut out: Vec<(usize, bool)> = Vec::new();

    for (lno, line) in src.lines().enumerate() {
        let lno = lno + 1;
        out.push((stack.len(), starts_with_closer(line.trim_start())));

        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    return Err(Diagnostic::format(format!(
                        "line {lno}: block comments are not emitted by the generator"
                    ))
                    .into());
                }
                '"' | '\'' => {
                    let mut closed = false;
                    while let Some(s) = chars.next() {
                        if s == '\\' {
                            chars.next();
                        } else if s == c {
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(
                            Diagnostic::format(format!("line {lno}: unterminated literal")).into(),
                        );
                    }
                }
                '`' => {
                    if !chars.by_ref().any(|s| s == '`') {
                        return Err(Diagnostic::format(format!(
                            "line {lno}: unterminated raw string"
                        ))
                        .into());
                    }
                }
                '(' | '[' | '{' => stack.push((c, lno)),
                ')' | ']' | '}' => {
                    let want = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((open, _)) if open == want => {}
                        Some((open, at)) => {
                            return Err(Diagnostic::format(format!(
                                "line {lno}: {c:?} closes {open:?} opened at line {at}"
                            ))
                            .into());
                        }
                        None => {
                            return Err(Diagnostic::format(format!(
                                "line {lno}: unmatched {c:?}"
                            ))
                            .into());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    if let Some((open, at)) = stack.pop() {
        return Err(Diagnostic::format(format!("unclosed {open:?} opened at line {at}")).into());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{diagnostic_of, DiagnosticCode};

    #[test]
    fn reindents_and_trims() {
        let src = "package p\n\n\n\nfunc f() {   \n  if x {\nreturn\n   }\n\n}\n\n";
        assert_eq!(
            format(src).expect("format"),
            "package p\n\nfunc f() {\n\tif x {\n\t\treturn\n\t}\n}\n"
        );
    }

    #[test]
    fn drops_blank_line_before_closing_paren() {
        let src = "import (\n\t\"context\"\n\n\t\"example.com/x\"\n\n)\n";
        assert_eq!(
            format(src).expect("format"),
            "import (\n\t\"context\"\n\n\t\"example.com/x\"\n)\n"
        );
    }

    #[test]
    fn ignores_delimiters_in_strings_and_comments() {
        let src = "// gen \"a (b\"; x {\nfunc f() {\n\tpanic(\"not ) implemented\")\n}\n";
        assert_eq!(format(src).expect("format"), src);
    }

    #[test]
    fn idempotent() {
        let src = "package p\n\ntype T struct {\n manager juice.Manager\n}\n";
        let once = format(src).expect("format");
        assert_eq!(format(&once).expect("format"), once);
    }

    #[test]
    fn unbalanced_is_format_error() {
        let err = format("func f() {\n\treturn (\n}\n").expect_err("unbalanced");
        let d = diagnostic_of(&err).expect("diagnostic");
        assert_eq!(d.code, DiagnosticCode::JG0500FormatError);
    }
}
