//! Segment listing
//!
//! Converts assembled segments to a human-readable listing with running
//! byte addresses. Used for debugging, testing and tool output.

use super::Segments;

/// Render both segments
///
/// # Format
/// ```text
/// === Code (17 bytes) ===
///   000000  5  PUSH 0
///   000005  5  NAME main
///   000010  1  CALL main
/// main:
///   000011  5  PUSH 1
///   000016  1  LOAD
///
/// === Data (8 bytes) ===
/// init:x@1:5:
///   000000  4  DATA 1
///   000004  4  DATA 2
/// ```
pub fn render(segments: &Segments) -> String {
    let mut output = String::new();

    output.push_str(&format!("=== Code ({} bytes) ===\n", segments.code_size()));
    render_section(
        &mut output,
        segments.code.iter().map(|instr| (instr.kind.is_label(), instr.size(), instr.to_string())),
    );

    output.push('\n');
    output.push_str(&format!("=== Data ({} bytes) ===\n", segments.data_size()));
    render_section(
        &mut output,
        segments.data.iter().map(|instr| (instr.kind.is_label(), instr.size(), instr.to_string())),
    );

    output
}

fn render_section(output: &mut String, instrs: impl Iterator<Item = (bool, u32, String)>) {
    let mut address: u32 = 0;
    for (is_label, size, text) in instrs {
        if is_label {
            let label = text.strip_prefix("LABEL ").unwrap_or(&text);
            output.push_str(&format!("{}:\n", label));
        } else {
            output.push_str(&format!("  {:06}  {}  {}\n", address, size, text));
        }
        address += size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::{Code, Data};
    use crate::span::Span;

    #[test]
    fn test_render_listing() {
        let span = Span::point(1, 1);
        let segments = Segments {
            code: vec![
                Code::Label("main".to_string()).at(span),
                Code::Push(1).at(span),
                Code::Load.at(span),
            ],
            data: vec![
                Data::Label("global:x@1:1".to_string()).at(span),
                Data::Size(8).at(span),
                Data::Word(3).at(span),
            ],
        };

        insta::assert_snapshot!(render(&segments), @r"
        === Code (6 bytes) ===
        main:
          000000  5  PUSH 1
          000005  1  LOAD

        === Data (12 bytes) ===
        global:x@1:1:
          000000  8  SIZE 8
          000008  4  DATA 3
        ");
    }

    #[test]
    fn test_empty_segments() {
        let listing = render(&Segments::default());
        assert_eq!(listing, "=== Code (0 bytes) ===\n\n=== Data (0 bytes) ===\n");
    }
}
