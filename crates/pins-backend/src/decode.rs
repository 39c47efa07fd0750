//! Constant decoding
//!
//! Turns literal lexemes into machine words. Malformed integer literals
//! are the user's fault; malformed character or string lexemes can only
//! come from a broken lexer and are reported as internal errors.

use crate::ast::{Atom, AtomKind, Init};
use crate::diagnostic::error_codes;
use crate::error::{CodegenError, CodegenResult};
use crate::mem::{InitGroup, Inits};

/// Value of an integer constant
pub fn decode_int(atom: &Atom) -> CodegenResult<i32> {
    parse_int(&atom.lexeme).ok_or_else(|| {
        CodegenError::at(
            error_codes::ILLEGAL_INTEGER,
            format!("illegal integer value `{}`", atom.lexeme),
            atom.span,
        )
    })
}

/// Parse an integer lexeme: optional sign, then decimal, `0x`/`0X`/`#`
/// hexadecimal or leading-`0` octal digits
pub fn parse_int(lexeme: &str) -> Option<i32> {
    let (negative, rest) = match lexeme.as_bytes().first()? {
        b'-' => (true, &lexeme[1..]),
        b'+' => (false, &lexeme[1..]),
        _ => (false, lexeme),
    };
    let (radix, digits) = if let Some(hex) = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .or_else(|| rest.strip_prefix('#'))
    {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    i32::try_from(if negative { -magnitude } else { magnitude }).ok()
}

/// Code point of a character constant such as `'a'`, `'\n'` or `'\41'`
pub fn decode_char(atom: &Atom) -> CodegenResult<i32> {
    let chars: Vec<char> = atom.lexeme.chars().collect();
    if chars.len() < 3 || chars[0] != '\'' || chars[chars.len() - 1] != '\'' {
        return Err(malformed(atom));
    }
    let body = &chars[1..chars.len() - 1];
    match body {
        ['\\', ..] => {
            let (value, consumed) = decode_escape(body, 1, atom)?;
            if 1 + consumed != body.len() {
                return Err(malformed(atom));
            }
            Ok(value)
        }
        [c] => Ok(*c as i32),
        _ => Err(malformed(atom)),
    }
}

/// Code points of a string constant, one word per character
///
/// A multi-line literal delimited by `"""` spans lines and may contain
/// bare quotes; escapes in its body are decoded the same way.
pub fn decode_str(atom: &Atom) -> CodegenResult<Vec<i32>> {
    let chars: Vec<char> = atom.lexeme.chars().collect();
    let quotes = if chars.len() >= 6 && chars.starts_with(&['"'; 3]) && chars.ends_with(&['"'; 3]) {
        3
    } else {
        1
    };
    if chars.len() < 2 * quotes || chars[0] != '"' || chars[chars.len() - 1] != '"' {
        return Err(malformed(atom));
    }
    let body = &chars[quotes..chars.len() - quotes];
    let mut words = Vec::with_capacity(body.len());
    let mut pos = 0;
    while pos < body.len() {
        if body[pos] == '\\' {
            let (value, consumed) = decode_escape(body, pos + 1, atom)?;
            words.push(value);
            pos += 1 + consumed;
        } else {
            words.push(body[pos] as i32);
            pos += 1;
        }
    }
    Ok(words)
}

/// Decode the escape whose first character (after the backslash) is at
/// `body[pos]`; returns the value and the number of characters consumed
fn decode_escape(body: &[char], pos: usize, atom: &Atom) -> CodegenResult<(i32, usize)> {
    match body.get(pos) {
        Some('n') => Ok((10, 1)),
        Some('\'') => Ok(('\'' as i32, 1)),
        Some('"') => Ok(('"' as i32, 1)),
        Some('\\') => Ok(('\\' as i32, 1)),
        Some('x') if hex_pair(body, pos + 1).is_some() => {
            let value = hex_pair(body, pos + 1).ok_or_else(|| malformed(atom))?;
            Ok((value, 3))
        }
        Some(_) => {
            let value = hex_pair(body, pos).ok_or_else(|| malformed(atom))?;
            Ok((value, 2))
        }
        None => Err(malformed(atom)),
    }
}

fn hex_pair(body: &[char], pos: usize) -> Option<i32> {
    let high = body.get(pos)?.to_digit(16)?;
    let low = body.get(pos + 1)?.to_digit(16)?;
    Some((16 * high + low) as i32)
}

fn malformed(atom: &Atom) -> CodegenError {
    CodegenError::internal(format!(
        "malformed {:?} literal `{}` at {}",
        atom.kind, atom.lexeme, atom.span
    ))
}

/// Words of any constant: one word for integers and characters, one per
/// character for strings
pub fn decode_atom(atom: &Atom) -> CodegenResult<Vec<i32>> {
    match atom.kind {
        AtomKind::Int => Ok(vec![decode_int(atom)?]),
        AtomKind::Char => Ok(vec![decode_char(atom)?]),
        AtomKind::Str => decode_str(atom),
    }
}

/// Run-length group of one initializer `count * value`
pub fn decode_init(init: &Init) -> CodegenResult<InitGroup> {
    let count = decode_int(&init.count)?;
    let repeat = u32::try_from(count).map_err(|_| {
        CodegenError::at(
            error_codes::ILLEGAL_REPEAT_COUNT,
            format!("illegal repetition count {}", count),
            init.count.span,
        )
    })?;
    let group = InitGroup::new(repeat, decode_atom(&init.value)?);
    if group.size().is_none() {
        return Err(CodegenError::at(
            error_codes::ILLEGAL_REPEAT_COUNT,
            format!("initializer of {} x {} words is too large", repeat, group.elems.len()),
            init.span,
        ));
    }
    Ok(group)
}

/// Encoded initial value and total size in bytes of a variable's initializers
pub fn decode_inits(inits: &[Init]) -> CodegenResult<(Inits, u32)> {
    let mut groups = Vec::with_capacity(inits.len());
    let mut size: u32 = 0;
    for init in inits {
        let group = decode_init(init)?;
        size = group
            .size()
            .and_then(|bytes| size.checked_add(bytes))
            .ok_or_else(|| {
                CodegenError::at(
                    error_codes::ILLEGAL_REPEAT_COUNT,
                    "variable is too large",
                    init.span,
                )
            })?;
        groups.push(group);
    }
    Ok((Inits::from_groups(&groups), size))
}
