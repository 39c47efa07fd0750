//! Memory model: frames, variable accesses and initial values
//!
//! A [`Frame`] describes one function's activation record. An [`Access`]
//! describes where a variable or parameter lives: relative to a frame
//! pointer ([`RelAccess`]) or at a fixed label ([`AbsAccess`]).
//!
//! Stack frame of a function at depth `d` (addresses grow upward):
//!
//! ```text
//!        +----------------+
//!  FP+4k | argument k     |
//!    ... | ...            |
//!  FP+4  | argument 1     |
//!  FP+0  | static link    |  FP of the enclosing function (depth d-1)
//!  FP-4  | saved FP       |
//!  FP-8  | return address |
//!        | local 1        |  FP-8-s1
//!    ... | ...            |
//!        +----------------+
//! ```

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine word size in bytes
pub const WORD_SIZE: u32 = 4;
/// Static link slot in the parameter area
pub const LINK_SIZE: u32 = 4;
/// Offset of the first parameter from the frame pointer
pub const FIRST_PARAM_OFFSET: i32 = 4;
/// Offset just above the first local (saved FP and return address sit between)
pub const LOCALS_BASE_OFFSET: i32 = -8;

/// Activation record layout of one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    /// Label of the function's code; the bare name at depth 1
    pub label: String,
    /// Static nesting depth, 1 for top-level functions
    pub depth: u32,
    /// Parameters plus the static link slot, in bytes
    pub params_size: u32,
    /// All locals of the body, `let` blocks included, in bytes
    pub locals_size: u32,
}

impl Frame {
    /// Bytes of arguments the caller pushed, without the static link
    pub fn arguments_size(&self) -> u32 {
        self.params_size - LINK_SIZE
    }
}

/// Where a variable or parameter lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Rel(RelAccess),
    Abs(AbsAccess),
}

impl Access {
    pub fn size(&self) -> u32 {
        match self {
            Access::Rel(rel) => rel.size,
            Access::Abs(abs) => abs.size,
        }
    }

    pub fn inits(&self) -> Option<&Inits> {
        match self {
            Access::Rel(rel) => rel.inits.as_ref(),
            Access::Abs(abs) => Some(&abs.inits),
        }
    }
}

/// Frame-pointer-relative storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelAccess {
    /// Byte offset from the frame pointer
    pub offset: i32,
    /// Depth of the owning frame
    pub depth: u32,
    pub size: u32,
    /// Initial value of a local; `None` for parameters
    pub inits: Option<Inits>,
}

/// Statically allocated storage (globals)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsAccess {
    pub label: String,
    pub size: u32,
    pub inits: Inits,
}

/// One run-length group: `repeat` copies of `elems`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitGroup {
    pub repeat: u32,
    pub elems: Vec<i32>,
}

impl InitGroup {
    pub fn new(repeat: u32, elems: Vec<i32>) -> Self {
        Self { repeat, elems }
    }

    /// Storage covered by this group, `None` if it does not fit in 32 bits
    pub fn size(&self) -> Option<u32> {
        let bytes = u64::from(self.repeat) * self.elems.len() as u64 * u64::from(WORD_SIZE);
        u32::try_from(bytes).ok()
    }
}

/// Run-length encoded initial value
///
/// Encoded as `[groups, (repeat, len, elem_1 .. elem_len)*]`, the layout
/// the machine's initializer instruction reads from the data segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct Inits(Vec<i32>);

/// Word sequence that is not a well-formed encoded initial value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed initial value at word {position}: {reason}")]
pub struct InitsError {
    pub position: usize,
    pub reason: &'static str,
}

impl TryFrom<Vec<i32>> for Inits {
    type Error = InitsError;

    fn try_from(encoded: Vec<i32>) -> Result<Self, Self::Error> {
        let fail = |position, reason| Err(InitsError { position, reason });
        let Some(&count) = encoded.first() else {
            return fail(0, "missing group count");
        };
        if count < 0 {
            return fail(0, "negative group count");
        }
        let mut pos = 1;
        for _ in 0..count {
            let (Some(&repeat), Some(&len)) = (encoded.get(pos), encoded.get(pos + 1)) else {
                return fail(pos, "truncated group header");
            };
            if repeat < 0 || len < 0 {
                return fail(pos, "negative repeat count or length");
            }
            pos += 2 + len as usize;
            if pos > encoded.len() {
                return fail(encoded.len(), "truncated group elements");
            }
        }
        if pos != encoded.len() {
            return fail(pos, "trailing words after the last group");
        }
        Ok(Self(encoded))
    }
}

impl From<Inits> for Vec<i32> {
    fn from(inits: Inits) -> Self {
        inits.0
    }
}

impl Inits {
    /// Encode groups in order
    pub fn from_groups(groups: &[InitGroup]) -> Self {
        let mut encoded = vec![groups.len() as i32];
        for group in groups {
            encoded.push(group.repeat as i32);
            encoded.push(group.elems.len() as i32);
            encoded.extend_from_slice(&group.elems);
        }
        Self(encoded)
    }

    /// Encoded form, as stored in the data segment
    pub fn encoded(&self) -> &[i32] {
        &self.0
    }

    pub fn group_count(&self) -> usize {
        self.0.first().map_or(0, |&n| n as usize)
    }

    /// Decode back into groups
    pub fn groups(&self) -> Vec<InitGroup> {
        let mut groups = Vec::with_capacity(self.group_count());
        let mut pos = 1;
        for _ in 0..self.group_count() {
            let repeat = self.0[pos] as u32;
            let len = self.0[pos + 1] as usize;
            let elems = self.0[pos + 2..pos + 2 + len].to_vec();
            groups.push(InitGroup::new(repeat, elems));
            pos += 2 + len;
        }
        groups
    }

    /// Fully expanded word sequence
    pub fn words(&self) -> Vec<i32> {
        let mut words = Vec::new();
        for group in self.groups() {
            for _ in 0..group.repeat {
                words.extend_from_slice(&group.elems);
            }
        }
        words
    }
}

/// Preview of the expanded value, at most 10 words
impl fmt::Display for Inits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printed = 0;
        for group in self.groups() {
            for _ in 0..group.repeat {
                for elem in &group.elems {
                    if printed == 10 {
                        return write!(f, "...");
                    }
                    if printed > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", elem)?;
                    printed += 1;
                }
            }
        }
        Ok(())
    }
}

/// Synthesized label `tag@span`
pub fn label(tag: &str, span: Span) -> String {
    format!("{}@{}", tag, span)
}

/// Synthesized label `tag:name@span`
pub fn named_label(tag: &str, name: &str, span: Span) -> String {
    format!("{}:{}@{}", tag, name, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_encode_scalar() {
        let inits = Inits::from_groups(&[InitGroup::new(1, vec![2])]);
        assert_eq!(inits.encoded(), &[1, 1, 1, 2]);
        assert_eq!(inits.words(), vec![2]);
    }

    #[test]
    fn test_encode_groups_in_order() {
        let inits = Inits::from_groups(&[
            InitGroup::new(2, vec![97, 98]),
            InitGroup::new(3, vec![0]),
        ]);
        assert_eq!(inits.encoded(), &[2, 2, 2, 97, 98, 3, 1, 0]);
        assert_eq!(inits.group_count(), 2);
        assert_eq!(inits.words(), vec![97, 98, 97, 98, 0, 0, 0]);
    }

    #[test]
    fn test_empty_inits() {
        let inits = Inits::from_groups(&[]);
        assert_eq!(inits.encoded(), &[0]);
        assert!(inits.groups().is_empty());
        assert_eq!(inits.to_string(), "");
    }

    #[test]
    fn test_deserialize_accepts_encoded_form() {
        let inits: Inits = serde_json::from_str("[2, 2, 2, 97, 98, 3, 1, 0]").unwrap();
        assert_eq!(inits.words(), vec![97, 98, 97, 98, 0, 0, 0]);
        assert_eq!(serde_json::to_string(&inits).unwrap(), "[2,2,2,97,98,3,1,0]");
    }

    #[rstest]
    #[case("[]", 0)]
    #[case("[-1]", 0)]
    #[case("[1, 5]", 1)]
    #[case("[1, 2, 3, 7]", 4)]
    #[case("[1, -2, 1, 7]", 1)]
    #[case("[1, 1, 1, 7, 8]", 4)]
    #[case("[2, 1, 1, 7]", 4)]
    fn test_malformed_inits_are_rejected(#[case] json: &str, #[case] position: usize) {
        let words: Vec<i32> = serde_json::from_str(json).unwrap();
        let err = Inits::try_from(words).unwrap_err();
        assert_eq!(err.position, position);
        assert!(serde_json::from_str::<Inits>(json).is_err());
    }

    #[test]
    fn test_display_truncates_after_ten() {
        let inits = Inits::from_groups(&[InitGroup::new(20, vec![7])]);
        assert_eq!(inits.to_string(), "7,7,7,7,7,7,7,7,7,7...");
    }

    #[test]
    fn test_group_size() {
        assert_eq!(InitGroup::new(5, vec![3]).size(), Some(20));
        assert_eq!(InitGroup::new(2, vec![1, 2, 3]).size(), Some(24));
        assert_eq!(InitGroup::new(u32::MAX, vec![0, 0]).size(), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(label("while:cond", Span::point(3, 5)), "while:cond@3:5");
        assert_eq!(
            named_label("global", "x", Span::new(1, 1, 1, 9)),
            "global:x@1:1-1:9"
        );
    }

    #[test]
    fn test_arguments_size() {
        let frame = Frame {
            name: "f".to_string(),
            label: "f".to_string(),
            depth: 1,
            params_size: 12,
            locals_size: 0,
        };
        assert_eq!(frame.arguments_size(), 8);
    }
}
